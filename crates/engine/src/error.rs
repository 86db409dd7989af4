//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidSplit`] thrown when a split allocation rejects its inputs.
//! - [`LedgerInconsistency`] thrown when the pairwise symmetry invariant is
//!   violated on read.
//! - [`KeyNotFound`] thrown when an item is not found.
//!
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`LedgerInconsistency`]: EngineError::LedgerInconsistency
//!  [`KeyNotFound`]: EngineError::KeyNotFound
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Ledger inconsistency: {0}")]
    LedgerInconsistency(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::LedgerInconsistency(a), Self::LedgerInconsistency(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
