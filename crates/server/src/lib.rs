use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod balances;
mod expenses;
mod participants;
mod server;
mod settlements;
mod transactions;

pub mod types {
    pub mod participant {
        pub use api_types::participant::{ParticipantNew, ParticipantView, ParticipantsResponse};
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseNew, ExpenseSaved, ExpenseView, PayerEntry, ShareView, SplitInputEntry,
            SplitStrategy,
        };
    }

    pub mod payment {
        pub use api_types::payment::DirectPaymentNew;
    }

    pub mod transaction {
        pub use api_types::transaction::{
            GroupedTransactionsResponse, GroupedTransactionsView, ParticipantSummaryView,
            TransactionKind, TransactionList, TransactionListResponse, TransactionView,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalanceEntryView, BalancesResponse, PairBalanceResponse};
    }

    pub mod settlement {
        pub use api_types::settlement::{
            FailedTransferView, SettleRequest, SettleResponse, TransferView,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) | EngineError::LedgerInconsistency(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InvalidSplit(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidId(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::LedgerInconsistency(detail) => {
            tracing::error!("ledger inconsistency: {detail}");
            "ledger inconsistency".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
