use sea_orm::{ActiveValue, DatabaseConnection, DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{BalanceEntry, EngineError, ResultEngine, ledger};

mod balances;
mod expenses;
mod participants;
mod payments;
mod settlements;
mod transactions;

pub use expenses::{NewExpense, SavedExpense};
pub use settlements::SettleScope;
pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger service.
///
/// Holds no mutable ledger state: every operation loads what it needs and
/// runs inside its own DB transaction. Callers provide per-aggregate mutual
/// exclusion for concurrent edits of the same expense or pair.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Applies signed balance-cell deltas to the persisted `balance_entries`
/// rows, inside the caller's DB transaction.
pub(crate) async fn apply_balance_deltas(
    db_tx: &DatabaseTransaction,
    deltas: &[BalanceEntry],
) -> ResultEngine<()> {
    for delta in deltas {
        let group_key = delta.group_id.clone().unwrap_or_default();
        let existing = ledger::Entity::find_by_id((
            delta.owner_id.to_string(),
            delta.counterparty_id.to_string(),
            group_key.clone(),
        ))
        .one(db_tx)
        .await?;

        match existing {
            Some(model) => {
                let active = ledger::ActiveModel {
                    owner_id: ActiveValue::Set(model.owner_id),
                    counterparty_id: ActiveValue::Set(model.counterparty_id),
                    group_key: ActiveValue::Set(model.group_key),
                    net_minor: ActiveValue::Set(model.net_minor + delta.net.cents()),
                };
                active.update(db_tx).await?;
            }
            None => {
                let active = ledger::ActiveModel {
                    owner_id: ActiveValue::Set(delta.owner_id.to_string()),
                    counterparty_id: ActiveValue::Set(delta.counterparty_id.to_string()),
                    group_key: ActiveValue::Set(group_key),
                    net_minor: ActiveValue::Set(delta.net.cents()),
                };
                active.insert(db_tx).await?;
            }
        }
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
