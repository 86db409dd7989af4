use chrono::Utc;
use sea_orm::{Condition, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    ResultEngine, Transaction, TransactionKind, ledger,
    settlement::{self, FailedTransfer, SettlementReport, SettlementTransfer},
    transactions,
};

use super::{Engine, apply_balance_deltas, with_tx};

/// What to settle.
///
/// `Direct` nets all outstanding positions between two parties outside any
/// group (their personal expenses plus standalone obligations, each expense
/// on its own). `Group` nets everything inside one group scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettleScope {
    Direct { a: Uuid, b: Uuid },
    Group(String),
}

impl Engine {
    /// Nets the scoped transaction log and persists the resulting transfers.
    ///
    /// Each transfer is written atomically on its own (settle row plus
    /// balance updates in one DB transaction); there is no multi-transfer
    /// atomicity. Transfers that fail to persist are reported back with the
    /// ones that succeeded so the caller can retry: the plan is a
    /// deterministic function of the remaining ledger state.
    pub async fn settle(&self, scope: SettleScope) -> ResultEngine<SettlementReport> {
        let log = self.load_scope(&scope).await?;
        let transfers = settlement::plan(&log);

        let mut report = SettlementReport::default();
        for transfer in transfers {
            match self.apply_transfer(&transfer).await {
                Ok(tx) => report.applied.push(tx),
                Err(err) => report.failed.push(FailedTransfer {
                    transfer,
                    reason: err.to_string(),
                }),
            }
        }
        Ok(report)
    }

    /// Computes the transfers the scope would need, without persisting.
    pub async fn settlement_preview(
        &self,
        scope: SettleScope,
    ) -> ResultEngine<Vec<SettlementTransfer>> {
        let log = self.load_scope(&scope).await?;
        Ok(settlement::plan(&log))
    }

    async fn load_scope(&self, scope: &SettleScope) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find();
        query = match scope {
            SettleScope::Direct { a, b } => {
                let (a, b) = (a.to_string(), b.to_string());
                query
                    .filter(transactions::Column::GroupId.is_null())
                    .filter(
                        Condition::any()
                            .add(
                                Condition::all()
                                    .add(transactions::Column::PayerId.eq(a.clone()))
                                    .add(transactions::Column::ReceiverId.eq(b.clone())),
                            )
                            .add(
                                Condition::all()
                                    .add(transactions::Column::PayerId.eq(b))
                                    .add(transactions::Column::ReceiverId.eq(a)),
                            ),
                    )
            }
            SettleScope::Group(group_id) => {
                query.filter(transactions::Column::GroupId.eq(group_id.clone()))
            }
        };

        let models = query
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    async fn apply_transfer(&self, transfer: &SettlementTransfer) -> ResultEngine<Transaction> {
        let tx = Transaction::new(
            transfer.payer_id,
            transfer.receiver_id,
            transfer.amount,
            Utc::now(),
            TransactionKind::Settle,
            transfer.expense_id,
            transfer.group_id.clone(),
        )?;

        with_tx!(self, |db_tx| {
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            apply_balance_deltas(&db_tx, &ledger::entry_deltas(&tx, false)).await?;
            Ok(tx)
        })
    }
}
