use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind, ledger, transactions,
};

use super::{Engine, apply_balance_deltas, with_tx};

impl Engine {
    /// Records a standalone obligation between two parties (an IOU not tied
    /// to any expense). Settling it later emits the actual repayment.
    pub async fn new_direct_payment(
        &self,
        payer_id: Uuid,
        receiver_id: Uuid,
        amount: Money,
        group_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        if payer_id == receiver_id {
            return Err(EngineError::InvalidId(
                "payer and receiver must differ".to_string(),
            ));
        }
        self.require_participants(&[payer_id, receiver_id]).await?;

        let tx = Transaction::new(
            payer_id,
            receiver_id,
            amount,
            created_at,
            TransactionKind::Direct,
            None,
            group_id,
        )?;

        with_tx!(self, |db_tx| {
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            apply_balance_deltas(&db_tx, &ledger::entry_deltas(&tx, false)).await?;
            Ok(tx)
        })
    }
}
