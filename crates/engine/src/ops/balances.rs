use std::collections::HashMap;

use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    BalanceBook, BalanceEntry, EngineError, Money, ResultEngine, Transaction, ledger, transactions,
};

use super::{Engine, with_tx};

async fn cell<C: sea_orm::ConnectionTrait>(
    db: &C,
    owner: Uuid,
    counterparty: Uuid,
    group_key: &str,
) -> ResultEngine<i64> {
    let model = ledger::Entity::find_by_id((
        owner.to_string(),
        counterparty.to_string(),
        group_key.to_string(),
    ))
    .one(db)
    .await?;
    Ok(model.map(|m| m.net_minor).unwrap_or(0))
}

impl Engine {
    /// Signed net position of `a` versus `b` in one scope (`None` = direct).
    ///
    /// Positive: `b` owes `a`. The mirror cell is read too and the pair must
    /// be zero-sum; a mismatch indicates a prior partial write and is
    /// surfaced, never repaired here.
    pub async fn balance_between(
        &self,
        a: Uuid,
        b: Uuid,
        group_id: Option<&str>,
    ) -> ResultEngine<Money> {
        let group_key = group_id.unwrap_or_default();
        let ab = cell(&self.database, a, b, group_key).await?;
        let ba = cell(&self.database, b, a, group_key).await?;
        if ab != -ba {
            return Err(EngineError::LedgerInconsistency(format!(
                "pair {a}/{b} is not zero-sum: {ab} vs {ba}"
            )));
        }
        Ok(Money::new(ab))
    }

    /// Every balance view held for a participant: the direct row and one row
    /// per group, kept apart. The total relationship balance against one
    /// counterparty is the sum over views and is left to the caller.
    pub async fn balances_for(&self, participant: Uuid) -> ResultEngine<Vec<BalanceEntry>> {
        let models = ledger::Entity::find()
            .filter(ledger::Column::OwnerId.eq(participant.to_string()))
            .order_by_asc(ledger::Column::CounterpartyId)
            .order_by_asc(ledger::Column::GroupKey)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .filter(|m| m.net_minor != 0)
            .map(BalanceEntry::try_from)
            .collect()
    }

    /// Net positions of every member within one group scope.
    pub async fn group_balances(&self, group_id: &str) -> ResultEngine<Vec<BalanceEntry>> {
        let models = ledger::Entity::find()
            .filter(ledger::Column::GroupKey.eq(group_id.to_string()))
            .order_by_asc(ledger::Column::OwnerId)
            .order_by_asc(ledger::Column::CounterpartyId)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .filter(|m| m.net_minor != 0)
            .map(BalanceEntry::try_from)
            .collect()
    }

    /// Audits the symmetry invariant across the whole `balance_entries`
    /// keyspace.
    pub async fn verify_ledger(&self) -> ResultEngine<()> {
        let models = ledger::Entity::find().all(&self.database).await?;
        let mut cells: HashMap<(String, String, String), i64> = HashMap::new();
        for model in &models {
            cells.insert(
                (
                    model.owner_id.clone(),
                    model.counterparty_id.clone(),
                    model.group_key.clone(),
                ),
                model.net_minor,
            );
        }
        for ((owner, counterparty, group_key), net) in &cells {
            let mirror = cells
                .get(&(counterparty.clone(), owner.clone(), group_key.clone()))
                .copied()
                .unwrap_or(0);
            if *net != -mirror {
                return Err(EngineError::LedgerInconsistency(format!(
                    "pair {owner}/{counterparty} is not zero-sum: {net} vs {mirror}"
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds the denormalized `balance_entries` rows by replaying the
    /// whole transaction log in chronological order.
    pub async fn recompute_balances(&self) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let models = transactions::Entity::find()
                .order_by_asc(transactions::Column::CreatedAt)
                .order_by_asc(transactions::Column::Id)
                .all(&db_tx)
                .await?;

            let mut book = BalanceBook::new();
            for model in models {
                let tx = Transaction::try_from(model)?;
                book.apply(&tx);
            }
            book.verify()?;

            ledger::Entity::delete_many().exec(&db_tx).await?;
            for entry in book.entries() {
                ledger::ActiveModel::from(&entry).insert(&db_tx).await?;
            }
            Ok(())
        })
    }
}
