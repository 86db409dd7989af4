use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    EngineError, Expense, GroupedTransactions, ResultEngine, Transaction, TransactionKind,
    reconcile, transactions,
};

use super::{Engine, expenses::load_expense, parse_uuid};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    /// Only rows where this participant is payer or receiver.
    pub participant: Option<Uuid>,
    /// Only rows inside this group scope.
    pub group_id: Option<String>,
    /// Only rows outside any group (mutually exclusive with `group_id`).
    pub direct_only: bool,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidAmount(
            "kinds must not be empty".to_string(),
        ));
    }
    if filter.direct_only && filter.group_id.is_some() {
        return Err(EngineError::InvalidAmount(
            "direct_only excludes group_id".to_string(),
        ));
    }
    Ok(())
}

fn filtered(filter: &TransactionListFilter) -> sea_orm::Select<transactions::Entity> {
    let mut query = transactions::Entity::find();
    if let Some(participant) = filter.participant {
        let id = participant.to_string();
        query = query.filter(
            Condition::any()
                .add(transactions::Column::PayerId.eq(id.clone()))
                .add(transactions::Column::ReceiverId.eq(id)),
        );
    }
    if let Some(group_id) = &filter.group_id {
        query = query.filter(transactions::Column::GroupId.eq(group_id.clone()));
    }
    if filter.direct_only {
        query = query.filter(transactions::Column::GroupId.is_null());
    }
    if let Some(kinds) = &filter.kinds {
        query = query.filter(
            transactions::Column::Kind
                .is_in(kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>()),
        );
    }
    if let Some(from) = filter.from {
        query = query.filter(transactions::Column::CreatedAt.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(transactions::Column::CreatedAt.lt(to));
    }
    query
}

/// Opaque pagination cursor: base64 of `<timestamp micros>|<transaction id>`.
fn encode_cursor(tx: &Transaction) -> String {
    let raw = format!("{}|{}", tx.created_at.timestamp_micros(), tx.id);
    base64::engine::general_purpose::STANDARD.encode(raw)
}

fn decode_cursor(cursor: &str) -> ResultEngine<(DateTime<Utc>, Uuid)> {
    let invalid = || EngineError::InvalidId("invalid cursor".to_string());
    let raw = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid())?;
    let raw = String::from_utf8(raw).map_err(|_| invalid())?;
    let (micros, id) = raw.split_once('|').ok_or_else(invalid)?;
    let micros: i64 = micros.parse().map_err(|_| invalid())?;
    let created_at = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
    let id = parse_uuid(id, "transaction")?;
    Ok((created_at, id))
}

impl Engine {
    /// Lists transactions, newest first, with keyset pagination.
    ///
    /// Returns the page plus an opaque cursor for the next (older) page,
    /// `None` when the log is exhausted.
    pub async fn list_transactions(
        &self,
        filter: &TransactionListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;

        let mut query = filtered(filter);
        if let Some(cursor) = cursor {
            let (created_at, id) = decode_cursor(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::CreatedAt.lt(created_at))
                    .add(
                        Condition::all()
                            .add(transactions::Column::CreatedAt.eq(created_at))
                            .add(transactions::Column::Id.lt(id.to_string())),
                    ),
            );
        }

        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit + 1)
            .all(&self.database)
            .await?;

        let has_more = models.len() as u64 > limit;
        let page: Vec<Transaction> = models
            .into_iter()
            .take(limit as usize)
            .map(Transaction::try_from)
            .collect::<ResultEngine<_>>()?;
        let next_cursor = (has_more && !page.is_empty())
            .then(|| page.last().map(encode_cursor))
            .flatten();

        Ok((page, next_cursor))
    }

    /// Groups the matching transaction log by originating expense for
    /// display: settle rows first within a group, groups newest first,
    /// missing expense lookups degraded to plain transfer groups.
    pub async fn grouped_transactions(
        &self,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<GroupedTransactions>> {
        validate_list_filter(filter)?;

        let models = filtered(filter)
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;
        let log: Vec<Transaction> = models
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<_>>()?;

        let mut expense_ids: Vec<Uuid> = log.iter().filter_map(|tx| tx.expense_id).collect();
        expense_ids.sort_unstable();
        expense_ids.dedup();

        let mut expenses: HashMap<Uuid, Expense> = HashMap::with_capacity(expense_ids.len());
        for expense_id in expense_ids {
            match load_expense(&self.database, expense_id).await {
                Ok(expense) => {
                    expenses.insert(expense_id, expense);
                }
                // A dangling reference degrades to a plain transfer group.
                Err(EngineError::KeyNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(reconcile::reconcile(log, &expenses))
    }
}
