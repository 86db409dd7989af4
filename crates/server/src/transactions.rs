//! Transaction endpoints: direct payments, the paged list and the grouped
//! (per-expense) view.

use api_types::payment::DirectPaymentNew;
use api_types::transaction::{
    GroupedTransactionsResponse, GroupedTransactionsView, ParticipantSummaryView,
    TransactionKind as ApiKind, TransactionList, TransactionListResponse, TransactionView,
};
use axum::{Json, extract::State};
use chrono::{FixedOffset, Utc};
use engine::{Money, TransactionListFilter};

use crate::{ServerError, expenses::map_expense, server::ServerState};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Expense => ApiKind::Expense,
        engine::TransactionKind::Direct => ApiKind::Direct,
        engine::TransactionKind::Settle => ApiKind::Settle,
    }
}

fn map_kind_back(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Expense => engine::TransactionKind::Expense,
        ApiKind::Direct => engine::TransactionKind::Direct,
        ApiKind::Settle => engine::TransactionKind::Settle,
    }
}

pub(crate) fn map_transaction(tx: &engine::Transaction) -> Result<TransactionView, ServerError> {
    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    Ok(TransactionView {
        id: tx.id,
        payer_id: tx.payer_id,
        receiver_id: tx.receiver_id,
        amount_minor: tx.amount.cents(),
        created_at: tx.created_at.with_timezone(&utc),
        kind: map_kind(tx.kind),
        expense_id: tx.expense_id,
        group_id: tx.group_id.clone(),
    })
}

fn map_filter(payload: &TransactionList) -> TransactionListFilter {
    TransactionListFilter {
        participant: payload.participant,
        group_id: payload.group_id.clone(),
        direct_only: payload.direct_only,
        kinds: payload
            .kinds
            .as_ref()
            .map(|kinds| kinds.iter().map(|k| map_kind_back(*k)).collect()),
        from: payload.from.map(|dt| dt.with_timezone(&Utc)),
        to: payload.to.map(|dt| dt.with_timezone(&Utc)),
    }
}

pub async fn direct_payment_new(
    State(state): State<ServerState>,
    Json(payload): Json<DirectPaymentNew>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .new_direct_payment(
            payload.payer_id,
            payload.receiver_id,
            Money::new(payload.amount_minor),
            payload.group_id,
            payload.occurred_at.with_timezone(&Utc),
        )
        .await?;
    Ok(Json(map_transaction(&tx)?))
}

pub async fn list(
    State(state): State<ServerState>,
    Json(payload): Json<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = map_filter(&payload);
    let limit = payload.limit.unwrap_or(50);

    let (transactions, next_cursor) = state
        .engine
        .list_transactions(&filter, limit, payload.cursor.as_deref())
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: transactions
            .iter()
            .map(map_transaction)
            .collect::<Result<_, _>>()?,
        next_cursor,
    }))
}

pub async fn grouped(
    State(state): State<ServerState>,
    Json(payload): Json<TransactionList>,
) -> Result<Json<GroupedTransactionsResponse>, ServerError> {
    let filter = map_filter(&payload);
    let groups = state.engine.grouped_transactions(&filter).await?;

    let mut views = Vec::with_capacity(groups.len());
    for group in &groups {
        views.push(GroupedTransactionsView {
            expense: group.expense.as_ref().map(map_expense).transpose()?,
            transactions: group
                .transactions
                .iter()
                .map(map_transaction)
                .collect::<Result<_, _>>()?,
            settled: group.settled,
            summaries: group
                .summaries
                .iter()
                .map(|summary| ParticipantSummaryView {
                    participant_id: summary.participant_id,
                    paid_minor: summary.paid.cents(),
                    owed_minor: summary.owed.cents(),
                    net_minor: summary.net.cents(),
                })
                .collect(),
        });
    }

    Ok(Json(GroupedTransactionsResponse { groups: views }))
}
