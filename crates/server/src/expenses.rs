//! Expense endpoints.

use api_types::expense::{
    ExpenseNew, ExpenseSaved, ExpenseView, ShareView, SplitInputEntry,
    SplitStrategy as ApiStrategy,
};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{FixedOffset, Utc};
use engine::{ExpenseShare, Money, NewExpense, SplitInput};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_strategy(strategy: ApiStrategy) -> engine::SplitStrategy {
    match strategy {
        ApiStrategy::Equal => engine::SplitStrategy::Equal,
        ApiStrategy::Percentage => engine::SplitStrategy::Percentage,
        ApiStrategy::Weight => engine::SplitStrategy::Weight,
        ApiStrategy::Manual => engine::SplitStrategy::Manual,
        ApiStrategy::Extra => engine::SplitStrategy::Extra,
    }
}

fn map_strategy_back(strategy: engine::SplitStrategy) -> ApiStrategy {
    match strategy {
        engine::SplitStrategy::Equal => ApiStrategy::Equal,
        engine::SplitStrategy::Percentage => ApiStrategy::Percentage,
        engine::SplitStrategy::Weight => ApiStrategy::Weight,
        engine::SplitStrategy::Manual => ApiStrategy::Manual,
        engine::SplitStrategy::Extra => ApiStrategy::Extra,
    }
}

fn map_shares(shares: &[ExpenseShare]) -> Vec<ShareView> {
    shares
        .iter()
        .map(|share| ShareView {
            participant_id: share.participant_id,
            amount_minor: share.amount.cents(),
        })
        .collect()
}

pub(crate) fn map_expense(expense: &engine::Expense) -> Result<ExpenseView, ServerError> {
    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    Ok(ExpenseView {
        id: expense.id,
        description: expense.description.clone(),
        amount_minor: expense.amount.cents(),
        occurred_at: expense.occurred_at.with_timezone(&utc),
        category: expense.category.clone(),
        created_by: expense.created_by,
        group_id: expense.group_id.clone(),
        strategy: map_strategy_back(expense.strategy),
        payers: map_shares(&expense.payers),
        splitters: map_shares(&expense.splitters),
        inputs: expense
            .inputs
            .iter()
            .map(|input| SplitInputEntry {
                participant_id: input.participant_id,
                raw_value: input.raw_value,
            })
            .collect(),
    })
}

fn map_command(payload: ExpenseNew) -> NewExpense {
    NewExpense {
        description: payload.description,
        amount: Money::new(payload.amount_minor),
        occurred_at: payload.occurred_at.with_timezone(&Utc),
        category: payload.category,
        created_by: payload.created_by,
        group_id: payload.group_id,
        payers: payload
            .payers
            .into_iter()
            .map(|payer| ExpenseShare {
                participant_id: payer.participant_id,
                amount: Money::new(payer.amount_minor),
            })
            .collect(),
        splitters: payload.splitters,
        strategy: map_strategy(payload.strategy),
        inputs: payload
            .inputs
            .into_iter()
            .map(|input| SplitInput {
                participant_id: input.participant_id,
                raw_value: input.raw_value,
            })
            .collect(),
    }
}

fn map_saved(saved: engine::SavedExpense) -> Result<Json<ExpenseSaved>, ServerError> {
    if let Some(gap) = saved.percent_gap {
        tracing::warn!(
            expense_id = %saved.expense.id,
            "percentage split does not cover the total (gap {gap}%)"
        );
    }
    Ok(Json(ExpenseSaved {
        expense: map_expense(&saved.expense)?,
        percent_gap: saved.percent_gap,
    }))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseSaved>, ServerError> {
    let saved = state.engine.new_expense(map_command(payload)).await?;
    map_saved(saved)
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseSaved>, ServerError> {
    let saved = state.engine.update_expense(id, map_command(payload)).await?;
    map_saved(saved)
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(id).await?;
    Ok(Json(map_expense(&expense)?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<()>, ServerError> {
    state.engine.delete_expense(id).await?;
    Ok(Json(()))
}
