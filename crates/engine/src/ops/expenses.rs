use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseShare, Money, ResultEngine, SplitInput, SplitStrategy,
    Transaction, TransactionKind,
    expense_shares::{self, ShareRole, share_row},
    expenses, ledger, split, transactions,
};

use super::{Engine, apply_balance_deltas, with_tx};

/// Command for creating (or re-allocating, on edit) an expense.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub description: String,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
    pub category: Option<String>,
    pub created_by: Uuid,
    pub group_id: Option<String>,
    /// Who fronted the money, with explicit amounts summing to the total.
    pub payers: Vec<ExpenseShare>,
    /// Who shares the cost, in input order.
    pub splitters: Vec<Uuid>,
    pub strategy: SplitStrategy,
    pub inputs: Vec<SplitInput>,
}

/// A persisted expense plus the percentage-gap warning signal, when the
/// percentage strategy was used with inputs not summing to 100.
#[derive(Clone, Debug)]
pub struct SavedExpense {
    pub expense: Expense,
    pub percent_gap: Option<f64>,
}

fn validate_payers(payers: &[ExpenseShare], amount: Money) -> ResultEngine<()> {
    if payers.is_empty() {
        return Err(EngineError::InvalidSplit(
            "payer set must not be empty".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::with_capacity(payers.len());
    for payer in payers {
        if payer.amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "payer amount must not be negative".to_string(),
            ));
        }
        if !seen.insert(payer.participant_id) {
            return Err(EngineError::InvalidSplit("duplicate payer".to_string()));
        }
    }
    let paid: Money = payers.iter().map(|p| p.amount).sum();
    if paid != amount {
        return Err(EngineError::InvalidAmount(format!(
            "payer amounts sum to {paid}, expense total is {amount}"
        )));
    }
    Ok(())
}

/// Derives the obligation rows of an allocated expense: one per
/// payer/splitter pair with a nonzero obligation, oriented
/// splitter (debtor) → payer (creditor). A participant on both sides keeps
/// their own share as a self row.
fn derive_transactions(expense: &Expense) -> ResultEngine<Vec<Transaction>> {
    let mut derived = Vec::new();
    for splitter in &expense.splitters {
        if !splitter.amount.is_positive() {
            continue;
        }
        let parts = split::allocate_across_payers(splitter.amount, &expense.payers)?;
        for (payer, part) in expense.payers.iter().zip(parts) {
            if !part.is_positive() {
                continue;
            }
            derived.push(Transaction::new(
                splitter.participant_id,
                payer.participant_id,
                part,
                expense.occurred_at,
                TransactionKind::Expense,
                Some(expense.id),
                expense.group_id.clone(),
            )?);
        }
    }
    Ok(derived)
}

fn share_rows(expense: &Expense) -> Vec<expense_shares::ActiveModel> {
    let expense_id = expense.id.to_string();
    let mut rows = Vec::new();
    for (position, payer) in expense.payers.iter().enumerate() {
        rows.push(share_row(
            &expense_id,
            &payer.participant_id.to_string(),
            ShareRole::Payer,
            position as i32,
            Some(payer.amount.cents()),
            None,
        ));
    }
    for (position, splitter) in expense.splitters.iter().enumerate() {
        rows.push(share_row(
            &expense_id,
            &splitter.participant_id.to_string(),
            ShareRole::Splitter,
            position as i32,
            Some(splitter.amount.cents()),
            None,
        ));
    }
    for (position, input) in expense.inputs.iter().enumerate() {
        rows.push(share_row(
            &expense_id,
            &input.participant_id.to_string(),
            ShareRole::Input,
            position as i32,
            None,
            Some(input.raw_value),
        ));
    }
    rows
}

/// Loads an expense with its payer/splitter/input rows, in stored order.
pub(crate) async fn load_expense<C: ConnectionTrait>(db: &C, id: Uuid) -> ResultEngine<Expense> {
    let model = expenses::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
    let mut expense = Expense::try_from(model)?;

    let rows = expense_shares::Entity::find()
        .filter(expense_shares::Column::ExpenseId.eq(id.to_string()))
        .order_by_asc(expense_shares::Column::Role)
        .order_by_asc(expense_shares::Column::Position)
        .all(db)
        .await?;

    for row in rows {
        let participant_id = super::parse_uuid(&row.participant_id, "participant")?;
        match ShareRole::try_from(row.role.as_str())? {
            ShareRole::Payer | ShareRole::Splitter => {
                let amount = row.amount_minor.ok_or_else(|| {
                    EngineError::InvalidAmount("missing share amount".to_string())
                })?;
                let share = ExpenseShare {
                    participant_id,
                    amount: Money::new(amount),
                };
                if row.role == ShareRole::Payer.as_str() {
                    expense.payers.push(share);
                } else {
                    expense.splitters.push(share);
                }
            }
            ShareRole::Input => {
                let raw_value = row.raw_value.ok_or_else(|| {
                    EngineError::InvalidAmount("missing input value".to_string())
                })?;
                expense.inputs.push(SplitInput {
                    participant_id,
                    raw_value,
                });
            }
        }
    }
    Ok(expense)
}

async fn expense_has_settlements<C: ConnectionTrait>(db: &C, id: Uuid) -> ResultEngine<bool> {
    let settle = transactions::Entity::find()
        .filter(transactions::Column::ExpenseId.eq(id.to_string()))
        .filter(transactions::Column::Kind.eq(TransactionKind::Settle.as_str()))
        .one(db)
        .await?;
    Ok(settle.is_some())
}

async fn load_derived<C: ConnectionTrait>(db: &C, id: Uuid) -> ResultEngine<Vec<Transaction>> {
    let models = transactions::Entity::find()
        .filter(transactions::Column::ExpenseId.eq(id.to_string()))
        .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
        .all(db)
        .await?;
    models.into_iter().map(Transaction::try_from).collect()
}

impl Engine {
    /// Creates an expense: allocates shares, derives the obligation rows and
    /// updates the affected balances, all in one DB transaction.
    ///
    /// Allocation failures reject the call before anything is persisted.
    pub async fn new_expense(&self, cmd: NewExpense) -> ResultEngine<SavedExpense> {
        validate_payers(&cmd.payers, cmd.amount)?;

        let mut involved: Vec<Uuid> = cmd.payers.iter().map(|p| p.participant_id).collect();
        involved.extend(&cmd.splitters);
        involved.push(cmd.created_by);
        involved.sort_unstable();
        involved.dedup();
        self.require_participants(&involved).await?;

        let allocation = split::allocate(cmd.amount, &cmd.splitters, cmd.strategy, &cmd.inputs)?;

        let mut expense = Expense::new(
            cmd.description,
            cmd.amount,
            cmd.occurred_at,
            cmd.category,
            cmd.created_by,
            cmd.group_id,
            cmd.strategy,
        )?;
        expense.payers = cmd.payers;
        expense.splitters = allocation.shares;
        expense.inputs = cmd.inputs;

        let derived = derive_transactions(&expense)?;

        with_tx!(self, |db_tx| {
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            for row in share_rows(&expense) {
                row.insert(&db_tx).await?;
            }
            for tx in &derived {
                transactions::ActiveModel::from(tx).insert(&db_tx).await?;
                apply_balance_deltas(&db_tx, &ledger::entry_deltas(tx, false)).await?;
            }
            Ok(SavedExpense {
                expense,
                percent_gap: allocation.percent_gap,
            })
        })
    }

    /// Re-allocates an existing expense.
    ///
    /// The previously derived obligations are fully reversed before the new
    /// set is applied, so a partial edit can never leave residual drift.
    /// Refused once any settlement references the expense.
    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        cmd: NewExpense,
    ) -> ResultEngine<SavedExpense> {
        validate_payers(&cmd.payers, cmd.amount)?;

        let mut involved: Vec<Uuid> = cmd.payers.iter().map(|p| p.participant_id).collect();
        involved.extend(&cmd.splitters);
        involved.sort_unstable();
        involved.dedup();
        self.require_participants(&involved).await?;

        let allocation = split::allocate(cmd.amount, &cmd.splitters, cmd.strategy, &cmd.inputs)?;

        with_tx!(self, |db_tx| {
            // Existence check; the stored header is replaced wholesale below.
            load_expense(&db_tx, expense_id).await?;
            if expense_has_settlements(&db_tx, expense_id).await? {
                return Err(EngineError::InvalidAmount(
                    "cannot update an expense with settlements".to_string(),
                ));
            }

            let old_derived = load_derived(&db_tx, expense_id).await?;
            for tx in &old_derived {
                apply_balance_deltas(&db_tx, &ledger::entry_deltas(tx, true)).await?;
            }
            transactions::Entity::delete_many()
                .filter(transactions::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expense_shares::Entity::delete_many()
                .filter(expense_shares::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;

            let mut expense = Expense::new(
                cmd.description.clone(),
                cmd.amount,
                cmd.occurred_at,
                cmd.category.clone(),
                cmd.created_by,
                cmd.group_id.clone(),
                cmd.strategy,
            )?;
            expense.id = expense_id;
            expense.payers = cmd.payers.clone();
            expense.splitters = allocation.shares.clone();
            expense.inputs = cmd.inputs.clone();

            expenses::ActiveModel::from(&expense).update(&db_tx).await?;
            for row in share_rows(&expense) {
                row.insert(&db_tx).await?;
            }
            let derived = derive_transactions(&expense)?;
            for tx in &derived {
                transactions::ActiveModel::from(tx).insert(&db_tx).await?;
                apply_balance_deltas(&db_tx, &ledger::entry_deltas(tx, false)).await?;
            }

            Ok(SavedExpense {
                expense,
                percent_gap: allocation.percent_gap,
            })
        })
    }

    /// Removes an expense, reversing its ledger effect. Refused once any
    /// settlement references it.
    pub async fn delete_expense(&self, expense_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            load_expense(&db_tx, expense_id).await?;
            if expense_has_settlements(&db_tx, expense_id).await? {
                return Err(EngineError::InvalidAmount(
                    "cannot delete an expense with settlements".to_string(),
                ));
            }

            let derived = load_derived(&db_tx, expense_id).await?;
            for tx in &derived {
                apply_balance_deltas(&db_tx, &ledger::entry_deltas(tx, true)).await?;
            }
            transactions::Entity::delete_many()
                .filter(transactions::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expense_shares::Entity::delete_many()
                .filter(expense_shares::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Return an [`Expense`] with its shares and raw inputs.
    pub async fn expense(&self, expense_id: Uuid) -> ResultEngine<Expense> {
        load_expense(&self.database, expense_id).await
    }
}
