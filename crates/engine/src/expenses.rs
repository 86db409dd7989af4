//! Expense primitives.
//!
//! An `Expense` is a shared cost: a total amount fronted by one or more
//! payers and split among one or more splitters under a [`SplitStrategy`].
//! After allocation both sides sum to the total, to the cent.
//!
//! The strategy-specific raw user inputs (percentages, weights, manual
//! amounts, adjustments) are persisted alongside the computed shares so an
//! edit can reproduce the same allocation.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    Equal,
    Percentage,
    Weight,
    Manual,
    Extra,
}

impl SplitStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage => "percentage",
            Self::Weight => "weight",
            Self::Manual => "manual",
            Self::Extra => "extra",
        }
    }
}

impl TryFrom<&str> for SplitStrategy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "percentage" => Ok(Self::Percentage),
            "weight" => Ok(Self::Weight),
            "manual" => Ok(Self::Manual),
            "extra" => Ok(Self::Extra),
            other => Err(EngineError::InvalidSplit(format!(
                "invalid split strategy: {other}"
            ))),
        }
    }
}

/// A computed (participant, amount) pair on either side of an expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseShare {
    pub participant_id: Uuid,
    pub amount: Money,
}

/// A strategy-specific raw input supplied by the user for one participant.
///
/// The meaning of `raw_value` depends on the strategy: a percentage in
/// `[0, 100]`, a non-negative weight, a manual amount in major units, or a
/// signed adjustment in major units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitInput {
    pub participant_id: Uuid,
    pub raw_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
    pub category: Option<String>,
    pub created_by: Uuid,
    pub group_id: Option<String>,
    pub payers: Vec<ExpenseShare>,
    pub splitters: Vec<ExpenseShare>,
    pub strategy: SplitStrategy,
    pub inputs: Vec<SplitInput>,
}

impl Expense {
    pub fn new(
        description: String,
        amount: Money,
        occurred_at: DateTime<Utc>,
        category: Option<String>,
        created_by: Uuid,
        group_id: Option<String>,
        strategy: SplitStrategy,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            description,
            amount,
            occurred_at,
            category,
            created_by,
            group_id,
            payers: Vec::new(),
            splitters: Vec::new(),
            strategy,
            inputs: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub description: String,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub category: Option<String>,
    pub created_by: String,
    pub group_id: Option<String>,
    pub strategy: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_shares::Entity")]
    Shares,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::expense_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            category: ActiveValue::Set(expense.category.clone()),
            created_by: ActiveValue::Set(expense.created_by.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            strategy: ActiveValue::Set(expense.strategy.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    /// Builds the header only; `payers`/`splitters`/`inputs` are loaded from
    /// the share rows by the caller.
    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?,
            description: model.description,
            amount: Money::new(model.amount_minor),
            occurred_at: model.occurred_at,
            category: model.category,
            created_by: Uuid::parse_str(&model.created_by)
                .map_err(|_| EngineError::InvalidId("invalid participant id".to_string()))?,
            group_id: model.group_id,
            payers: Vec::new(),
            splitters: Vec::new(),
            strategy: SplitStrategy::try_from(model.strategy.as_str())?,
            inputs: Vec::new(),
        })
    }
}
