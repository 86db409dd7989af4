//! Share rows attached to an expense.
//!
//! One row per (expense, participant, role). `payer` and `splitter` rows
//! carry computed cent amounts; `input` rows carry the raw strategy value
//! needed to reproduce the allocation on edit. `position` preserves the
//! input order, which the penny-distribution rules depend on.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareRole {
    Payer,
    Splitter,
    Input,
}

impl ShareRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Payer => "payer",
            Self::Splitter => "splitter",
            Self::Input => "input",
        }
    }
}

impl TryFrom<&str> for ShareRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "payer" => Ok(Self::Payer),
            "splitter" => Ok(Self::Splitter),
            "input" => Ok(Self::Input),
            other => Err(EngineError::InvalidId(format!(
                "invalid share role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub role: String,
    pub position: i32,
    pub amount_minor: Option<i64>,
    pub raw_value: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn share_row(
    expense_id: &str,
    participant_id: &str,
    role: ShareRole,
    position: i32,
    amount_minor: Option<i64>,
    raw_value: Option<f64>,
) -> ActiveModel {
    ActiveModel {
        expense_id: ActiveValue::Set(expense_id.to_string()),
        participant_id: ActiveValue::Set(participant_id.to_string()),
        role: ActiveValue::Set(role.as_str().to_string()),
        position: ActiveValue::Set(position),
        amount_minor: ActiveValue::Set(amount_minor),
        raw_value: ActiveValue::Set(raw_value),
    }
}
