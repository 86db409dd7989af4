//! Transaction primitives.
//!
//! A `Transaction` is the atomic unit the ledger is built from. It is
//! oriented debtor → creditor: `payer_id` owes (or, for [`Settle`], has
//! paid) `receiver_id`.
//!
//! - [`Expense`] rows derive from an expense allocation, one per
//!   expense-payer/splitter pair with a nonzero obligation.
//! - [`Direct`] rows are standalone obligations between two parties, not
//!   tied to any expense.
//! - [`Settle`] rows record a completed repayment and are emitted by the
//!   settlement engine.
//!
//! [`Expense`]: TransactionKind::Expense
//! [`Direct`]: TransactionKind::Direct
//! [`Settle`]: TransactionKind::Settle

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Direct,
    Settle,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Direct => "direct",
            Self::Settle => "settle",
        }
    }

    /// `true` for kinds that create an obligation; `false` for kinds that
    /// extinguish one.
    pub fn is_obligation(self) -> bool {
        !matches!(self, Self::Settle)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "direct" => Ok(Self::Direct),
            "settle" => Ok(Self::Settle),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub expense_id: Option<Uuid>,
    pub group_id: Option<String>,
}

impl Transaction {
    pub fn new(
        payer_id: Uuid,
        receiver_id: Uuid,
        amount: Money,
        created_at: DateTime<Utc>,
        kind: TransactionKind,
        expense_id: Option<Uuid>,
        group_id: Option<String>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        // Self-obligations only arise from an expense where a participant is
        // both payer and splitter.
        if payer_id == receiver_id && expense_id.is_none() {
            return Err(EngineError::InvalidId(
                "payer and receiver must differ".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            payer_id,
            receiver_id,
            amount,
            created_at,
            kind,
            expense_id,
            group_id,
        })
    }

    /// `true` when the row is a participant's own share of an expense they
    /// also paid for (payer == receiver). Such rows never move balances.
    pub fn is_self(&self) -> bool {
        self.payer_id == self.receiver_id
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub payer_id: String,
    pub receiver_id: String,
    pub amount_minor: i64,
    pub created_at: DateTimeUtc,
    pub kind: String,
    pub expense_id: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            payer_id: ActiveValue::Set(tx.payer_id.to_string()),
            receiver_id: ActiveValue::Set(tx.receiver_id.to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            created_at: ActiveValue::Set(tx.created_at),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            expense_id: ActiveValue::Set(tx.expense_id.map(|id| id.to_string())),
            group_id: ActiveValue::Set(tx.group_id.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            payer_id: Uuid::parse_str(&model.payer_id)
                .map_err(|_| EngineError::InvalidId("invalid participant id".to_string()))?,
            receiver_id: Uuid::parse_str(&model.receiver_id)
                .map_err(|_| EngineError::InvalidId("invalid participant id".to_string()))?,
            amount: Money::new(model.amount_minor),
            created_at: model.created_at,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            expense_id: model
                .expense_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|_| EngineError::InvalidId("invalid expense id".to_string()))?,
            group_id: model.group_id,
        })
    }
}
