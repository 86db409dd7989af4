//! Pairwise balance ledger.
//!
//! For every ordered pair of parties the ledger holds a signed net position:
//! positive = the counterparty owes the holder. Every entry has a mirror
//! with the opposite sign; the pair therefore always sums to zero
//! (the symmetry invariant). Violations are surfaced as
//! [`LedgerInconsistency`](crate::EngineError::LedgerInconsistency), never
//! silently corrected.
//!
//! Balances are scoped: the direct scope holds transactions with no group,
//! each group scope holds only its own. The two views are kept apart; the
//! total relationship balance is their sum and is computed by callers.

use std::collections::{HashMap, HashSet};

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, Transaction};

/// Matching tolerance in cents for settled-status checks. Covers rounding
/// accumulation, not a business grace amount.
pub const SETTLED_TOLERANCE_MINOR: i64 = 1;

/// One signed balance cell: `owner`'s net position versus `counterparty`
/// within a scope (`group_id` = `None` for the direct scope).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub owner_id: Uuid,
    pub counterparty_id: Uuid,
    pub group_id: Option<String>,
    pub net: Money,
}

/// The two cell updates a single transaction produces (four when reversing).
///
/// Obligation kinds add `+amount` to (receiver, payer) and `-amount` to
/// (payer, receiver); settle rows apply equal-and-opposite. Self rows
/// produce nothing.
pub fn entry_deltas(tx: &Transaction, reverse: bool) -> Vec<BalanceEntry> {
    if tx.is_self() {
        return Vec::new();
    }
    let mut signed = if tx.kind.is_obligation() {
        tx.amount.cents()
    } else {
        -tx.amount.cents()
    };
    if reverse {
        signed = -signed;
    }
    vec![
        BalanceEntry {
            owner_id: tx.receiver_id,
            counterparty_id: tx.payer_id,
            group_id: tx.group_id.clone(),
            net: Money::new(signed),
        },
        BalanceEntry {
            owner_id: tx.payer_id,
            counterparty_id: tx.receiver_id,
            group_id: tx.group_id.clone(),
            net: Money::new(-signed),
        },
    ]
}

/// In-memory pairwise book.
///
/// Used to replay transaction logs (recompute, audits) and as the reference
/// implementation of the application rule the persisted `balance_entries`
/// rows follow. Application is idempotent per transaction id.
#[derive(Debug, Default)]
pub struct BalanceBook {
    cells: HashMap<(Uuid, Uuid, Option<String>), i64>,
    applied: HashSet<Uuid>,
}

impl BalanceBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a transaction. Reapplying the same transaction id is a no-op.
    pub fn apply(&mut self, tx: &Transaction) {
        if !self.applied.insert(tx.id) {
            return;
        }
        for delta in entry_deltas(tx, false) {
            *self
                .cells
                .entry((delta.owner_id, delta.counterparty_id, delta.group_id))
                .or_insert(0) += delta.net.cents();
        }
    }

    /// Reverses a previously applied transaction (equal-and-opposite).
    pub fn reverse(&mut self, tx: &Transaction) {
        if !self.applied.remove(&tx.id) {
            return;
        }
        for delta in entry_deltas(tx, true) {
            *self
                .cells
                .entry((delta.owner_id, delta.counterparty_id, delta.group_id))
                .or_insert(0) += delta.net.cents();
        }
    }

    /// Signed net position of `a` versus `b` in the given scope.
    ///
    /// Verifies the symmetry invariant for the pair before answering.
    pub fn net(&self, a: Uuid, b: Uuid, group_id: Option<&str>) -> ResultEngine<Money> {
        let scope = group_id.map(str::to_string);
        let ab = self.cells.get(&(a, b, scope.clone())).copied().unwrap_or(0);
        let ba = self.cells.get(&(b, a, scope)).copied().unwrap_or(0);
        if ab != -ba {
            return Err(EngineError::LedgerInconsistency(format!(
                "pair {a}/{b} is not zero-sum: {ab} vs {ba}"
            )));
        }
        Ok(Money::new(ab))
    }

    /// Checks the symmetry invariant across every cell.
    pub fn verify(&self) -> ResultEngine<()> {
        for ((a, b, scope), net) in &self.cells {
            let mirror = self
                .cells
                .get(&(*b, *a, scope.clone()))
                .copied()
                .unwrap_or(0);
            if *net != -mirror {
                return Err(EngineError::LedgerInconsistency(format!(
                    "pair {a}/{b} is not zero-sum: {net} vs {mirror}"
                )));
            }
        }
        Ok(())
    }

    /// All non-zero cells, for persisting a recomputed book.
    pub fn entries(&self) -> Vec<BalanceEntry> {
        let mut entries: Vec<BalanceEntry> = self
            .cells
            .iter()
            .filter(|(_, net)| **net != 0)
            .map(|((owner, counterparty, scope), net)| BalanceEntry {
                owner_id: *owner,
                counterparty_id: *counterparty,
                group_id: scope.clone(),
                net: Money::new(*net),
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.owner_id, a.counterparty_id, &a.group_id).cmp(&(
                b.owner_id,
                b.counterparty_id,
                &b.group_id,
            ))
        });
        entries
    }
}

/// Settled status of one expense given its transaction log.
///
/// Nets the expense's obligation rows against its settle rows per party;
/// settled when every party's residual is within
/// [`SETTLED_TOLERANCE_MINOR`] of zero. Transfers need not mirror the
/// original payer/splitter pairs (a multi-payer expense settles across
/// pairs); only the residuals matter. Self rows carry a participant's own
/// share and need no repayment.
pub fn expense_settled(expense_id: Uuid, transactions: &[Transaction]) -> bool {
    let mut nets: HashMap<Uuid, i64> = HashMap::new();

    for tx in transactions {
        if tx.expense_id != Some(expense_id) || tx.is_self() {
            continue;
        }
        let amount = if tx.kind.is_obligation() {
            tx.amount.cents()
        } else {
            -tx.amount.cents()
        };
        *nets.entry(tx.payer_id).or_insert(0) -= amount;
        *nets.entry(tx.receiver_id).or_insert(0) += amount;
    }

    // No borrowers (everyone covered their own share): nothing to repay.
    nets.values().all(|net| net.abs() <= SETTLED_TOLERANCE_MINOR)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub counterparty_id: String,
    /// Empty string = direct scope (composite primary keys cannot be NULL).
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_key: String,
    pub net_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BalanceEntry> for ActiveModel {
    fn from(entry: &BalanceEntry) -> Self {
        Self {
            owner_id: ActiveValue::Set(entry.owner_id.to_string()),
            counterparty_id: ActiveValue::Set(entry.counterparty_id.to_string()),
            group_key: ActiveValue::Set(entry.group_id.clone().unwrap_or_default()),
            net_minor: ActiveValue::Set(entry.net.cents()),
        }
    }
}

impl TryFrom<Model> for BalanceEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            owner_id: Uuid::parse_str(&model.owner_id)
                .map_err(|_| EngineError::InvalidId("invalid participant id".to_string()))?,
            counterparty_id: Uuid::parse_str(&model.counterparty_id)
                .map_err(|_| EngineError::InvalidId("invalid participant id".to_string()))?,
            group_id: (!model.group_key.is_empty()).then_some(model.group_key),
            net: Money::new(model.net_minor),
        })
    }
}
