//! Settlement planning.
//!
//! Turns a scoped transaction log into the transfers that zero every
//! involved net position. Netting is partitioned: each expense is netted on
//! its own, and direct obligations are netted per group scope, so transfers
//! from one expense never offset transfers from another.
//!
//! The reduction is deterministic greedy (first debtor against first
//! creditor, in input order), not minimum-transfer-count-optimal. Repeated
//! runs over the same input produce identical plans, which is what makes
//! retries after a partial failure safe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, Transaction};

/// A transaction-shaped transfer produced by the planner, oriented
/// debtor → creditor like the obligations it extinguishes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransfer {
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: Money,
    pub expense_id: Option<Uuid>,
    pub group_id: Option<String>,
}

/// A transfer whose persistence failed, with enough context to retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedTransfer {
    pub transfer: SettlementTransfer,
    pub reason: String,
}

/// Outcome of applying a settlement plan.
///
/// There is no atomic multi-transfer guarantee: transfers already applied
/// stand, failures are listed, and a retry re-plans from the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementReport {
    pub applied: Vec<Transaction>,
    pub failed: Vec<FailedTransfer>,
}

impl SettlementReport {
    /// `true` when every planned transfer was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct PartitionKey {
    expense_id: Option<Uuid>,
    group_id: Option<String>,
}

/// Computes the settling transfers for an already-scoped transaction log.
///
/// Pure: persisting and applying the plan is the caller's job. Partitions
/// whose nets are already zero produce no transfers.
pub fn plan(transactions: &[Transaction]) -> Vec<SettlementTransfer> {
    let mut order: Vec<PartitionKey> = Vec::new();
    let mut partitions: HashMap<PartitionKey, Vec<&Transaction>> = HashMap::new();

    for tx in transactions {
        let key = PartitionKey {
            expense_id: tx.expense_id,
            group_id: tx.group_id.clone(),
        };
        partitions
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key.clone());
                Vec::new()
            })
            .push(tx);
    }

    let mut transfers = Vec::new();
    for key in order {
        let Some(batch) = partitions.get(&key) else {
            continue;
        };
        net_partition(&key, batch, &mut transfers);
    }
    transfers
}

fn net_partition(
    key: &PartitionKey,
    transactions: &[&Transaction],
    transfers: &mut Vec<SettlementTransfer>,
) {
    // Signed nets in first-appearance order: negative = owes, positive = owed.
    let mut order: Vec<Uuid> = Vec::new();
    let mut nets: HashMap<Uuid, i64> = HashMap::new();
    let mut touch = |order: &mut Vec<Uuid>, nets: &mut HashMap<Uuid, i64>, id: Uuid| {
        if !nets.contains_key(&id) {
            nets.insert(id, 0);
            order.push(id);
        }
    };

    for tx in transactions {
        touch(&mut order, &mut nets, tx.payer_id);
        touch(&mut order, &mut nets, tx.receiver_id);
        let amount = if tx.kind.is_obligation() {
            tx.amount.cents()
        } else {
            -tx.amount.cents()
        };
        if let Some(net) = nets.get_mut(&tx.payer_id) {
            *net -= amount;
        }
        if let Some(net) = nets.get_mut(&tx.receiver_id) {
            *net += amount;
        }
    }

    loop {
        let debtor = order.iter().find(|id| nets[*id] < 0).copied();
        let creditor = order.iter().find(|id| nets[*id] > 0).copied();
        let (Some(debtor), Some(creditor)) = (debtor, creditor) else {
            break;
        };

        let amount = (-nets[&debtor]).min(nets[&creditor]);
        transfers.push(SettlementTransfer {
            payer_id: debtor,
            receiver_id: creditor,
            amount: Money::new(amount),
            expense_id: key.expense_id,
            group_id: key.group_id.clone(),
        });
        if let Some(net) = nets.get_mut(&debtor) {
            *net += amount;
        }
        if let Some(net) = nets.get_mut(&creditor) {
            *net -= amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{BalanceBook, TransactionKind};

    fn tx(
        payer: Uuid,
        receiver: Uuid,
        cents: i64,
        kind: TransactionKind,
        expense_id: Option<Uuid>,
        group_id: Option<&str>,
    ) -> Transaction {
        Transaction::new(
            payer,
            receiver,
            Money::new(cents),
            Utc::now(),
            kind,
            expense_id,
            group_id.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn partitions_are_never_merged() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            tx(a, b, 30_00, TransactionKind::Expense, Some(x), None),
            tx(b, a, 10_00, TransactionKind::Expense, Some(y), None),
        ];

        let transfers = plan(&log);
        assert_eq!(transfers.len(), 2);
        assert_eq!(
            transfers[0],
            SettlementTransfer {
                payer_id: a,
                receiver_id: b,
                amount: Money::new(30_00),
                expense_id: Some(x),
                group_id: None,
            }
        );
        assert_eq!(
            transfers[1],
            SettlementTransfer {
                payer_id: b,
                receiver_id: a,
                amount: Money::new(10_00),
                expense_id: Some(y),
                group_id: None,
            }
        );
    }

    #[test]
    fn multi_party_expense_nets_to_zero() {
        let (payer, s1, s2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let expense = Uuid::new_v4();
        let log = vec![
            tx(s1, payer, 33_34, TransactionKind::Expense, Some(expense), None),
            tx(s2, payer, 33_33, TransactionKind::Expense, Some(expense), None),
        ];

        let transfers = plan(&log);
        assert_eq!(transfers.len(), 2);

        let mut book = BalanceBook::new();
        for row in &log {
            book.apply(row);
        }
        for transfer in &transfers {
            let settle = Transaction::new(
                transfer.payer_id,
                transfer.receiver_id,
                transfer.amount,
                Utc::now(),
                TransactionKind::Settle,
                transfer.expense_id,
                transfer.group_id.clone(),
            )
            .unwrap();
            book.apply(&settle);
        }
        for id in [payer, s1, s2] {
            for other in [payer, s1, s2] {
                if id != other {
                    assert_eq!(book.net(id, other, None).unwrap(), Money::ZERO);
                }
            }
        }
    }

    #[test]
    fn already_settled_partition_yields_no_transfers() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let expense = Uuid::new_v4();
        let log = vec![
            tx(a, b, 12_00, TransactionKind::Expense, Some(expense), None),
            tx(a, b, 12_00, TransactionKind::Settle, Some(expense), None),
        ];
        assert!(plan(&log).is_empty());
    }

    #[test]
    fn direct_obligations_net_per_group_scope() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            tx(a, b, 10_00, TransactionKind::Direct, None, None),
            tx(b, a, 4_00, TransactionKind::Direct, None, Some("trip")),
        ];

        let transfers = plan(&log);
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].group_id, None);
        assert_eq!(transfers[0].amount, Money::new(10_00));
        assert_eq!(transfers[1].group_id, Some("trip".to_string()));
        assert_eq!(transfers[1].amount, Money::new(4_00));
    }

    #[test]
    fn direct_obligations_in_same_scope_net_together() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            tx(a, b, 10_00, TransactionKind::Direct, None, None),
            tx(b, a, 4_00, TransactionKind::Direct, None, None),
        ];

        let transfers = plan(&log);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].payer_id, a);
        assert_eq!(transfers[0].receiver_id, b);
        assert_eq!(transfers[0].amount, Money::new(6_00));
    }

    #[test]
    fn planning_is_deterministic() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let expense = Uuid::new_v4();
        let log = vec![
            tx(ids[0], ids[3], 25_00, TransactionKind::Expense, Some(expense), None),
            tx(ids[1], ids[3], 25_00, TransactionKind::Expense, Some(expense), None),
            tx(ids[2], ids[3], 25_00, TransactionKind::Expense, Some(expense), None),
            tx(ids[3], ids[3], 25_00, TransactionKind::Expense, Some(expense), None),
        ];
        assert_eq!(plan(&log), plan(&log));
    }

    #[test]
    fn self_rows_do_not_produce_transfers() {
        let a = Uuid::new_v4();
        let expense = Uuid::new_v4();
        let log = vec![tx(a, a, 25_00, TransactionKind::Expense, Some(expense), None)];
        assert!(plan(&log).is_empty());
    }
}
