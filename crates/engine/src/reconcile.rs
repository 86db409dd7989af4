//! Transaction reconciliation.
//!
//! Folds a flat transaction log back into per-expense groups for display
//! and status reporting. Direct payments are never merged: each one is its
//! own group, even between the same two parties. A transaction referencing
//! an expense that cannot be found still produces a group, with no expense
//! attached, and is rendered like a direct payment by consumers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Expense, Money, Transaction, TransactionKind, ledger};

/// Per-participant totals within one expense group.
///
/// `paid` is what the participant fronted, `owed` their allocated share,
/// `net` the difference. A participant's own share of an expense they paid
/// (the self row) appears in both sides once and cancels in `net`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub participant_id: Uuid,
    pub paid: Money,
    pub owed: Money,
    pub net: Money,
}

/// One display group: an expense with its derived and settling
/// transactions, or a single standalone transfer.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupedTransactions {
    pub expense: Option<Expense>,
    pub transactions: Vec<Transaction>,
    /// `Some` only for groups with a resolved expense.
    pub settled: Option<bool>,
    pub summaries: Vec<ParticipantSummary>,
}

/// Groups a transaction log by originating expense.
///
/// Output ordering: groups descending by the expense's own time when
/// available, else by the earliest transaction in the group. Within a
/// group, settle rows come first; ties keep input order.
pub fn reconcile(
    transactions: Vec<Transaction>,
    expenses: &HashMap<Uuid, Expense>,
) -> Vec<GroupedTransactions> {
    let mut order: Vec<Option<Uuid>> = Vec::new();
    let mut by_expense: HashMap<Uuid, Vec<Transaction>> = HashMap::new();
    let mut standalone: Vec<Transaction> = Vec::new();

    for tx in transactions {
        match tx.expense_id {
            Some(expense_id) => {
                by_expense
                    .entry(expense_id)
                    .or_insert_with(|| {
                        order.push(Some(expense_id));
                        Vec::new()
                    })
                    .push(tx);
            }
            None => {
                order.push(None);
                standalone.push(tx);
            }
        }
    }
    // Standalone rows are consumed in input order as their keys come up.
    standalone.reverse();

    let mut groups: Vec<GroupedTransactions> = Vec::with_capacity(order.len());
    for key in order {
        let group = match key {
            Some(expense_id) => {
                let Some(mut batch) = by_expense.remove(&expense_id) else {
                    continue;
                };
                batch.sort_by_key(|tx| tx.kind != TransactionKind::Settle);
                let expense = expenses.get(&expense_id).cloned();
                let settled = expense
                    .is_some()
                    .then(|| ledger::expense_settled(expense_id, &batch));
                let summaries = if expense.is_some() {
                    summarize(&batch)
                } else {
                    Vec::new()
                };
                GroupedTransactions {
                    expense,
                    transactions: batch,
                    settled,
                    summaries,
                }
            }
            None => {
                let Some(tx) = standalone.pop() else { continue };
                GroupedTransactions {
                    expense: None,
                    transactions: vec![tx],
                    settled: None,
                    summaries: Vec::new(),
                }
            }
        };
        groups.push(group);
    }

    groups.sort_by(|a, b| sort_time(b).cmp(&sort_time(a)));
    groups
}

fn sort_time(group: &GroupedTransactions) -> DateTime<Utc> {
    if let Some(expense) = &group.expense {
        return expense.occurred_at;
    }
    group
        .transactions
        .iter()
        .map(|tx| tx.created_at)
        .min()
        .unwrap_or_default()
}

fn summarize(transactions: &[Transaction]) -> Vec<ParticipantSummary> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut paid: HashMap<Uuid, i64> = HashMap::new();
    let mut owed: HashMap<Uuid, i64> = HashMap::new();
    let mut touch = |order: &mut Vec<Uuid>, id: Uuid| {
        if !order.contains(&id) {
            order.push(id);
        }
    };

    for tx in transactions {
        if tx.kind != TransactionKind::Expense {
            continue;
        }
        touch(&mut order, tx.payer_id);
        touch(&mut order, tx.receiver_id);
        *owed.entry(tx.payer_id).or_insert(0) += tx.amount.cents();
        *paid.entry(tx.receiver_id).or_insert(0) += tx.amount.cents();
    }

    order
        .into_iter()
        .map(|id| {
            let paid = Money::new(paid.get(&id).copied().unwrap_or(0));
            let owed = Money::new(owed.get(&id).copied().unwrap_or(0));
            ParticipantSummary {
                participant_id: id,
                paid,
                owed,
                net: paid - owed,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::SplitStrategy;

    fn tx(
        payer: Uuid,
        receiver: Uuid,
        cents: i64,
        kind: TransactionKind,
        expense_id: Option<Uuid>,
        offset_minutes: i64,
    ) -> Transaction {
        let mut tx = Transaction::new(
            payer,
            receiver,
            Money::new(cents),
            Utc::now(),
            kind,
            expense_id,
            None,
        )
        .unwrap();
        tx.created_at += TimeDelta::minutes(offset_minutes);
        tx
    }

    fn expense(id: Uuid, cents: i64, created_by: Uuid) -> Expense {
        let mut expense = Expense::new(
            "Dinner".to_string(),
            Money::new(cents),
            Utc::now(),
            None,
            created_by,
            None,
            SplitStrategy::Equal,
        )
        .unwrap();
        expense.id = id;
        expense
    }

    #[test]
    fn direct_payments_never_merge() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            tx(a, b, 10_00, TransactionKind::Direct, None, 0),
            tx(a, b, 10_00, TransactionKind::Direct, None, 1),
        ];
        let groups = reconcile(log, &HashMap::new());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn expense_transactions_merge_into_one_group() {
        let (payer, s1, s2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let expense_id = Uuid::new_v4();
        let log = vec![
            tx(s1, payer, 33_34, TransactionKind::Expense, Some(expense_id), 0),
            tx(s2, payer, 33_33, TransactionKind::Expense, Some(expense_id), 1),
            tx(s1, payer, 33_34, TransactionKind::Settle, Some(expense_id), 2),
        ];
        let expenses = HashMap::from([(expense_id, expense(expense_id, 100_00, payer))]);

        let groups = reconcile(log, &expenses);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.transactions.len(), 3);
        // Settle rows are listed first.
        assert_eq!(group.transactions[0].kind, TransactionKind::Settle);
        assert_eq!(group.settled, Some(false));
    }

    #[test]
    fn lookup_miss_degrades_to_plain_group() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![tx(a, b, 5_00, TransactionKind::Expense, Some(Uuid::new_v4()), 0)];
        let groups = reconcile(log, &HashMap::new());
        assert_eq!(groups.len(), 1);
        assert!(groups[0].expense.is_none());
        assert_eq!(groups[0].settled, None);
    }

    #[test]
    fn groups_sort_newest_first() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            tx(a, b, 1_00, TransactionKind::Direct, None, 0),
            tx(a, b, 2_00, TransactionKind::Direct, None, 60),
        ];
        let groups = reconcile(log, &HashMap::new());
        assert_eq!(groups[0].transactions[0].amount, Money::new(2_00));
        assert_eq!(groups[1].transactions[0].amount, Money::new(1_00));
    }

    #[test]
    fn summaries_count_self_share_once() {
        let (payer, other) = (Uuid::new_v4(), Uuid::new_v4());
        let expense_id = Uuid::new_v4();
        let log = vec![
            tx(payer, payer, 50_00, TransactionKind::Expense, Some(expense_id), 0),
            tx(other, payer, 50_00, TransactionKind::Expense, Some(expense_id), 0),
        ];
        let expenses = HashMap::from([(expense_id, expense(expense_id, 100_00, payer))]);

        let groups = reconcile(log, &expenses);
        let summary = groups[0]
            .summaries
            .iter()
            .find(|s| s.participant_id == payer)
            .unwrap();
        assert_eq!(summary.paid, Money::new(100_00));
        assert_eq!(summary.owed, Money::new(50_00));
        assert_eq!(summary.net, Money::new(50_00));

        let summary = groups[0]
            .summaries
            .iter()
            .find(|s| s.participant_id == other)
            .unwrap();
        assert_eq!(summary.net, Money::new(-50_00));
    }
}
