use chrono::Utc;
use sea_orm::Database;

use engine::{
    Engine, ExpenseShare, Money, NewExpense, SettleScope, SplitStrategy, TransactionKind,
    TransactionListFilter,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

async fn participants(engine: &Engine, names: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(engine.new_participant(name, None).await.unwrap().id);
    }
    ids
}

fn equal_expense(
    amount_minor: i64,
    payer: Uuid,
    splitters: Vec<Uuid>,
    group_id: Option<&str>,
) -> NewExpense {
    NewExpense {
        description: "Dinner".to_string(),
        amount: Money::new(amount_minor),
        occurred_at: Utc::now(),
        category: None,
        created_by: payer,
        group_id: group_id.map(str::to_string),
        payers: vec![ExpenseShare {
            participant_id: payer,
            amount: Money::new(amount_minor),
        }],
        splitters,
        strategy: SplitStrategy::Equal,
        inputs: Vec::new(),
    }
}

#[tokio::test]
async fn settling_a_direct_obligation_zeroes_the_pair() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    engine
        .new_direct_payment(alice, bob, Money::new(10_00), None, Utc::now())
        .await
        .unwrap();
    assert_eq!(
        engine.balance_between(bob, alice, None).await.unwrap(),
        Money::new(10_00)
    );

    let report = engine
        .settle(SettleScope::Direct { a: alice, b: bob })
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.applied[0].payer_id, alice);
    assert_eq!(report.applied[0].receiver_id, bob);
    assert_eq!(report.applied[0].amount, Money::new(10_00));
    assert_eq!(report.applied[0].kind, TransactionKind::Settle);

    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::ZERO
    );
    engine.verify_ledger().await.unwrap();
}

#[tokio::test]
async fn expenses_settle_per_partition_never_netted_together() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    // X: bob owes alice 30. Y: alice owes bob 10.
    let x = engine
        .new_expense(equal_expense(60_00, alice, vec![alice, bob], None))
        .await
        .unwrap();
    let y = engine
        .new_expense(equal_expense(20_00, bob, vec![alice, bob], None))
        .await
        .unwrap();

    let report = engine
        .settle(SettleScope::Direct { a: alice, b: bob })
        .await
        .unwrap();
    assert!(report.is_complete());
    // Two independent transfers, not one netted 20.00 payment.
    assert_eq!(report.applied.len(), 2);

    let for_x = report
        .applied
        .iter()
        .find(|tx| tx.expense_id == Some(x.expense.id))
        .unwrap();
    assert_eq!(for_x.payer_id, bob);
    assert_eq!(for_x.receiver_id, alice);
    assert_eq!(for_x.amount, Money::new(30_00));

    let for_y = report
        .applied
        .iter()
        .find(|tx| tx.expense_id == Some(y.expense.id))
        .unwrap();
    assert_eq!(for_y.payer_id, alice);
    assert_eq!(for_y.receiver_id, bob);
    assert_eq!(for_y.amount, Money::new(10_00));

    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::ZERO
    );
}

#[tokio::test]
async fn group_settlement_leaves_direct_scope_alone() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

    engine
        .new_expense(equal_expense(90_00, alice, vec![alice, bob, carol], Some("trip")))
        .await
        .unwrap();
    engine
        .new_direct_payment(bob, alice, Money::new(5_00), None, Utc::now())
        .await
        .unwrap();

    let report = engine
        .settle(SettleScope::Group("trip".to_string()))
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.applied.len(), 2);

    assert_eq!(
        engine
            .balance_between(alice, bob, Some("trip"))
            .await
            .unwrap(),
        Money::ZERO
    );
    // The direct IOU is untouched.
    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::new(5_00)
    );
}

#[tokio::test]
async fn preview_is_deterministic_and_matches_applied_transfers() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

    engine
        .new_expense(equal_expense(100_00, alice, vec![alice, bob, carol], None))
        .await
        .unwrap();

    let scope = SettleScope::Direct { a: alice, b: bob };
    let first = engine.settlement_preview(scope.clone()).await.unwrap();
    let second = engine.settlement_preview(scope.clone()).await.unwrap();
    assert_eq!(first, second);

    let report = engine.settle(scope).await.unwrap();
    assert_eq!(report.applied.len(), first.len());
    for (transfer, applied) in first.iter().zip(&report.applied) {
        assert_eq!(transfer.payer_id, applied.payer_id);
        assert_eq!(transfer.receiver_id, applied.receiver_id);
        assert_eq!(transfer.amount, applied.amount);
        assert_eq!(transfer.expense_id, applied.expense_id);
    }

    // Nothing left to settle for the pair.
    let drained = engine
        .settlement_preview(SettleScope::Direct { a: alice, b: bob })
        .await
        .unwrap();
    assert!(drained.is_empty());
}

#[tokio::test]
async fn settled_flag_flips_after_full_settlement() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

    engine
        .new_expense(equal_expense(100_00, alice, vec![alice, bob, carol], None))
        .await
        .unwrap();

    let groups = engine
        .grouped_transactions(&TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].settled, Some(false));

    engine
        .settle(SettleScope::Direct { a: alice, b: bob })
        .await
        .unwrap();
    let groups = engine
        .grouped_transactions(&TransactionListFilter::default())
        .await
        .unwrap();
    // Carol still owes her share.
    assert_eq!(groups[0].settled, Some(false));

    engine
        .settle(SettleScope::Direct { a: alice, b: carol })
        .await
        .unwrap();
    let groups = engine
        .grouped_transactions(&TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(groups[0].settled, Some(true));
    // Settle rows are listed before the expense rows.
    assert_eq!(groups[0].transactions[0].kind, TransactionKind::Settle);
}

#[tokio::test]
async fn direct_payments_reconcile_as_separate_groups() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    engine
        .new_direct_payment(alice, bob, Money::new(10_00), None, Utc::now())
        .await
        .unwrap();
    engine
        .new_direct_payment(alice, bob, Money::new(10_00), None, Utc::now())
        .await
        .unwrap();

    let groups = engine
        .grouped_transactions(&TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.expense.is_none()));
    assert!(groups.iter().all(|g| g.transactions.len() == 1));
}

#[tokio::test]
async fn list_transactions_pages_newest_first() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    for _ in 0..5 {
        engine
            .new_direct_payment(alice, bob, Money::new(1_00), None, Utc::now())
            .await
            .unwrap();
    }

    let filter = TransactionListFilter::default();
    let (first_page, cursor) = engine.list_transactions(&filter, 3, None).await.unwrap();
    assert_eq!(first_page.len(), 3);
    let cursor = cursor.expect("more pages expected");

    let (second_page, cursor) = engine
        .list_transactions(&filter, 3, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(second_page.len(), 2);
    assert!(cursor.is_none());

    let mut seen: Vec<Uuid> = first_page.iter().chain(&second_page).map(|tx| tx.id).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn settling_twice_is_a_no_op() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    engine
        .new_expense(equal_expense(30_00, alice, vec![alice, bob], None))
        .await
        .unwrap();

    let first = engine
        .settle(SettleScope::Direct { a: alice, b: bob })
        .await
        .unwrap();
    assert_eq!(first.applied.len(), 1);

    let second = engine
        .settle(SettleScope::Direct { a: alice, b: bob })
        .await
        .unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::ZERO
    );
}
