use chrono::Utc;
use sea_orm::Database;

use engine::{
    Engine, EngineError, ExpenseShare, Money, NewExpense, SplitInput, SplitStrategy,
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

fn equal_expense(amount_minor: i64, payer: Uuid, splitters: Vec<Uuid>) -> NewExpense {
    NewExpense {
        description: "Dinner".to_string(),
        amount: Money::new(amount_minor),
        occurred_at: Utc::now(),
        category: Some("food".to_string()),
        created_by: payer,
        group_id: None,
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
async fn equal_split_updates_pairwise_balances() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

    let saved = engine
        .new_expense(equal_expense(100_00, alice, vec![alice, bob, carol]))
        .await
        .unwrap();

    // First splitter absorbs the extra cent.
    let shares: Vec<i64> = saved
        .expense
        .splitters
        .iter()
        .map(|s| s.amount.cents())
        .collect();
    assert_eq!(shares, vec![33_34, 33_33, 33_33]);

    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::new(33_33)
    );
    assert_eq!(
        engine.balance_between(bob, alice, None).await.unwrap(),
        Money::new(-33_33)
    );
    assert_eq!(
        engine.balance_between(alice, carol, None).await.unwrap(),
        Money::new(33_33)
    );
    engine.verify_ledger().await.unwrap();
}

#[tokio::test]
async fn update_reverses_prior_ledger_effect() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

    let saved = engine
        .new_expense(equal_expense(90_00, alice, vec![alice, bob, carol]))
        .await
        .unwrap();

    // Shrink the expense and drop carol; no residue of the old split may
    // survive.
    engine
        .update_expense(saved.expense.id, equal_expense(40_00, alice, vec![alice, bob]))
        .await
        .unwrap();

    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::new(20_00)
    );
    assert_eq!(
        engine.balance_between(alice, carol, None).await.unwrap(),
        Money::ZERO
    );
    engine.verify_ledger().await.unwrap();

    let expense = engine.expense(saved.expense.id).await.unwrap();
    assert_eq!(expense.amount, Money::new(40_00));
    assert_eq!(expense.splitters.len(), 2);
}

#[tokio::test]
async fn delete_restores_zero_balances() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    let saved = engine
        .new_expense(equal_expense(50_00, alice, vec![alice, bob]))
        .await
        .unwrap();
    engine.delete_expense(saved.expense.id).await.unwrap();

    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::ZERO
    );
    assert_eq!(
        engine.expense(saved.expense.id).await.unwrap_err(),
        EngineError::KeyNotFound("expense not exists".to_string())
    );
}

#[tokio::test]
async fn percentage_gap_is_surfaced_but_not_fatal() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    let mut cmd = equal_expense(100_00, alice, vec![alice, bob]);
    cmd.strategy = SplitStrategy::Percentage;
    cmd.inputs = vec![
        SplitInput {
            participant_id: alice,
            raw_value: 60.0,
        },
        SplitInput {
            participant_id: bob,
            raw_value: 30.0,
        },
    ];

    let saved = engine.new_expense(cmd).await.unwrap();
    assert_eq!(saved.percent_gap, Some(10.0));
    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::new(30_00)
    );
}

#[tokio::test]
async fn multi_payer_obligations_prorate_by_paid_amount() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol", "dave"]).await;
    let (alice, bob, carol, dave) = (ids[0], ids[1], ids[2], ids[3]);

    let cmd = NewExpense {
        description: "Hotel".to_string(),
        amount: Money::new(100_00),
        occurred_at: Utc::now(),
        category: None,
        created_by: alice,
        group_id: None,
        payers: vec![
            ExpenseShare {
                participant_id: alice,
                amount: Money::new(70_00),
            },
            ExpenseShare {
                participant_id: bob,
                amount: Money::new(30_00),
            },
        ],
        splitters: vec![carol, dave],
        strategy: SplitStrategy::Equal,
        inputs: Vec::new(),
    };
    engine.new_expense(cmd).await.unwrap();

    // Each splitter owes 50.00, split 70/30 across the two payers.
    assert_eq!(
        engine.balance_between(alice, carol, None).await.unwrap(),
        Money::new(35_00)
    );
    assert_eq!(
        engine.balance_between(bob, carol, None).await.unwrap(),
        Money::new(15_00)
    );
    assert_eq!(
        engine.balance_between(alice, dave, None).await.unwrap(),
        Money::new(35_00)
    );
    engine.verify_ledger().await.unwrap();
}

#[tokio::test]
async fn group_expense_does_not_touch_direct_balances() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    let mut cmd = equal_expense(40_00, alice, vec![alice, bob]);
    cmd.group_id = Some("trip".to_string());
    engine.new_expense(cmd).await.unwrap();

    assert_eq!(
        engine.balance_between(alice, bob, None).await.unwrap(),
        Money::ZERO
    );
    assert_eq!(
        engine
            .balance_between(alice, bob, Some("trip"))
            .await
            .unwrap(),
        Money::new(20_00)
    );
}

#[tokio::test]
async fn payer_sum_mismatch_is_rejected() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);

    let mut cmd = equal_expense(100_00, alice, vec![alice, bob]);
    cmd.payers[0].amount = Money::new(90_00);

    assert!(matches!(
        engine.new_expense(cmd).await.unwrap_err(),
        EngineError::InvalidAmount(_)
    ));
}

#[tokio::test]
async fn unknown_participant_is_rejected_before_persistence() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice"]).await;
    let alice = ids[0];

    let cmd = equal_expense(10_00, alice, vec![alice, Uuid::new_v4()]);
    assert!(matches!(
        engine.new_expense(cmd).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));

    let (transactions, _) = engine
        .list_transactions(&Default::default(), 10, None)
        .await
        .unwrap();
    assert!(transactions.is_empty());
}

#[tokio::test]
async fn recompute_matches_incremental_balances() {
    let engine = engine_with_db().await;
    let ids = participants(&engine, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

    engine
        .new_expense(equal_expense(100_00, alice, vec![alice, bob, carol]))
        .await
        .unwrap();
    engine
        .new_direct_payment(bob, carol, Money::new(12_00), None, Utc::now())
        .await
        .unwrap();

    let before = engine.balances_for(alice).await.unwrap();
    engine.recompute_balances().await.unwrap();
    let after = engine.balances_for(alice).await.unwrap();

    assert_eq!(before, after);
    engine.verify_ledger().await.unwrap();
}

#[tokio::test]
async fn duplicate_participant_name_is_rejected() {
    let engine = engine_with_db().await;
    engine.new_participant("Alice", None).await.unwrap();

    assert!(matches!(
        engine.new_participant("  alice ", None).await.unwrap_err(),
        EngineError::ExistingKey(_)
    ));
}
