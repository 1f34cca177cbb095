use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashMap;
use uuid::Uuid;

use engine::{
    AlertStatus, AlertType, Currency, Engine, EngineError, ExpenseCategory, MonitorConfig,
    RateTable,
    commands::{AddExpenseCmd, CreateTripCmd, UpdateTripCmd},
};
use migration::MigratorTrait;

async fn db_with_users(users: &[&str]) -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in users {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![(*user).into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    db
}

async fn engine_with_alice() -> Engine {
    let db = db_with_users(&["alice"]).await;
    Engine::builder().database(db).build().await.unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn trip_with_budget(engine: &Engine, budget_minor: i64) -> Uuid {
    engine
        .create_trip(
            CreateTripCmd::new(
                "Japan 2026",
                "Tokyo",
                date("2026-04-01"),
                date("2026-04-10"),
                "alice",
            )
            .budget(budget_minor, Currency::Usd),
        )
        .await
        .unwrap()
}

fn expense_cmd(trip_id: Uuid, day: i32, amount_minor: i64) -> AddExpenseCmd {
    AddExpenseCmd::new(
        trip_id,
        "alice",
        day,
        date("2026-04-01"),
        ExpenseCategory::Food,
        amount_minor,
        Currency::Usd,
    )
}

#[tokio::test]
async fn crossing_warning_threshold_triggers_alert() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    // 50% of budget: no alert yet.
    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 50_000), now)
        .await
        .unwrap();
    assert!(alerts.is_empty());

    // 85%: warning fires once, with the spend snapshot.
    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 2, 35_000), now)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::BudgetWarning);
    assert_eq!(alerts[0].current_amount_minor, 85_000);
    assert_eq!(alerts[0].budget_amount_minor, 100_000);
    assert!(!alerts[0].is_urgent());
}

#[tokio::test]
async fn exceeding_budget_triggers_urgent_alert() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 110_000), now)
        .await
        .unwrap();
    // Both the warning and the exceeded alert fire on the same crossing.
    let types: Vec<AlertType> = alerts.iter().map(|a| a.alert_type).collect();
    assert!(types.contains(&AlertType::BudgetWarning));
    assert!(types.contains(&AlertType::BudgetExceeded));
    let exceeded = alerts
        .iter()
        .find(|a| a.alert_type == AlertType::BudgetExceeded)
        .unwrap();
    assert!(exceeded.is_urgent());
    assert!(exceeded.is_over_budget());
    assert_eq!(exceeded.remaining_minor(), -10_000);
}

#[tokio::test]
async fn evaluation_is_idempotent_across_calls() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 85_000), now)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);

    // Re-running the monitor with unchanged spend adds nothing.
    assert!(engine.evaluate_budget(trip_id, "alice", now).await.unwrap().is_empty());
    assert!(engine.evaluate_budget(trip_id, "alice", now).await.unwrap().is_empty());
    let stored = engine.list_alerts(trip_id, "alice", true, now).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn removing_expense_resolves_alert() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let (expense, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 85_000), now)
        .await
        .unwrap();
    let alert_id = alerts[0].id;

    engine
        .remove_expense(trip_id, expense.id, "alice", now)
        .await
        .unwrap();

    let stored = engine.list_alerts(trip_id, "alice", true, now).await.unwrap();
    let alert = stored.iter().find(|a| a.id == alert_id).unwrap();
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert!(alert.resolved_at.is_some());
}

#[tokio::test]
async fn raising_budget_resolves_stale_warning() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    engine
        .add_expense(expense_cmd(trip_id, 1, 85_000), now)
        .await
        .unwrap();

    engine
        .update_trip(
            UpdateTripCmd::new(trip_id, "alice").budget_minor(500_000),
            now,
        )
        .await
        .unwrap();

    let open = engine.list_alerts(trip_id, "alice", false, now).await.unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn dismissed_alert_blocks_same_event_only() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 85_000), now)
        .await
        .unwrap();
    engine
        .dismiss_alert(trip_id, alerts[0].id, "alice", now)
        .await
        .unwrap();

    // Same spend totals: stays silent.
    assert!(engine.evaluate_budget(trip_id, "alice", now).await.unwrap().is_empty());

    // Spend moves: a fresh warning fires.
    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 2, 5_000), now)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::BudgetWarning);
    assert_eq!(alerts[0].current_amount_minor, 90_000);
}

#[tokio::test]
async fn acknowledged_alert_blocks_retrigger() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 85_000), now)
        .await
        .unwrap();
    let acked = engine
        .acknowledge_alert(trip_id, alerts[0].id, "alice", now)
        .await
        .unwrap();
    assert_eq!(acked.status, AlertStatus::Acknowledged);

    assert!(engine.evaluate_budget(trip_id, "alice", now).await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_budget_never_alerts() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 0).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 50_000), now)
        .await
        .unwrap();
    assert!(alerts.is_empty());

    let summary = engine.budget_summary(trip_id, "alice", now).await.unwrap();
    assert_eq!(summary.usage_percentage, 0.0);
    assert_eq!(summary.remaining_minor, -50_000);
}

#[tokio::test]
async fn mixed_currency_expenses_normalize_into_trip_currency() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 500_000).await;

    engine
        .add_expense(expense_cmd(trip_id, 1, 10_000), now)
        .await
        .unwrap();
    let mut eur = expense_cmd(trip_id, 2, 10_000);
    eur.currency = Currency::Eur;
    engine.add_expense(eur, now).await.unwrap();

    let summary = engine.budget_summary(trip_id, "alice", now).await.unwrap();
    // 100.00 USD + 100.00 EUR (-> 117.65 USD) = 217.65 USD
    assert_eq!(summary.total_spent_minor, 21_765);
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.by_day[&1], 10_000);
    assert_eq!(summary.by_day[&2], 11_765);
}

#[tokio::test]
async fn unknown_currency_rejected_at_add() {
    let db = db_with_users(&["alice"]).await;
    let rates = RateTable::from_rates([(Currency::Usd, 1.0)]).unwrap();
    let engine = Engine::builder()
        .database(db)
        .rates(rates)
        .build()
        .await
        .unwrap();
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let mut cmd = expense_cmd(trip_id, 1, 10_000);
    cmd.currency = Currency::Eur;
    let err = engine.add_expense(cmd, now).await.unwrap_err();
    assert_eq!(err, EngineError::UnknownCurrency("EUR".to_string()));
}

#[tokio::test]
async fn stored_expense_without_rate_is_reported_as_skipped() {
    let db = db_with_users(&["alice"]).await;
    let rates = RateTable::from_rates([(Currency::Usd, 1.0)]).unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .rates(rates)
        .build()
        .await
        .unwrap();
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    engine
        .add_expense(expense_cmd(trip_id, 1, 10_000), now)
        .await
        .unwrap();

    // An expense recorded before the rate table shrank.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO expenses (id, trip_id, day_number, expense_date, category, description, \
         amount_minor, currency, reimbursable, reimbursed, status) \
         VALUES (?, ?, 2, '2026-04-02', 'food', '', 5000, 'EUR', 0, 0, 'paid')",
        vec![Uuid::new_v4().to_string().into(), trip_id.to_string().into()],
    ))
    .await
    .unwrap();

    let summary = engine.budget_summary(trip_id, "alice", now).await.unwrap();
    assert_eq!(summary.total_spent_minor, 10_000);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].currency, Currency::Eur);
}

#[tokio::test]
async fn daily_and_category_limits_fire_when_configured() {
    let db = db_with_users(&["alice"]).await;
    let config = MonitorConfig {
        daily_limit_minor: Some(20_000),
        category_limits: HashMap::from([(ExpenseCategory::Shopping, 15_000)]),
        ..Default::default()
    };
    let engine = Engine::builder()
        .database(db)
        .monitor(config)
        .build()
        .await
        .unwrap();
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 10_000_000).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 3, 25_000), now)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::DailySpendingLimit);
    assert!(alerts[0].message.contains("Day 3"));

    let mut shopping = expense_cmd(trip_id, 1, 16_000);
    shopping.category = ExpenseCategory::Shopping;
    let (_, alerts) = engine.add_expense(shopping, now).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::CategoryLimit);
    assert!(alerts[0].message.contains("shopping"));
}

#[tokio::test]
async fn resolve_then_dismiss_is_invalid_transition() {
    let engine = engine_with_alice().await;
    let now = Utc::now();
    let trip_id = trip_with_budget(&engine, 100_000).await;

    let (_, alerts) = engine
        .add_expense(expense_cmd(trip_id, 1, 85_000), now)
        .await
        .unwrap();
    let alert_id = alerts[0].id;
    engine
        .resolve_alert(trip_id, alert_id, "alice", now)
        .await
        .unwrap();
    let err = engine
        .dismiss_alert(trip_id, alert_id, "alice", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}
