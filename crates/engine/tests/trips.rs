use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Currency, Engine, EngineError, ExpenseCategory, ExpenseListFilter, ExpenseStatus,
    SharePermission, TripStatus, TripVisibility,
    commands::{AddExpenseCmd, CreateTripCmd, InviteShareCmd, UpdateExpenseCmd, UpdateTripCmd},
};
use migration::MigratorTrait;

async fn setup(users: &[&str]) -> (Engine, DatabaseConnection) {
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
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn trip_cmd() -> CreateTripCmd {
    CreateTripCmd::new(
        "Japan 2026",
        "Tokyo",
        date("2026-04-01"),
        date("2026-04-10"),
        "alice",
    )
    .budget(500_000, Currency::Usd)
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
async fn create_and_fetch_trip() {
    let (engine, _db) = setup(&["alice"]).await;
    let now = Utc::now();

    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();
    let trip = engine.trip(trip_id, "alice", now).await.unwrap();
    assert_eq!(trip.title, "Japan 2026");
    assert_eq!(trip.status, TripStatus::Planning);
    assert_eq!(trip.visibility, TripVisibility::Private);
    assert_eq!(trip.budget_minor, 500_000);
    assert_eq!(trip.version, 0);
}

#[tokio::test]
async fn create_trip_validations() {
    let (engine, _db) = setup(&["alice"]).await;

    let mut inverted = trip_cmd();
    inverted.start_date = date("2026-04-10");
    inverted.end_date = date("2026-04-01");
    assert!(matches!(
        engine.create_trip(inverted).await.unwrap_err(),
        EngineError::Validation(_)
    ));

    let mut blank = trip_cmd();
    blank.title = "   ".to_string();
    assert!(matches!(
        engine.create_trip(blank).await.unwrap_err(),
        EngineError::Validation(_)
    ));

    let mut negative = trip_cmd();
    negative.budget_minor = -1;
    assert!(matches!(
        engine.create_trip(negative).await.unwrap_err(),
        EngineError::Validation(_)
    ));

    let mut unknown_user = trip_cmd();
    unknown_user.user_id = "nobody".to_string();
    assert!(matches!(
        engine.create_trip(unknown_user).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn update_trip_bumps_version() {
    let (engine, _db) = setup(&["alice"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    let updated = engine
        .update_trip(
            UpdateTripCmd::new(trip_id, "alice")
                .title("Japan, spring")
                .status(TripStatus::Active),
            now,
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Japan, spring");
    assert_eq!(updated.status, TripStatus::Active);
    assert_eq!(updated.version, 1);

    let fetched = engine.trip(trip_id, "alice", now).await.unwrap();
    assert_eq!(fetched.version, 1);
}

#[tokio::test]
async fn delete_trip_cascades() {
    let (engine, db) = setup(&["alice", "bob"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    // One of everything hanging off the trip.
    engine
        .add_expense(expense_cmd(trip_id, 1, 450_000), now)
        .await
        .unwrap();
    engine
        .invite_share(
            InviteShareCmd::new(trip_id, "alice", "bob", SharePermission::View),
            now,
        )
        .await
        .unwrap();
    assert!(!engine.list_alerts(trip_id, "alice", true, now).await.unwrap().is_empty());

    engine.delete_trip(trip_id, "alice", now).await.unwrap();
    assert!(matches!(
        engine.trip(trip_id, "alice", now).await.unwrap_err(),
        EngineError::NotFound(_)
    ));

    let backend = db.get_database_backend();
    for table in ["expenses", "trip_shares", "budget_alerts"] {
        let row = db
            .query_one(Statement::from_sql_and_values(
                backend,
                format!("SELECT COUNT(*) AS n FROM {table} WHERE trip_id = ?"),
                vec![trip_id.to_string().into()],
            ))
            .await
            .unwrap()
            .unwrap();
        let n: i64 = row.try_get("", "n").unwrap();
        assert_eq!(n, 0, "{table} rows should be gone");
    }
}

#[tokio::test]
async fn list_trips_includes_shared() {
    let (engine, _db) = setup(&["alice", "bob"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    assert!(engine.list_trips("bob", now).await.unwrap().is_empty());

    let share = engine
        .invite_share(
            InviteShareCmd::new(trip_id, "alice", "bob", SharePermission::View),
            now,
        )
        .await
        .unwrap();
    // Pending does not surface the trip.
    assert!(engine.list_trips("bob", now).await.unwrap().is_empty());

    engine.respond_share(share.id, "bob", true, now).await.unwrap();
    let trips = engine.list_trips("bob", now).await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].id, trip_id);

    // Owner keeps seeing their own trips.
    assert_eq!(engine.list_trips("alice", now).await.unwrap().len(), 1);
}

#[tokio::test]
async fn expense_crud_and_filters() {
    let (engine, _db) = setup(&["alice"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    let (food, _) = engine
        .add_expense(
            expense_cmd(trip_id, 1, 3_000).description(" Lunch  "),
            now,
        )
        .await
        .unwrap();
    assert_eq!(food.description, "Lunch");

    let mut transport = expense_cmd(trip_id, 2, 7_000);
    transport.category = ExpenseCategory::Transport;
    transport.expense_date = date("2026-04-02");
    engine.add_expense(transport, now).await.unwrap();

    let all = engine
        .list_expenses(trip_id, "alice", &ExpenseListFilter::default(), now)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let only_food = engine
        .list_expenses(
            trip_id,
            "alice",
            &ExpenseListFilter {
                categories: Some(vec![ExpenseCategory::Food]),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(only_food.len(), 1);
    assert_eq!(only_food[0].id, food.id);

    // Cancelling drops the expense from spend totals but keeps the row.
    engine
        .update_expense(
            UpdateExpenseCmd::new(trip_id, food.id, "alice").status(ExpenseStatus::Cancelled),
            now,
        )
        .await
        .unwrap();
    let summary = engine.budget_summary(trip_id, "alice", now).await.unwrap();
    assert_eq!(summary.total_spent_minor, 7_000);
    let all = engine
        .list_expenses(trip_id, "alice", &ExpenseListFilter::default(), now)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn expense_validations() {
    let (engine, _db) = setup(&["alice"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    // Day outside the 10-day trip.
    let err = engine
        .add_expense(expense_cmd(trip_id, 11, 1_000), now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .add_expense(expense_cmd(trip_id, 1, 0), now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Reimbursed requires reimbursable.
    let (expense, _) = engine
        .add_expense(expense_cmd(trip_id, 1, 1_000), now)
        .await
        .unwrap();
    let err = engine
        .update_expense(
            UpdateExpenseCmd::new(trip_id, expense.id, "alice").reimbursed(true),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Unknown expense id.
    let err = engine
        .update_expense(
            UpdateExpenseCmd::new(trip_id, Uuid::new_v4(), "alice").amount(5_000, Currency::Usd),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn public_trip_is_readable_but_not_editable() {
    let (engine, _db) = setup(&["alice", "bob"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    assert!(matches!(
        engine.trip(trip_id, "bob", now).await.unwrap_err(),
        EngineError::NotFound(_)
    ));

    engine
        .update_trip(
            UpdateTripCmd::new(trip_id, "alice").visibility(TripVisibility::Public),
            now,
        )
        .await
        .unwrap();

    engine.trip(trip_id, "bob", now).await.unwrap();
    let err = engine
        .add_expense(
            AddExpenseCmd::new(
                trip_id,
                "bob",
                1,
                date("2026-04-01"),
                ExpenseCategory::Food,
                1_000,
                Currency::Usd,
            ),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test]
async fn update_reads_current_version_inside_transaction() {
    let (engine, db) = setup(&["alice"]).await;
    let now = Utc::now();
    let trip_id = engine.create_trip(trip_cmd()).await.unwrap();

    // Another writer bumps the version between read and write.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE trips SET version = version + 1 WHERE id = ?",
        vec![trip_id.to_string().into()],
    ))
    .await
    .unwrap();

    // The engine reads the row fresh inside its own transaction, so this
    // update succeeds against the new version.
    let updated = engine
        .update_trip(UpdateTripCmd::new(trip_id, "alice").title("Renamed"), now)
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
}
