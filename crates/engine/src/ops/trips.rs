use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    BudgetSnapshot, Currency, EngineError, ExpenseLedger, ResultEngine, SkippedExpense,
    commands::{CreateTripCmd, UpdateTripCmd},
    expenses::{self, Expense, ExpenseCategory},
    trip_shares::{self, ShareStatus},
    trips::{self, Trip, validate_budget, validate_dates},
    util::normalize_required_text,
};

use super::{Engine, with_tx};

/// A trip's budget position, with every total converted into the trip
/// currency.
#[derive(Clone, Debug, PartialEq)]
pub struct BudgetSummary {
    pub trip_id: Uuid,
    pub currency: Currency,
    pub budget_minor: i64,
    pub total_spent_minor: i64,
    pub remaining_minor: i64,
    pub usage_percentage: f64,
    pub by_category: BTreeMap<ExpenseCategory, i64>,
    pub by_day: BTreeMap<i32, i64>,
    /// Expenses left out because their currency had no rate.
    pub skipped: Vec<SkippedExpense>,
}

impl Engine {
    /// Create a trip owned by `cmd.user_id` and return its id.
    pub async fn create_trip(&self, cmd: CreateTripCmd) -> ResultEngine<Uuid> {
        let title = normalize_required_text(&cmd.title, "title")?;
        let destination = normalize_required_text(&cmd.destination, "destination")?;
        if !self.converter.is_supported(cmd.currency) {
            return Err(EngineError::UnknownCurrency(cmd.currency.code().to_string()));
        }
        let trip = Trip::new(
            title,
            destination,
            cmd.start_date,
            cmd.end_date,
            cmd.budget_minor,
            cmd.currency,
            &cmd.user_id,
        )?;
        let trip_id = trip.id;
        let model: trips::ActiveModel = (&trip).into();
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, &cmd.user_id).await?;
            model.insert(&db_tx).await?;
            tracing::info!(trip_id = %trip_id, user_id = %cmd.user_id, "trip created");
            Ok(trip_id)
        })
    }

    /// Update trip settings; owner or admin share required.
    ///
    /// Budget and currency changes re-evaluate alerts in the same
    /// transaction, so a raised budget resolves a stale warning immediately.
    pub async fn update_trip(
        &self,
        cmd: UpdateTripCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<Trip> {
        with_tx!(self, |db_tx| {
            let mut trip = self
                .require_trip_admin(&db_tx, cmd.trip_id, &cmd.user_id, now)
                .await?;
            let expected_version = trip.version;

            if let Some(title) = cmd.title.as_deref() {
                trip.title = normalize_required_text(title, "title")?;
            }
            if let Some(destination) = cmd.destination.as_deref() {
                trip.destination = normalize_required_text(destination, "destination")?;
            }
            if let Some(start_date) = cmd.start_date {
                trip.start_date = start_date;
            }
            if let Some(end_date) = cmd.end_date {
                trip.end_date = end_date;
            }
            validate_dates(trip.start_date, trip.end_date)?;
            if let Some(budget_minor) = cmd.budget_minor {
                validate_budget(budget_minor)?;
                trip.budget_minor = budget_minor;
            }
            if let Some(currency) = cmd.currency {
                if !self.converter.is_supported(currency) {
                    return Err(EngineError::UnknownCurrency(currency.code().to_string()));
                }
                trip.currency = currency;
            }
            if let Some(status) = cmd.status {
                trip.status = status;
            }
            if let Some(visibility) = cmd.visibility {
                trip.visibility = visibility;
            }
            trip.version = expected_version + 1;

            let rows = trips::Entity::update_many()
                .col_expr(trips::Column::Title, Expr::value(trip.title.clone()))
                .col_expr(
                    trips::Column::Destination,
                    Expr::value(trip.destination.clone()),
                )
                .col_expr(trips::Column::StartDate, Expr::value(trip.start_date))
                .col_expr(trips::Column::EndDate, Expr::value(trip.end_date))
                .col_expr(trips::Column::BudgetMinor, Expr::value(trip.budget_minor))
                .col_expr(
                    trips::Column::Currency,
                    Expr::value(trip.currency.code().to_string()),
                )
                .col_expr(
                    trips::Column::Status,
                    Expr::value(trip.status.as_str().to_string()),
                )
                .col_expr(
                    trips::Column::Visibility,
                    Expr::value(trip.visibility.as_str().to_string()),
                )
                .col_expr(trips::Column::Version, Expr::value(trip.version))
                .filter(trips::Column::Id.eq(trip.id.to_string()))
                .filter(trips::Column::Version.eq(expected_version))
                .exec(&db_tx)
                .await?
                .rows_affected;
            if rows == 0 {
                return Err(EngineError::ConcurrentModification(
                    "trip was modified concurrently".to_string(),
                ));
            }

            self.evaluate_in_tx(&db_tx, &trip, now).await?;
            tracing::info!(trip_id = %trip.id, user_id = %cmd.user_id, "trip updated");
            Ok(trip)
        })
    }

    /// Delete a trip and everything hanging off it; owner only.
    pub async fn delete_trip(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let trip = self
                .require_trip_owner(&db_tx, trip_id, user_id, now)
                .await?;

            // Explicit cascade within one DB transaction; FKs declare
            // ON DELETE CASCADE but sqlite only honors them with
            // foreign_keys=ON, so we don't rely on it.
            let backend = self.database.get_database_backend();
            let trip_db_id = trip.id.to_string();
            for table in ["expenses", "trip_shares", "budget_alerts"] {
                db_tx
                    .execute(Statement::from_sql_and_values(
                        backend,
                        format!("DELETE FROM {table} WHERE trip_id = ?;"),
                        vec![trip_db_id.clone().into()],
                    ))
                    .await?;
            }
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM trips WHERE id = ?;",
                    vec![trip_db_id.into()],
                ))
                .await?;
            tracing::info!(trip_id = %trip_id, user_id = %user_id, "trip deleted");
            Ok(())
        })
    }

    /// A single trip, if the caller may read it.
    pub async fn trip(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Trip> {
        with_tx!(self, |db_tx| {
            self.require_trip_read(&db_tx, trip_id, user_id, now).await
        })
    }

    /// Trips the user owns plus trips shared with them through an accepted,
    /// non-expired share.
    pub async fn list_trips(&self, user_id: &str, now: DateTime<Utc>) -> ResultEngine<Vec<Trip>> {
        with_tx!(self, |db_tx| {
            let owned = trips::Entity::find()
                .filter(trips::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(trips::Column::StartDate)
                .all(&db_tx)
                .await?;

            let shares = trip_shares::Entity::find()
                .filter(trip_shares::Column::SharedWith.eq(user_id.to_string()))
                .filter(trip_shares::Column::Status.eq(ShareStatus::Accepted.as_str()))
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(owned.len());
            for model in owned {
                out.push(Trip::try_from(model)?);
            }
            for share_model in shares {
                let share = trip_shares::TripShare::try_from(share_model)?;
                if share.is_expired(now) {
                    continue;
                }
                let model = trips::Entity::find_by_id(share.trip_id.to_string())
                    .one(&db_tx)
                    .await?;
                if let Some(model) = model {
                    out.push(Trip::try_from(model)?);
                }
            }
            Ok(out)
        })
    }

    /// Budget position for one trip.
    pub async fn budget_summary(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<BudgetSummary> {
        with_tx!(self, |db_tx| {
            let trip = self.require_trip_read(&db_tx, trip_id, user_id, now).await?;
            let expenses = self.load_expenses(&db_tx, trip_id).await?;
            let (snapshot, skipped) = self.snapshot_for(&trip, &expenses);
            Ok(BudgetSummary {
                trip_id: trip.id,
                currency: trip.currency,
                budget_minor: snapshot.budget_minor,
                total_spent_minor: snapshot.total_spent_minor,
                remaining_minor: snapshot.remaining_minor(),
                usage_percentage: snapshot.usage_percentage(),
                by_category: snapshot.by_category,
                by_day: snapshot.by_day,
                skipped,
            })
        })
    }

    pub(super) async fn load_expenses(
        &self,
        db: &DatabaseTransaction,
        trip_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::TripId.eq(trip_id.to_string()))
            .order_by_asc(expenses::Column::ExpenseDate)
            .all(db)
            .await?;
        models.into_iter().map(Expense::try_from).collect()
    }

    /// Build the monitor snapshot for a trip from its loaded expenses.
    pub(super) fn snapshot_for(
        &self,
        trip: &Trip,
        expenses: &[Expense],
    ) -> (BudgetSnapshot, Vec<SkippedExpense>) {
        let ledger = ExpenseLedger::new(&self.converter);
        let total = ledger.total_in(expenses, trip.currency);
        let by_category = ledger
            .total_by_category(expenses, trip.currency)
            .into_iter()
            .map(|(category, t)| (category, t.total_minor))
            .collect();
        let by_day = ledger
            .total_by_day(expenses, trip.currency)
            .into_iter()
            .map(|(day, t)| (day, t.total_minor))
            .collect();
        (
            BudgetSnapshot {
                trip_id: trip.id,
                currency: trip.currency,
                budget_minor: trip.budget_minor,
                total_spent_minor: total.total_minor,
                by_category,
                by_day,
            },
            total.skipped,
        )
    }
}
