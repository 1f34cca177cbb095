use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    budget_alerts::{self, BudgetAlert},
    monitor::{self, AlertAction},
    trips::Trip,
};

use super::{Engine, with_tx};

impl Engine {
    /// Re-evaluate a trip's budget against its stored alerts and return the
    /// newly triggered ones.
    ///
    /// Edit permission is required: evaluation writes alert rows.
    pub async fn evaluate_budget(
        &self,
        trip_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        with_tx!(self, |db_tx| {
            let trip = self
                .require_trip_write(&db_tx, trip_id, user_id, now)
                .await?;
            self.evaluate_in_tx(&db_tx, &trip, now).await
        })
    }

    /// Alerts for a trip, newest first. Resolved and dismissed alerts are
    /// included only when `include_closed` is set.
    pub async fn list_alerts(
        &self,
        trip_id: Uuid,
        user_id: &str,
        include_closed: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        with_tx!(self, |db_tx| {
            self.require_trip_read(&db_tx, trip_id, user_id, now).await?;
            let models = budget_alerts::Entity::find()
                .filter(budget_alerts::Column::TripId.eq(trip_id.to_string()))
                .order_by_desc(budget_alerts::Column::TriggeredAt)
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let alert = BudgetAlert::try_from(model)?;
                if include_closed || !alert.status.is_terminal() {
                    out.push(alert);
                }
            }
            Ok(out)
        })
    }

    /// Mark an alert as seen without closing it.
    pub async fn acknowledge_alert(
        &self,
        trip_id: Uuid,
        alert_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<BudgetAlert> {
        self.transition_alert(trip_id, alert_id, user_id, now, |alert| {
            alert.acknowledge(now)
        })
        .await
    }

    /// Close an alert by hand; the monitor also resolves alerts itself when
    /// their condition clears.
    pub async fn resolve_alert(
        &self,
        trip_id: Uuid,
        alert_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<BudgetAlert> {
        self.transition_alert(trip_id, alert_id, user_id, now, |alert| alert.resolve(now))
            .await
    }

    /// Dismiss an alert. The same triggering event (identical amount
    /// snapshots) will not re-fire; a changed spend total will.
    pub async fn dismiss_alert(
        &self,
        trip_id: Uuid,
        alert_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<BudgetAlert> {
        self.transition_alert(trip_id, alert_id, user_id, now, BudgetAlert::dismiss)
            .await
    }

    async fn transition_alert<F>(
        &self,
        trip_id: Uuid,
        alert_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
        apply: F,
    ) -> ResultEngine<BudgetAlert>
    where
        F: FnOnce(&mut BudgetAlert) -> ResultEngine<()>,
    {
        with_tx!(self, |db_tx| {
            self.require_trip_write(&db_tx, trip_id, user_id, now)
                .await?;
            let model = budget_alerts::Entity::find_by_id(alert_id.to_string())
                .filter(budget_alerts::Column::TripId.eq(trip_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("alert not exists".to_string()))?;
            let mut alert = BudgetAlert::try_from(model)?;
            let expected_version = alert.version;
            apply(&mut alert)?;
            alert.version = expected_version + 1;
            self.store_alert_transition(&db_tx, &alert, expected_version)
                .await?;
            tracing::info!(
                alert_id = %alert.id,
                status = alert.status.as_str(),
                user_id = %user_id,
                "alert transitioned"
            );
            Ok(alert)
        })
    }

    async fn store_alert_transition(
        &self,
        db: &DatabaseTransaction,
        alert: &BudgetAlert,
        expected_version: i32,
    ) -> ResultEngine<()> {
        let rows = budget_alerts::Entity::update_many()
            .col_expr(
                budget_alerts::Column::Status,
                Expr::value(alert.status.as_str().to_string()),
            )
            .col_expr(
                budget_alerts::Column::AcknowledgedAt,
                Expr::value(alert.acknowledged_at),
            )
            .col_expr(
                budget_alerts::Column::ResolvedAt,
                Expr::value(alert.resolved_at),
            )
            .col_expr(budget_alerts::Column::Version, Expr::value(alert.version))
            .filter(budget_alerts::Column::Id.eq(alert.id.to_string()))
            .filter(budget_alerts::Column::Version.eq(expected_version))
            .exec(db)
            .await?
            .rows_affected;
        if rows == 0 {
            return Err(EngineError::ConcurrentModification(
                "alert was modified concurrently".to_string(),
            ));
        }
        Ok(())
    }

    /// Run the monitor for `trip` inside the caller's transaction, persist
    /// the resulting actions, and return the newly triggered alerts.
    pub(super) async fn evaluate_in_tx(
        &self,
        db: &DatabaseTransaction,
        trip: &Trip,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        let expenses = self.load_expenses(db, trip.id).await?;
        let (snapshot, _skipped) = self.snapshot_for(trip, &expenses);

        let alert_models = budget_alerts::Entity::find()
            .filter(budget_alerts::Column::TripId.eq(trip.id.to_string()))
            .all(db)
            .await?;
        let mut stored = Vec::with_capacity(alert_models.len());
        for model in alert_models {
            stored.push(BudgetAlert::try_from(model)?);
        }

        let actions = monitor::evaluate(&snapshot, &stored, &self.monitor_config, now);
        let mut triggered = Vec::new();
        for action in actions {
            match action {
                AlertAction::Trigger(alert) => {
                    let model: budget_alerts::ActiveModel = (&alert).into();
                    model.insert(db).await?;
                    tracing::info!(
                        trip_id = %trip.id,
                        alert_type = alert.alert_type.as_str(),
                        "alert triggered"
                    );
                    triggered.push(alert);
                }
                AlertAction::Resolve(alert_id) => {
                    let Some(existing) = stored.iter().find(|a| a.id == alert_id) else {
                        continue;
                    };
                    let mut resolved = existing.clone();
                    let expected_version = resolved.version;
                    resolved.resolve(now)?;
                    resolved.version = expected_version + 1;
                    self.store_alert_transition(db, &resolved, expected_version)
                        .await?;
                    tracing::info!(
                        trip_id = %trip.id,
                        alert_id = %alert_id,
                        "alert auto-resolved"
                    );
                }
            }
        }
        Ok(triggered)
    }
}
