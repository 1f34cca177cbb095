//! Budget monitoring.
//!
//! The monitor is a pure function from a spend snapshot plus the currently
//! stored alerts to a list of actions (trigger a new alert, resolve an old
//! one). Running it twice on the same inputs yields no further actions, so
//! the ops layer can re-evaluate after every expense mutation without
//! duplicating alerts.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Currency, Money, ResultEngine,
    budget_alerts::{AlertStatus, AlertType, BudgetAlert},
    expenses::ExpenseCategory,
};

/// `current / budget * 100`, or 0 when the budget is 0.
#[must_use]
pub(crate) fn usage_percentage(current_minor: i64, budget_minor: i64) -> f64 {
    if budget_minor == 0 {
        return 0.0;
    }
    (current_minor as f64) / (budget_minor as f64) * 100.0
}

/// Aggregated spend for one trip, already converted into the trip currency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetSnapshot {
    pub trip_id: Uuid,
    pub currency: Currency,
    pub budget_minor: i64,
    pub total_spent_minor: i64,
    pub by_category: BTreeMap<ExpenseCategory, i64>,
    pub by_day: BTreeMap<i32, i64>,
}

impl BudgetSnapshot {
    #[must_use]
    pub fn usage_percentage(&self) -> f64 {
        usage_percentage(self.total_spent_minor, self.budget_minor)
    }

    #[must_use]
    pub fn remaining_minor(&self) -> i64 {
        self.budget_minor - self.total_spent_minor
    }

    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.total_spent_minor > self.budget_minor
    }
}

/// Thresholds the monitor checks a snapshot against.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Usage percentage at which a warning fires.
    pub warning_threshold_pct: f64,
    /// Per-day spend cap in trip-currency minor units, if any.
    pub daily_limit_minor: Option<i64>,
    /// Per-category spend caps in trip-currency minor units.
    pub category_limits: HashMap<ExpenseCategory, i64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warning_threshold_pct: 80.0,
            daily_limit_minor: None,
            category_limits: HashMap::new(),
        }
    }
}

/// One storage action produced by an evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum AlertAction {
    Trigger(BudgetAlert),
    Resolve(Uuid),
}

/// The condition backing one alert type, if it currently holds.
///
/// `current`/`budget` become the alert's amount snapshots; identical
/// snapshots mean the same triggering event.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Condition {
    threshold_pct: f64,
    current_minor: i64,
    budget_minor: i64,
}

/// Evaluates a spend snapshot against stored alerts.
///
/// For each checked alert type:
/// * condition holds and no live (active/acknowledged) alert of that type
///   exists: trigger one, unless a dismissed alert of the type carries the
///   same amount snapshots (the user already dismissed this exact event);
/// * condition no longer holds: resolve any live alert of that type.
#[must_use]
pub fn evaluate(
    snapshot: &BudgetSnapshot,
    alerts: &[BudgetAlert],
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> Vec<AlertAction> {
    let checks = [
        (AlertType::BudgetWarning, warning_condition(snapshot, config)),
        (AlertType::BudgetExceeded, exceeded_condition(snapshot)),
        (
            AlertType::DailySpendingLimit,
            daily_condition(snapshot, config),
        ),
        (
            AlertType::CategoryLimit,
            category_condition(snapshot, config).map(|(_, c)| c),
        ),
    ];

    let mut actions = Vec::new();
    for (alert_type, condition) in checks {
        let live = alerts.iter().find(|a| {
            a.alert_type == alert_type
                && matches!(a.status, AlertStatus::Active | AlertStatus::Acknowledged)
        });
        match (condition, live) {
            (Some(condition), None) => {
                if !dismissed_same_event(alerts, alert_type, condition) {
                    // trigger() cannot fail here, thresholds are in range.
                    if let Ok(alert) = build_alert(snapshot, alert_type, condition, config, now) {
                        actions.push(AlertAction::Trigger(alert));
                    }
                }
            }
            (None, Some(live)) => actions.push(AlertAction::Resolve(live.id)),
            _ => {}
        }
    }
    actions
}

fn warning_condition(snapshot: &BudgetSnapshot, config: &MonitorConfig) -> Option<Condition> {
    if snapshot.budget_minor > 0
        && snapshot.usage_percentage() >= config.warning_threshold_pct
    {
        Some(Condition {
            threshold_pct: config.warning_threshold_pct,
            current_minor: snapshot.total_spent_minor,
            budget_minor: snapshot.budget_minor,
        })
    } else {
        None
    }
}

fn exceeded_condition(snapshot: &BudgetSnapshot) -> Option<Condition> {
    if snapshot.budget_minor > 0 && snapshot.is_over_budget() {
        Some(Condition {
            threshold_pct: 100.0,
            current_minor: snapshot.total_spent_minor,
            budget_minor: snapshot.budget_minor,
        })
    } else {
        None
    }
}

/// Worst offending day, if any day is over the configured cap.
fn daily_condition(snapshot: &BudgetSnapshot, config: &MonitorConfig) -> Option<Condition> {
    let limit = config.daily_limit_minor?;
    snapshot
        .by_day
        .values()
        .filter(|&&spent| spent > limit)
        .max()
        .map(|&spent| Condition {
            threshold_pct: 100.0,
            current_minor: spent,
            budget_minor: limit,
        })
}

/// First category over its configured cap, in category order.
fn category_condition(
    snapshot: &BudgetSnapshot,
    config: &MonitorConfig,
) -> Option<(ExpenseCategory, Condition)> {
    snapshot.by_category.iter().find_map(|(&category, &spent)| {
        let limit = *config.category_limits.get(&category)?;
        (spent > limit).then_some((
            category,
            Condition {
                threshold_pct: 100.0,
                current_minor: spent,
                budget_minor: limit,
            },
        ))
    })
}

fn dismissed_same_event(alerts: &[BudgetAlert], alert_type: AlertType, condition: Condition) -> bool {
    alerts.iter().any(|a| {
        a.alert_type == alert_type
            && a.status == AlertStatus::Dismissed
            && a.current_amount_minor == condition.current_minor
            && a.budget_amount_minor == condition.budget_minor
    })
}

fn build_alert(
    snapshot: &BudgetSnapshot,
    alert_type: AlertType,
    condition: Condition,
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> ResultEngine<BudgetAlert> {
    let message = message_for(snapshot, alert_type, condition, config);
    BudgetAlert::trigger(
        snapshot.trip_id,
        alert_type,
        condition.threshold_pct,
        condition.current_minor,
        condition.budget_minor,
        message,
        now,
    )
}

fn message_for(
    snapshot: &BudgetSnapshot,
    alert_type: AlertType,
    condition: Condition,
    config: &MonitorConfig,
) -> String {
    let currency = snapshot.currency;
    match alert_type {
        AlertType::DailySpendingLimit => {
            let day = snapshot
                .by_day
                .iter()
                .filter(|&(_, &spent)| spent == condition.current_minor)
                .map(|(&day, _)| day)
                .next()
                .unwrap_or(0);
            format!(
                "Day {day} spending {} is over the daily limit {}",
                Money::new(condition.current_minor).format_in(currency),
                Money::new(condition.budget_minor).format_in(currency),
            )
        }
        AlertType::CategoryLimit => {
            let category = category_condition(snapshot, config)
                .map(|(category, _)| category)
                .unwrap_or(ExpenseCategory::Other);
            format!(
                "Spending on {category} {} is over the category limit {}",
                Money::new(condition.current_minor).format_in(currency),
                Money::new(condition.budget_minor).format_in(currency),
            )
        }
        _ => BudgetAlert::default_message(
            alert_type,
            condition.current_minor,
            condition.budget_minor,
            currency,
        ),
    }
}
