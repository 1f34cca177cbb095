//! Budget alert entity and its state machine.
//!
//! Alerts are created by the monitor (see `monitor`) and only ever mutated
//! through the transition methods here, so illegal transitions cannot be
//! written to storage.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BudgetWarning,
    BudgetExceeded,
    DailySpendingLimit,
    CategoryLimit,
    UnusualSpending,
    BudgetMilestone,
    SavingsGoal,
}

impl AlertType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BudgetWarning => "budget_warning",
            Self::BudgetExceeded => "budget_exceeded",
            Self::DailySpendingLimit => "daily_spending_limit",
            Self::CategoryLimit => "category_limit",
            Self::UnusualSpending => "unusual_spending",
            Self::BudgetMilestone => "budget_milestone",
            Self::SavingsGoal => "savings_goal",
        }
    }
}

impl TryFrom<&str> for AlertType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "budget_warning" => Ok(Self::BudgetWarning),
            "budget_exceeded" => Ok(Self::BudgetExceeded),
            "daily_spending_limit" => Ok(Self::DailySpendingLimit),
            "category_limit" => Ok(Self::CategoryLimit),
            "unusual_spending" => Ok(Self::UnusualSpending),
            "budget_milestone" => Ok(Self::BudgetMilestone),
            "savings_goal" => Ok(Self::SavingsGoal),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid alert type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    /// Resolved and Dismissed accept no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }
}

impl TryFrom<&str> for AlertStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid alert status: {other}"
            ))),
        }
    }
}

/// A triggered budget alert with amount snapshots taken at evaluation time.
#[derive(Clone, Debug, PartialEq)]
pub struct BudgetAlert {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub alert_type: AlertType,
    /// Usage percentage at which this alert fires, 0..=100.
    pub threshold_pct: f64,
    pub current_amount_minor: i64,
    pub budget_amount_minor: i64,
    pub message: String,
    pub status: AlertStatus,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version, bumped on every stored update.
    pub version: i32,
}

impl BudgetAlert {
    pub fn trigger(
        trip_id: Uuid,
        alert_type: AlertType,
        threshold_pct: f64,
        current_amount_minor: i64,
        budget_amount_minor: i64,
        message: String,
        triggered_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !(0.0..=100.0).contains(&threshold_pct) {
            return Err(EngineError::Validation(
                "threshold_pct must be within 0..=100".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            trip_id,
            alert_type,
            threshold_pct,
            current_amount_minor,
            budget_amount_minor,
            message,
            status: AlertStatus::Active,
            triggered_at,
            acknowledged_at: None,
            resolved_at: None,
            version: 0,
        })
    }

    /// `current / budget * 100`, or 0 when the budget snapshot is 0.
    #[must_use]
    pub fn usage_percentage(&self) -> f64 {
        crate::monitor::usage_percentage(self.current_amount_minor, self.budget_amount_minor)
    }

    #[must_use]
    pub fn remaining_minor(&self) -> i64 {
        self.budget_amount_minor - self.current_amount_minor
    }

    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.current_amount_minor > self.budget_amount_minor
    }

    /// BudgetExceeded alerts are always urgent, as is any alert at >= 90%
    /// usage.
    #[must_use]
    pub fn is_urgent(&self) -> bool {
        self.alert_type == AlertType::BudgetExceeded || self.usage_percentage() >= 90.0
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Active -> Acknowledged (user action).
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> ResultEngine<()> {
        if self.status != AlertStatus::Active {
            return Err(EngineError::InvalidTransition(format!(
                "cannot acknowledge a {} alert",
                self.status.as_str()
            )));
        }
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_at = Some(now);
        Ok(())
    }

    /// Active|Acknowledged -> Resolved (system or user).
    pub fn resolve(&mut self, now: DateTime<Utc>) -> ResultEngine<()> {
        if !matches!(self.status, AlertStatus::Active | AlertStatus::Acknowledged) {
            return Err(EngineError::InvalidTransition(format!(
                "cannot resolve a {} alert",
                self.status.as_str()
            )));
        }
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(now);
        Ok(())
    }

    /// Active -> Dismissed (user action, terminal).
    pub fn dismiss(&mut self) -> ResultEngine<()> {
        if self.status != AlertStatus::Active {
            return Err(EngineError::InvalidTransition(format!(
                "cannot dismiss a {} alert",
                self.status.as_str()
            )));
        }
        self.status = AlertStatus::Dismissed;
        Ok(())
    }

    /// Default message for an alert, templated per type.
    #[must_use]
    pub fn default_message(
        alert_type: AlertType,
        current_amount_minor: i64,
        budget_amount_minor: i64,
        currency: Currency,
    ) -> String {
        match alert_type {
            AlertType::BudgetWarning => {
                let pct =
                    crate::monitor::usage_percentage(current_amount_minor, budget_amount_minor);
                format!("Budget warning: used {pct:.1}% of budget")
            }
            AlertType::BudgetExceeded => {
                let over = Money::new(current_amount_minor - budget_amount_minor);
                format!("Budget exceeded: spent {} over budget", over.format_in(currency))
            }
            AlertType::DailySpendingLimit => "Daily spending limit reached".to_string(),
            AlertType::CategoryLimit => "Category spending limit reached".to_string(),
            AlertType::UnusualSpending => "Unusual spending pattern detected".to_string(),
            AlertType::BudgetMilestone => "Budget milestone reached".to_string(),
            AlertType::SavingsGoal => "Savings goal achieved".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_id: String,
    pub alert_type: String,
    #[sea_orm(column_type = "Double")]
    pub threshold_pct: f64,
    pub current_amount_minor: i64,
    pub budget_amount_minor: i64,
    pub message: String,
    pub status: String,
    pub triggered_at: DateTimeUtc,
    pub acknowledged_at: Option<DateTimeUtc>,
    pub resolved_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trips,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BudgetAlert> for ActiveModel {
    fn from(alert: &BudgetAlert) -> Self {
        Self {
            id: ActiveValue::Set(alert.id.to_string()),
            trip_id: ActiveValue::Set(alert.trip_id.to_string()),
            alert_type: ActiveValue::Set(alert.alert_type.as_str().to_string()),
            threshold_pct: ActiveValue::Set(alert.threshold_pct),
            current_amount_minor: ActiveValue::Set(alert.current_amount_minor),
            budget_amount_minor: ActiveValue::Set(alert.budget_amount_minor),
            message: ActiveValue::Set(alert.message.clone()),
            status: ActiveValue::Set(alert.status.as_str().to_string()),
            triggered_at: ActiveValue::Set(alert.triggered_at),
            acknowledged_at: ActiveValue::Set(alert.acknowledged_at),
            resolved_at: ActiveValue::Set(alert.resolved_at),
            version: ActiveValue::Set(alert.version),
        }
    }
}

impl TryFrom<Model> for BudgetAlert {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "budget_alert")?,
            trip_id: parse_uuid(&model.trip_id, "trip")?,
            alert_type: AlertType::try_from(model.alert_type.as_str())?,
            threshold_pct: model.threshold_pct,
            current_amount_minor: model.current_amount_minor,
            budget_amount_minor: model.budget_amount_minor,
            message: model.message,
            status: AlertStatus::try_from(model.status.as_str())?,
            triggered_at: model.triggered_at,
            acknowledged_at: model.acknowledged_at,
            resolved_at: model.resolved_at,
            version: model.version,
        })
    }
}
