//! The `Trip` is the top-level planning entity. It owns expenses, shares and
//! budget alerts; deleting a trip deletes all three.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Planning,
    Active,
    Completed,
    Cancelled,
}

impl TripStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for TripStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid trip status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripVisibility {
    #[default]
    Private,
    Shared,
    Public,
}

impl TripVisibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl TryFrom<&str> for TripVisibility {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            "public" => Ok(Self::Public),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid trip visibility: {other}"
            ))),
        }
    }
}

/// A trip with its budget envelope.
///
/// The budget is a fixed amount in a fixed currency; expense amounts in other
/// currencies are normalized into it by the ledger before any comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trip {
    pub id: Uuid,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_minor: i64,
    pub currency: Currency,
    pub status: TripStatus,
    pub visibility: TripVisibility,
    pub user_id: String,
    /// Optimistic-concurrency version, bumped on every stored update.
    pub version: i32,
}

impl Trip {
    pub fn new(
        title: String,
        destination: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        budget_minor: i64,
        currency: Currency,
        user_id: &str,
    ) -> ResultEngine<Self> {
        validate_dates(start_date, end_date)?;
        validate_budget(budget_minor)?;
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            destination,
            start_date,
            end_date,
            budget_minor,
            currency,
            status: TripStatus::Planning,
            visibility: TripVisibility::Private,
            user_id: user_id.to_string(),
            version: 0,
        })
    }

    #[must_use]
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Number of calendar days covered by the trip, inclusive.
    #[must_use]
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

pub(crate) fn validate_dates(start_date: NaiveDate, end_date: NaiveDate) -> ResultEngine<()> {
    if start_date > end_date {
        return Err(EngineError::Validation(
            "start_date must be <= end_date".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_budget(budget_minor: i64) -> ResultEngine<()> {
    if budget_minor < 0 {
        return Err(EngineError::Validation(
            "budget must be >= 0".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub destination: String,
    pub start_date: Date,
    pub end_date: Date,
    pub budget_minor: i64,
    pub currency: String,
    pub status: String,
    pub visibility: String,
    pub user_id: String,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::trip_shares::Entity")]
    TripShares,
    #[sea_orm(has_many = "super::budget_alerts::Entity")]
    BudgetAlerts,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::trip_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TripShares.def()
    }
}

impl Related<super::budget_alerts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetAlerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Trip> for ActiveModel {
    fn from(trip: &Trip) -> Self {
        Self {
            id: ActiveValue::Set(trip.id.to_string()),
            title: ActiveValue::Set(trip.title.clone()),
            destination: ActiveValue::Set(trip.destination.clone()),
            start_date: ActiveValue::Set(trip.start_date),
            end_date: ActiveValue::Set(trip.end_date),
            budget_minor: ActiveValue::Set(trip.budget_minor),
            currency: ActiveValue::Set(trip.currency.code().to_string()),
            status: ActiveValue::Set(trip.status.as_str().to_string()),
            visibility: ActiveValue::Set(trip.visibility.as_str().to_string()),
            user_id: ActiveValue::Set(trip.user_id.clone()),
            version: ActiveValue::Set(trip.version),
        }
    }
}

impl TryFrom<Model> for Trip {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "trip")?,
            title: model.title,
            destination: model.destination,
            start_date: model.start_date,
            end_date: model.end_date,
            budget_minor: model.budget_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            status: TripStatus::try_from(model.status.as_str())?,
            visibility: TripVisibility::try_from(model.visibility.as_str())?,
            user_id: model.user_id,
            version: model.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn new_trip_defaults() {
        let trip = Trip::new(
            "Japan 2026".to_string(),
            "Tokyo".to_string(),
            date("2026-04-01"),
            date("2026-04-10"),
            500_000,
            Currency::Usd,
            "alice",
        )
        .unwrap();
        assert_eq!(trip.status, TripStatus::Planning);
        assert_eq!(trip.visibility, TripVisibility::Private);
        assert_eq!(trip.duration_days(), 10);
        assert!(trip.is_owner("alice"));
        assert!(!trip.is_owner("bob"));
    }

    #[test]
    fn rejects_inverted_dates() {
        let err = Trip::new(
            "T".to_string(),
            "D".to_string(),
            date("2026-04-10"),
            date("2026-04-01"),
            0,
            Currency::Usd,
            "alice",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn rejects_negative_budget() {
        let err = Trip::new(
            "T".to_string(),
            "D".to_string(),
            date("2026-04-01"),
            date("2026-04-10"),
            -1,
            Currency::Usd,
            "alice",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn status_round_trips() {
        for status in [
            TripStatus::Planning,
            TripStatus::Active,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert_eq!(TripStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(TripStatus::try_from("paused").is_err());
    }
}
