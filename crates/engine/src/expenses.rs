//! Expense primitives.
//!
//! An expense is always expressed in its own currency; cross-expense sums go
//! through the ledger, which converts first.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Accommodation,
    Food,
    Transport,
    Activities,
    Shopping,
    Entertainment,
    Health,
    Insurance,
    Visas,
    Fees,
    Tips,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 12] = [
        Self::Accommodation,
        Self::Food,
        Self::Transport,
        Self::Activities,
        Self::Shopping,
        Self::Entertainment,
        Self::Health,
        Self::Insurance,
        Self::Visas,
        Self::Fees,
        Self::Tips,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accommodation => "accommodation",
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Activities => "activities",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Health => "health",
            Self::Insurance => "insurance",
            Self::Visas => "visas",
            Self::Fees => "fees",
            Self::Tips => "tips",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for ExpenseCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| {
                EngineError::InvalidEnumValue(format!("invalid expense category: {value}"))
            })
    }
}

impl core::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    #[default]
    Paid,
    Cancelled,
    Refunded,
}

impl ExpenseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl TryFrom<&str> for ExpenseStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(EngineError::InvalidEnumValue(format!(
                "invalid expense status: {other}"
            ))),
        }
    }
}

/// A single expense belonging to a trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    pub trip_id: Uuid,
    /// 1-based day of the trip this expense belongs to.
    pub day_number: i32,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub reimbursable: bool,
    pub reimbursed: bool,
    pub status: ExpenseStatus,
}

impl Expense {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trip_id: Uuid,
        day_number: i32,
        expense_date: NaiveDate,
        category: ExpenseCategory,
        description: String,
        amount_minor: i64,
        currency: Currency,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if day_number < 1 {
            return Err(EngineError::Validation(
                "day_number must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            trip_id,
            day_number,
            expense_date,
            category,
            description,
            amount_minor,
            currency,
            reimbursable: false,
            reimbursed: false,
            status: ExpenseStatus::Paid,
        })
    }

    /// Whether this expense counts toward the trip's spend totals.
    ///
    /// Cancelled and refunded expenses are excluded.
    #[must_use]
    pub fn counts_toward_spend(&self) -> bool {
        matches!(self.status, ExpenseStatus::Pending | ExpenseStatus::Paid)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_id: String,
    pub day_number: i32,
    pub expense_date: Date,
    pub category: String,
    pub description: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reimbursable: bool,
    pub reimbursed: bool,
    pub status: String,
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

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            trip_id: ActiveValue::Set(expense.trip_id.to_string()),
            day_number: ActiveValue::Set(expense.day_number),
            expense_date: ActiveValue::Set(expense.expense_date),
            category: ActiveValue::Set(expense.category.as_str().to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            reimbursable: ActiveValue::Set(expense.reimbursable),
            reimbursed: ActiveValue::Set(expense.reimbursed),
            status: ActiveValue::Set(expense.status.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            trip_id: parse_uuid(&model.trip_id, "trip")?,
            day_number: model.day_number,
            expense_date: model.expense_date,
            category: ExpenseCategory::try_from(model.category.as_str())?,
            description: model.description,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            reimbursable: model.reimbursable,
            reimbursed: model.reimbursed,
            status: ExpenseStatus::try_from(model.status.as_str())?,
        })
    }
}
