//! Command structs for engine operations.
//!
//! These types group parameters for write operations (trip/expense/share
//! creation and update), keeping call sites readable and avoiding long
//! argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    Currency,
    expenses::{ExpenseCategory, ExpenseStatus},
    trip_shares::SharePermission,
    trips::{TripStatus, TripVisibility},
};

/// Create a trip.
#[derive(Clone, Debug)]
pub struct CreateTripCmd {
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_minor: i64,
    pub currency: Currency,
    pub user_id: String,
}

impl CreateTripCmd {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            destination: destination.into(),
            start_date,
            end_date,
            budget_minor: 0,
            currency: Currency::Usd,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn budget(mut self, budget_minor: i64, currency: Currency) -> Self {
        self.budget_minor = budget_minor;
        self.currency = currency;
        self
    }
}

/// Update an existing trip. Unset fields are left unchanged.
#[derive(Clone, Debug)]
pub struct UpdateTripCmd {
    pub trip_id: Uuid,
    pub user_id: String,
    pub title: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub status: Option<TripStatus>,
    pub visibility: Option<TripVisibility>,
}

impl UpdateTripCmd {
    #[must_use]
    pub fn new(trip_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            trip_id,
            user_id: user_id.into(),
            title: None,
            destination: None,
            start_date: None,
            end_date: None,
            budget_minor: None,
            currency: None,
            status: None,
            visibility: None,
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    #[must_use]
    pub fn dates(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn budget_minor(mut self, budget_minor: i64) -> Self {
        self.budget_minor = Some(budget_minor);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn status(mut self, status: TripStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn visibility(mut self, visibility: TripVisibility) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// Add an expense to a trip.
#[derive(Clone, Debug)]
pub struct AddExpenseCmd {
    pub trip_id: Uuid,
    pub user_id: String,
    pub day_number: i32,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub reimbursable: bool,
}

impl AddExpenseCmd {
    #[must_use]
    pub fn new(
        trip_id: Uuid,
        user_id: impl Into<String>,
        day_number: i32,
        expense_date: NaiveDate,
        category: ExpenseCategory,
        amount_minor: i64,
        currency: Currency,
    ) -> Self {
        Self {
            trip_id,
            user_id: user_id.into(),
            day_number,
            expense_date,
            category,
            description: String::new(),
            amount_minor,
            currency,
            reimbursable: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn reimbursable(mut self, reimbursable: bool) -> Self {
        self.reimbursable = reimbursable;
        self
    }
}

/// Update an existing expense. Unset fields are left unchanged.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub trip_id: Uuid,
    pub expense_id: Uuid,
    pub user_id: String,
    pub day_number: Option<i32>,
    pub expense_date: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
    pub description: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub reimbursable: Option<bool>,
    pub reimbursed: Option<bool>,
    pub status: Option<ExpenseStatus>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(trip_id: Uuid, expense_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            trip_id,
            expense_id,
            user_id: user_id.into(),
            day_number: None,
            expense_date: None,
            category: None,
            description: None,
            amount_minor: None,
            currency: None,
            reimbursable: None,
            reimbursed: None,
            status: None,
        }
    }

    #[must_use]
    pub fn day_number(mut self, day_number: i32) -> Self {
        self.day_number = Some(day_number);
        self
    }

    #[must_use]
    pub fn expense_date(mut self, expense_date: NaiveDate) -> Self {
        self.expense_date = Some(expense_date);
        self
    }

    #[must_use]
    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount_minor: i64, currency: Currency) -> Self {
        self.amount_minor = Some(amount_minor);
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn reimbursable(mut self, reimbursable: bool) -> Self {
        self.reimbursable = Some(reimbursable);
        self
    }

    #[must_use]
    pub fn reimbursed(mut self, reimbursed: bool) -> Self {
        self.reimbursed = Some(reimbursed);
        self
    }

    #[must_use]
    pub fn status(mut self, status: ExpenseStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Invite a user to a trip.
#[derive(Clone, Debug)]
pub struct InviteShareCmd {
    pub trip_id: Uuid,
    pub user_id: String,
    pub shared_with: String,
    pub permission: SharePermission,
    pub expires_at: Option<DateTime<Utc>>,
}

impl InviteShareCmd {
    #[must_use]
    pub fn new(
        trip_id: Uuid,
        user_id: impl Into<String>,
        shared_with: impl Into<String>,
        permission: SharePermission,
    ) -> Self {
        Self {
            trip_id,
            user_id: user_id.into(),
            shared_with: shared_with.into(),
            permission,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
