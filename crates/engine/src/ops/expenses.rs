use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseListFilter, ResultEngine,
    budget_alerts::BudgetAlert,
    commands::{AddExpenseCmd, UpdateExpenseCmd},
    expenses::{self, Expense},
    trips::Trip,
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

impl Engine {
    /// Add an expense and re-evaluate the trip's budget in the same
    /// transaction. Returns the expense plus any newly triggered alerts, so
    /// a caller can surface "you just crossed 80%" immediately.
    pub async fn add_expense(
        &self,
        cmd: AddExpenseCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<(Expense, Vec<BudgetAlert>)> {
        if !self.converter.is_supported(cmd.currency) {
            return Err(EngineError::UnknownCurrency(cmd.currency.code().to_string()));
        }
        with_tx!(self, |db_tx| {
            let trip = self
                .require_trip_write(&db_tx, cmd.trip_id, &cmd.user_id, now)
                .await?;
            validate_day_in_trip(&trip, cmd.day_number)?;

            let mut expense = Expense::new(
                trip.id,
                cmd.day_number,
                cmd.expense_date,
                cmd.category,
                normalize_optional_text(Some(&cmd.description)).unwrap_or_default(),
                cmd.amount_minor,
                cmd.currency,
            )?;
            expense.reimbursable = cmd.reimbursable;

            let model: expenses::ActiveModel = (&expense).into();
            model.insert(&db_tx).await?;
            let triggered = self.evaluate_in_tx(&db_tx, &trip, now).await?;
            tracing::info!(
                trip_id = %trip.id,
                expense_id = %expense.id,
                amount_minor = expense.amount_minor,
                currency = expense.currency.code(),
                "expense added"
            );
            Ok((expense, triggered))
        })
    }

    /// Update an expense; unset command fields are left unchanged. The budget
    /// is re-evaluated in the same transaction.
    pub async fn update_expense(
        &self,
        cmd: UpdateExpenseCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<(Expense, Vec<BudgetAlert>)> {
        if let Some(currency) = cmd.currency
            && !self.converter.is_supported(currency)
        {
            return Err(EngineError::UnknownCurrency(currency.code().to_string()));
        }
        with_tx!(self, |db_tx| {
            let trip = self
                .require_trip_write(&db_tx, cmd.trip_id, &cmd.user_id, now)
                .await?;
            let model = self
                .require_expense_in_trip(&db_tx, cmd.trip_id, cmd.expense_id)
                .await?;
            let mut expense = Expense::try_from(model)?;

            if let Some(day_number) = cmd.day_number {
                validate_day_in_trip(&trip, day_number)?;
                expense.day_number = day_number;
            }
            if let Some(expense_date) = cmd.expense_date {
                expense.expense_date = expense_date;
            }
            if let Some(category) = cmd.category {
                expense.category = category;
            }
            if let Some(description) = cmd.description.as_deref() {
                expense.description =
                    normalize_optional_text(Some(description)).unwrap_or_default();
            }
            if let Some(amount_minor) = cmd.amount_minor {
                if amount_minor <= 0 {
                    return Err(EngineError::Validation(
                        "amount_minor must be > 0".to_string(),
                    ));
                }
                expense.amount_minor = amount_minor;
            }
            if let Some(currency) = cmd.currency {
                expense.currency = currency;
            }
            if let Some(reimbursable) = cmd.reimbursable {
                expense.reimbursable = reimbursable;
            }
            if let Some(reimbursed) = cmd.reimbursed {
                expense.reimbursed = reimbursed;
            }
            if let Some(status) = cmd.status {
                expense.status = status;
            }
            if expense.reimbursed && !expense.reimbursable {
                return Err(EngineError::Validation(
                    "only a reimbursable expense can be reimbursed".to_string(),
                ));
            }

            let mut model: expenses::ActiveModel = (&expense).into();
            model.id = ActiveValue::Unchanged(expense.id.to_string());
            model.update(&db_tx).await?;
            let triggered = self.evaluate_in_tx(&db_tx, &trip, now).await?;
            tracing::info!(
                trip_id = %trip.id,
                expense_id = %expense.id,
                "expense updated"
            );
            Ok((expense, triggered))
        })
    }

    /// Remove an expense. Dropping spend can resolve alerts; any alerts
    /// newly triggered by the re-evaluation are returned (normally none).
    pub async fn remove_expense(
        &self,
        trip_id: Uuid,
        expense_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        with_tx!(self, |db_tx| {
            let trip = self
                .require_trip_write(&db_tx, trip_id, user_id, now)
                .await?;
            let model = self
                .require_expense_in_trip(&db_tx, trip_id, expense_id)
                .await?;
            expenses::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            let triggered = self.evaluate_in_tx(&db_tx, &trip, now).await?;
            tracing::info!(
                trip_id = %trip_id,
                expense_id = %expense_id,
                user_id = %user_id,
                "expense removed"
            );
            Ok(triggered)
        })
    }

    /// Expenses of a trip matching `filter`, oldest first.
    pub async fn list_expenses(
        &self,
        trip_id: Uuid,
        user_id: &str,
        filter: &ExpenseListFilter,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Expense>> {
        filter.validate()?;
        with_tx!(self, |db_tx| {
            self.require_trip_read(&db_tx, trip_id, user_id, now).await?;
            let mut expenses = self.load_expenses(&db_tx, trip_id).await?;
            expenses.retain(|e| filter.matches(e));
            Ok(expenses)
        })
    }
}

fn validate_day_in_trip(trip: &Trip, day_number: i32) -> ResultEngine<()> {
    if day_number < 1 || i64::from(day_number) > trip.duration_days() {
        return Err(EngineError::Validation(format!(
            "day_number must be within 1..={}",
            trip.duration_days()
        )));
    }
    Ok(())
}
