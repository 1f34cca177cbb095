//! Pure aggregation over a trip's expenses.
//!
//! The ledger never touches storage; the ops layer loads expenses and hands
//! them in. All totals are expressed in a single target currency (normally
//! the trip's budget currency) so they can be compared against the budget.
//! Expenses whose currency has no rate in the converter's table are skipped
//! and reported back instead of failing the whole aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    Currency, CurrencyConverter, EngineError, ResultEngine,
    expenses::{Expense, ExpenseCategory, ExpenseStatus},
};

/// An expense left out of a total because its currency could not be
/// converted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedExpense {
    pub expense_id: Uuid,
    pub currency: Currency,
}

/// Result of a multi-currency sum: the converted total plus any expenses
/// that had to be skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerTotal {
    pub total_minor: i64,
    pub skipped: Vec<SkippedExpense>,
}

impl LedgerTotal {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Filter for expense listings. All fields are conjunctive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseListFilter {
    pub categories: Option<Vec<ExpenseCategory>>,
    pub status: Option<ExpenseStatus>,
    pub currency: Option<Currency>,
    pub day_number: Option<i32>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub reimbursable: Option<bool>,
    /// Amount bounds in the expense's own (unconverted) minor units.
    pub min_amount_minor: Option<i64>,
    pub max_amount_minor: Option<i64>,
}

impl ExpenseListFilter {
    pub fn validate(&self) -> ResultEngine<()> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to)
            && from > to
        {
            return Err(EngineError::Validation(
                "date_from must be <= date_to".to_string(),
            ));
        }
        if let Some(day) = self.day_number
            && day < 1
        {
            return Err(EngineError::Validation(
                "day_number must be >= 1".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_amount_minor, self.max_amount_minor)
            && min > max
        {
            return Err(EngineError::Validation(
                "min_amount_minor must be <= max_amount_minor".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        self.categories
            .as_ref()
            .is_none_or(|cs| cs.contains(&expense.category))
            && self.status.is_none_or(|s| expense.status == s)
            && self.currency.is_none_or(|c| expense.currency == c)
            && self.day_number.is_none_or(|d| expense.day_number == d)
            && self.date_from.is_none_or(|from| expense.expense_date >= from)
            && self.date_to.is_none_or(|to| expense.expense_date <= to)
            && self.reimbursable.is_none_or(|r| expense.reimbursable == r)
            && self
                .min_amount_minor
                .is_none_or(|min| expense.amount_minor >= min)
            && self
                .max_amount_minor
                .is_none_or(|max| expense.amount_minor <= max)
    }
}

/// Sums expenses across currencies into one target currency.
///
/// Only expenses that count toward spend (pending or paid) are included;
/// cancelled and refunded expenses are ignored entirely.
#[derive(Clone, Debug)]
pub struct ExpenseLedger<'a> {
    converter: &'a CurrencyConverter,
}

impl<'a> ExpenseLedger<'a> {
    #[must_use]
    pub fn new(converter: &'a CurrencyConverter) -> Self {
        Self { converter }
    }

    /// Total spend converted into `target`.
    ///
    /// Each expense is converted individually and the converted minor units
    /// summed, so the total is independent of expense order.
    #[must_use]
    pub fn total_in(&self, expenses: &[Expense], target: Currency) -> LedgerTotal {
        let mut total = LedgerTotal::default();
        for expense in expenses.iter().filter(|e| e.counts_toward_spend()) {
            match self
                .converter
                .convert_minor(expense.amount_minor, expense.currency, target)
            {
                Ok(converted) => total.total_minor += converted,
                Err(EngineError::UnknownCurrency(_)) => total.skipped.push(SkippedExpense {
                    expense_id: expense.id,
                    currency: expense.currency,
                }),
                // convert_minor only fails with UnknownCurrency.
                Err(_) => {}
            }
        }
        total
    }

    /// Converted spend per category, categories with no spend omitted.
    #[must_use]
    pub fn total_by_category(
        &self,
        expenses: &[Expense],
        target: Currency,
    ) -> BTreeMap<ExpenseCategory, LedgerTotal> {
        let mut by_category: BTreeMap<ExpenseCategory, Vec<Expense>> = BTreeMap::new();
        for expense in expenses {
            by_category
                .entry(expense.category)
                .or_default()
                .push(expense.clone());
        }
        by_category
            .into_iter()
            .map(|(category, group)| (category, self.total_in(&group, target)))
            .filter(|(_, total)| total.total_minor != 0 || !total.skipped.is_empty())
            .collect()
    }

    /// Converted spend per trip day, days with no spend omitted.
    #[must_use]
    pub fn total_by_day(
        &self,
        expenses: &[Expense],
        target: Currency,
    ) -> BTreeMap<i32, LedgerTotal> {
        let mut by_day: BTreeMap<i32, Vec<Expense>> = BTreeMap::new();
        for expense in expenses {
            by_day
                .entry(expense.day_number)
                .or_default()
                .push(expense.clone());
        }
        by_day
            .into_iter()
            .map(|(day, group)| (day, self.total_in(&group, target)))
            .filter(|(_, total)| total.total_minor != 0 || !total.skipped.is_empty())
            .collect()
    }

    /// Raw (unconverted) spend per original currency.
    #[must_use]
    pub fn total_by_currency(&self, expenses: &[Expense]) -> BTreeMap<Currency, i64> {
        let mut by_currency: BTreeMap<Currency, i64> = BTreeMap::new();
        for expense in expenses.iter().filter(|e| e.counts_toward_spend()) {
            *by_currency.entry(expense.currency).or_default() += expense.amount_minor;
        }
        by_currency
    }
}

#[cfg(test)]
mod tests {
    use crate::RateTable;

    use super::*;

    fn expense(
        amount_minor: i64,
        currency: Currency,
        category: ExpenseCategory,
        day_number: i32,
    ) -> Expense {
        Expense::new(
            Uuid::new_v4(),
            day_number,
            "2026-04-01".parse().unwrap(),
            category,
            "test".to_string(),
            amount_minor,
            currency,
        )
        .unwrap()
    }

    #[test]
    fn mixed_currency_total() {
        let converter = CurrencyConverter::default();
        let ledger = ExpenseLedger::new(&converter);
        let expenses = [
            expense(10_000, Currency::Usd, ExpenseCategory::Food, 1),
            // 100.00 EUR -> 11765 USD minor
            expense(10_000, Currency::Eur, ExpenseCategory::Transport, 1),
        ];
        let total = ledger.total_in(&expenses, Currency::Usd);
        assert_eq!(total.total_minor, 21_765);
        assert!(total.is_complete());
    }

    #[test]
    fn cancelled_and_refunded_excluded() {
        let converter = CurrencyConverter::default();
        let ledger = ExpenseLedger::new(&converter);
        let mut cancelled = expense(5_000, Currency::Usd, ExpenseCategory::Food, 1);
        cancelled.status = ExpenseStatus::Cancelled;
        let mut refunded = expense(7_000, Currency::Usd, ExpenseCategory::Food, 1);
        refunded.status = ExpenseStatus::Refunded;
        let mut pending = expense(1_000, Currency::Usd, ExpenseCategory::Food, 1);
        pending.status = ExpenseStatus::Pending;
        let paid = expense(2_000, Currency::Usd, ExpenseCategory::Food, 1);

        let total = ledger.total_in(&[cancelled, refunded, pending, paid], Currency::Usd);
        assert_eq!(total.total_minor, 3_000);
    }

    #[test]
    fn unknown_currency_is_skipped_not_fatal() {
        let table = RateTable::from_rates([(Currency::Usd, 1.0)]).unwrap();
        let converter = CurrencyConverter::new(table);
        let ledger = ExpenseLedger::new(&converter);
        let known = expense(10_000, Currency::Usd, ExpenseCategory::Food, 1);
        let unknown = expense(5_000, Currency::Eur, ExpenseCategory::Food, 1);
        let unknown_id = unknown.id;

        let total = ledger.total_in(&[known, unknown], Currency::Usd);
        assert_eq!(total.total_minor, 10_000);
        assert_eq!(
            total.skipped,
            vec![SkippedExpense {
                expense_id: unknown_id,
                currency: Currency::Eur,
            }]
        );
    }

    #[test]
    fn total_is_order_independent() {
        let converter = CurrencyConverter::default();
        let ledger = ExpenseLedger::new(&converter);
        let mut expenses = vec![
            expense(123, Currency::Jpy, ExpenseCategory::Food, 1),
            expense(45_678, Currency::Eur, ExpenseCategory::Shopping, 2),
            expense(9_999, Currency::Gbp, ExpenseCategory::Activities, 3),
        ];
        let forward = ledger.total_in(&expenses, Currency::Usd).total_minor;
        expenses.reverse();
        let backward = ledger.total_in(&expenses, Currency::Usd).total_minor;
        assert_eq!(forward, backward);
    }

    #[test]
    fn uniform_currency_sum_then_convert_matches_convert_then_sum() {
        let converter = CurrencyConverter::default();
        let ledger = ExpenseLedger::new(&converter);
        let expenses = [
            expense(1_234, Currency::Eur, ExpenseCategory::Food, 1),
            expense(5_678, Currency::Eur, ExpenseCategory::Transport, 2),
            expense(9_012, Currency::Eur, ExpenseCategory::Shopping, 3),
        ];

        // Sum in the native currency first, then convert the sum.
        let native_sum = ledger.total_in(&expenses, Currency::Eur).total_minor;
        let converted_sum = converter
            .convert_minor(native_sum, Currency::Eur, Currency::Usd)
            .unwrap();
        // Convert each expense individually, then sum.
        let per_item = ledger.total_in(&expenses, Currency::Usd).total_minor;
        // Per-item rounding may differ from whole-sum rounding by at most one
        // minor unit per expense.
        assert!((converted_sum - per_item).abs() <= expenses.len() as i64);
    }

    #[test]
    fn by_category_and_by_day() {
        let converter = CurrencyConverter::default();
        let ledger = ExpenseLedger::new(&converter);
        let expenses = [
            expense(1_000, Currency::Usd, ExpenseCategory::Food, 1),
            expense(2_000, Currency::Usd, ExpenseCategory::Food, 2),
            expense(3_000, Currency::Usd, ExpenseCategory::Transport, 1),
        ];

        let by_category = ledger.total_by_category(&expenses, Currency::Usd);
        assert_eq!(by_category[&ExpenseCategory::Food].total_minor, 3_000);
        assert_eq!(by_category[&ExpenseCategory::Transport].total_minor, 3_000);
        assert!(!by_category.contains_key(&ExpenseCategory::Shopping));

        let by_day = ledger.total_by_day(&expenses, Currency::Usd);
        assert_eq!(by_day[&1].total_minor, 4_000);
        assert_eq!(by_day[&2].total_minor, 2_000);
    }

    #[test]
    fn by_currency_keeps_original_amounts() {
        let converter = CurrencyConverter::default();
        let ledger = ExpenseLedger::new(&converter);
        let expenses = [
            expense(1_000, Currency::Usd, ExpenseCategory::Food, 1),
            expense(2_000, Currency::Eur, ExpenseCategory::Food, 1),
            expense(500, Currency::Eur, ExpenseCategory::Food, 2),
        ];
        let by_currency = ledger.total_by_currency(&expenses);
        assert_eq!(by_currency[&Currency::Usd], 1_000);
        assert_eq!(by_currency[&Currency::Eur], 2_500);
    }

    #[test]
    fn filter_matches_conjunctively() {
        let e = expense(1_000, Currency::Usd, ExpenseCategory::Food, 2);
        let all = ExpenseListFilter::default();
        assert!(all.matches(&e));

        let filter = ExpenseListFilter {
            categories: Some(vec![ExpenseCategory::Food, ExpenseCategory::Transport]),
            day_number: Some(2),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let wrong_day = ExpenseListFilter {
            categories: Some(vec![ExpenseCategory::Food]),
            day_number: Some(3),
            ..Default::default()
        };
        assert!(!wrong_day.matches(&e));
    }

    #[test]
    fn filter_by_amount_and_reimbursement() {
        let mut e = expense(1_000, Currency::Usd, ExpenseCategory::Food, 1);
        e.reimbursable = true;

        let in_range = ExpenseListFilter {
            min_amount_minor: Some(500),
            max_amount_minor: Some(1_500),
            reimbursable: Some(true),
            ..Default::default()
        };
        assert!(in_range.matches(&e));

        let below_min = ExpenseListFilter {
            min_amount_minor: Some(2_000),
            ..Default::default()
        };
        assert!(!below_min.matches(&e));

        let not_reimbursable = ExpenseListFilter {
            reimbursable: Some(false),
            ..Default::default()
        };
        assert!(!not_reimbursable.matches(&e));
    }

    #[test]
    fn filter_validates_ranges() {
        let inverted = ExpenseListFilter {
            date_from: Some("2026-04-10".parse().unwrap()),
            date_to: Some("2026-04-01".parse().unwrap()),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let bad_day = ExpenseListFilter {
            day_number: Some(0),
            ..Default::default()
        };
        assert!(bad_day.validate().is_err());

        let inverted_amounts = ExpenseListFilter {
            min_amount_minor: Some(1_000),
            max_amount_minor: Some(500),
            ..Default::default()
        };
        assert!(inverted_amounts.validate().is_err());
    }
}
