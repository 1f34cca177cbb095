//! Trip planning engine: trips with budgets, multi-currency expenses,
//! threshold alerting and permissioned sharing.
//!
//! All state lives in the database; [`Engine`] is the single entry point and
//! every operation runs in its own transaction. Time-dependent operations
//! take the clock as a parameter so callers (and tests) control it.

pub use budget_alerts::{AlertStatus, AlertType, BudgetAlert};
pub use currency::{Currency, CurrencyConverter, CurrencyInfo, RateTable};
pub use error::EngineError;
pub use expenses::{Expense, ExpenseCategory, ExpenseStatus};
pub use ledger::{ExpenseLedger, ExpenseListFilter, LedgerTotal, SkippedExpense};
pub use money::Money;
pub use monitor::{AlertAction, BudgetSnapshot, MonitorConfig};
pub use ops::{BudgetSummary, Engine, EngineBuilder};
pub use trip_shares::{SharePermission, ShareStatus, TripShare};
pub use trips::{Trip, TripStatus, TripVisibility};

pub mod commands;

mod budget_alerts;
mod currency;
mod error;
mod expenses;
mod ledger;
mod money;
mod monitor;
mod ops;
mod trip_shares;
mod trips;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
