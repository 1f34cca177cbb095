use sea_orm::DatabaseConnection;

use crate::{CurrencyConverter, MonitorConfig, RateTable, ResultEngine};

mod access;
mod alerts;
mod expenses;
mod shares;
mod trips;

pub use trips::BudgetSummary;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    converter: CurrencyConverter,
    monitor_config: MonitorConfig,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The converter used for all cross-currency totals.
    #[must_use]
    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    rates: Option<RateTable>,
    monitor_config: Option<MonitorConfig>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default exchange-rate snapshot.
    pub fn rates(mut self, rates: RateTable) -> EngineBuilder {
        self.rates = Some(rates);
        self
    }

    /// Override the default monitoring thresholds.
    pub fn monitor(mut self, config: MonitorConfig) -> EngineBuilder {
        self.monitor_config = Some(config);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            converter: CurrencyConverter::new(self.rates.unwrap_or_default()),
            monitor_config: self.monitor_config.unwrap_or_default(),
        })
    }
}
