//! Supported currencies and the conversion service.
//!
//! The engine stores monetary values as an `i64` number of **minor units**
//! (see `Money`). Every code supported here uses 2 fraction digits, so
//! `10.50 USD` ⇄ `1050`.
//!
//! Conversion goes through a USD reference using a [`RateTable`] injected at
//! construction. Rates are read-only configuration, not live-fetched; a
//! deployment that wants live rates swaps the table without touching callers.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// ISO-4217-like currency code.
///
/// This is a closed set: parsing any other 3-letter code fails with
/// [`EngineError::InvalidEnumValue`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cad,
    Aud,
    Chf,
    Cny,
    Inr,
    Brl,
    Mxn,
    Krw,
    Sgd,
    Hkd,
    Nzd,
    Sek,
    Nok,
    Dkk,
    Pln,
    Czk,
    Lkr,
}

/// Display metadata for a currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    pub name: &'static str,
    pub symbol: &'static str,
}

impl Currency {
    pub const ALL: [Currency; 21] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Cad,
        Currency::Aud,
        Currency::Chf,
        Currency::Cny,
        Currency::Inr,
        Currency::Brl,
        Currency::Mxn,
        Currency::Krw,
        Currency::Sgd,
        Currency::Hkd,
        Currency::Nzd,
        Currency::Sek,
        Currency::Nok,
        Currency::Dkk,
        Currency::Pln,
        Currency::Czk,
        Currency::Lkr,
    ];

    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Inr => "INR",
            Currency::Brl => "BRL",
            Currency::Mxn => "MXN",
            Currency::Krw => "KRW",
            Currency::Sgd => "SGD",
            Currency::Hkd => "HKD",
            Currency::Nzd => "NZD",
            Currency::Sek => "SEK",
            Currency::Nok => "NOK",
            Currency::Dkk => "DKK",
            Currency::Pln => "PLN",
            Currency::Czk => "CZK",
            Currency::Lkr => "LKR",
        }
    }

    /// Display metadata (name and symbol).
    #[must_use]
    pub const fn info(self) -> CurrencyInfo {
        match self {
            Currency::Usd => CurrencyInfo { name: "US Dollar", symbol: "$" },
            Currency::Eur => CurrencyInfo { name: "Euro", symbol: "€" },
            Currency::Gbp => CurrencyInfo { name: "British Pound", symbol: "£" },
            Currency::Jpy => CurrencyInfo { name: "Japanese Yen", symbol: "¥" },
            Currency::Cad => CurrencyInfo { name: "Canadian Dollar", symbol: "C$" },
            Currency::Aud => CurrencyInfo { name: "Australian Dollar", symbol: "A$" },
            Currency::Chf => CurrencyInfo { name: "Swiss Franc", symbol: "CHF" },
            Currency::Cny => CurrencyInfo { name: "Chinese Yuan", symbol: "¥" },
            Currency::Inr => CurrencyInfo { name: "Indian Rupee", symbol: "₹" },
            Currency::Brl => CurrencyInfo { name: "Brazilian Real", symbol: "R$" },
            Currency::Mxn => CurrencyInfo { name: "Mexican Peso", symbol: "$" },
            Currency::Krw => CurrencyInfo { name: "South Korean Won", symbol: "₩" },
            Currency::Sgd => CurrencyInfo { name: "Singapore Dollar", symbol: "S$" },
            Currency::Hkd => CurrencyInfo { name: "Hong Kong Dollar", symbol: "HK$" },
            Currency::Nzd => CurrencyInfo { name: "New Zealand Dollar", symbol: "NZ$" },
            Currency::Sek => CurrencyInfo { name: "Swedish Krona", symbol: "kr" },
            Currency::Nok => CurrencyInfo { name: "Norwegian Krone", symbol: "kr" },
            Currency::Dkk => CurrencyInfo { name: "Danish Krone", symbol: "kr" },
            Currency::Pln => CurrencyInfo { name: "Polish Zloty", symbol: "zł" },
            Currency::Czk => CurrencyInfo { name: "Czech Koruna", symbol: "Kč" },
            Currency::Lkr => CurrencyInfo { name: "Sri Lankan Rupee", symbol: "Rs" },
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    ///
    /// Every code in the supported set uses 2.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        2
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let code = value.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| EngineError::InvalidEnumValue(format!("unsupported currency: {value}")))
    }
}

/// USD-relative exchange rates.
///
/// `rate[USD] = 1.0`; one major unit of USD buys `rate[c]` major units of
/// `c`. The default table is a static snapshot; tests and deployments inject
/// their own.
#[derive(Clone, Debug)]
pub struct RateTable {
    rates: HashMap<Currency, f64>,
}

impl RateTable {
    /// Empty table; only same-currency conversions will succeed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// Builds a table from `(currency, rate)` pairs.
    pub fn from_rates<I>(rates: I) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = (Currency, f64)>,
    {
        let mut table = Self::empty();
        for (currency, rate) in rates {
            table.set_rate(currency, rate)?;
        }
        Ok(table)
    }

    /// Sets or replaces the rate for one currency.
    pub fn set_rate(&mut self, currency: Currency, rate: f64) -> ResultEngine<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EngineError::Validation(format!(
                "rate for {currency} must be > 0"
            )));
        }
        self.rates.insert(currency, rate);
        Ok(())
    }

    #[must_use]
    pub fn rate(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).copied()
    }

    #[must_use]
    pub fn contains(&self, currency: Currency) -> bool {
        self.rates.contains_key(&currency)
    }
}

impl Default for RateTable {
    /// Static snapshot covering the whole supported set.
    fn default() -> Self {
        let rates = [
            (Currency::Usd, 1.0),
            (Currency::Eur, 0.85),
            (Currency::Gbp, 0.73),
            (Currency::Jpy, 110.0),
            (Currency::Cad, 1.25),
            (Currency::Aud, 1.35),
            (Currency::Chf, 0.92),
            (Currency::Cny, 6.45),
            (Currency::Inr, 74.0),
            (Currency::Brl, 5.2),
            (Currency::Mxn, 20.0),
            (Currency::Krw, 1180.0),
            (Currency::Sgd, 1.35),
            (Currency::Hkd, 7.8),
            (Currency::Nzd, 1.42),
            (Currency::Sek, 8.6),
            (Currency::Nok, 8.9),
            (Currency::Dkk, 6.3),
            (Currency::Pln, 3.9),
            (Currency::Czk, 21.7),
            (Currency::Lkr, 320.0),
        ];
        Self {
            rates: rates.into_iter().collect(),
        }
    }
}

/// Converts minor-unit amounts between currencies through the USD reference.
#[derive(Clone, Debug)]
pub struct CurrencyConverter {
    rates: RateTable,
}

impl CurrencyConverter {
    #[must_use]
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }

    /// Returns `true` iff the table holds a rate for `currency`.
    #[must_use]
    pub fn is_supported(&self, currency: Currency) -> bool {
        self.rates.contains(currency)
    }

    /// Converts `amount_minor` from `from` to `to`.
    ///
    /// Same-currency conversion returns the amount unchanged (no rounding
    /// drift). Cross-currency conversion rounds half away from zero to the
    /// nearest minor unit.
    pub fn convert_minor(
        &self,
        amount_minor: i64,
        from: Currency,
        to: Currency,
    ) -> ResultEngine<i64> {
        if from == to {
            return Ok(amount_minor);
        }
        let from_rate = self
            .rates
            .rate(from)
            .ok_or_else(|| EngineError::UnknownCurrency(from.code().to_string()))?;
        let to_rate = self
            .rates
            .rate(to)
            .ok_or_else(|| EngineError::UnknownCurrency(to.code().to_string()))?;

        let converted = (amount_minor as f64) / from_rate * to_rate;
        Ok(converted.round() as i64)
    }

    /// Code → display metadata for every currency the table can convert.
    #[must_use]
    pub fn supported_currencies(&self) -> BTreeMap<&'static str, CurrencyInfo> {
        Currency::ALL
            .into_iter()
            .filter(|c| self.rates.contains(*c))
            .map(|c| (c.code(), c.info()))
            .collect()
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(RateTable::default())
    }
}
