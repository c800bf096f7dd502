use crate::fx::fx_errors::FxError;
use crate::fx::fx_model::{normalize_currency_code, parse_rate_table, ExchangeRate, RateTable};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Where a conversion multiplier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// Amount already in base currency, or zero.
    Identity,
    /// Rate recorded for the requested date.
    Exact,
    /// No rate on the requested date; the currency's most recent rate was used.
    Latest,
    /// Currency was never fetched; multiplier 1.0 was assumed.
    Fallback,
}

/// Converts amounts into the base currency using per-currency, date-indexed rates.
///
/// Lookups never fail. The chain is: exact date, then the currency's latest known
/// rate, then a 1.0 multiplier for currencies with no history at all. The latter is
/// an approximation, surfaced as `RateSource::Fallback`.
#[derive(Debug, Clone, Default)]
pub struct CurrencyConverter {
    base_currency: String,
    /// Key: currency code. Value: date -> multiplier into base.
    rates: RateTable,
    /// Rate at the largest date of each currency, rebuilt whenever `rates` is replaced.
    latest: HashMap<String, Decimal>,
}

impl CurrencyConverter {
    /// Creates a converter from a list of rate observations.
    pub fn new(base_currency: &str, exchange_rates: Vec<ExchangeRate>) -> Self {
        let mut table: RateTable = HashMap::new();
        for rate in exchange_rates {
            table
                .entry(normalize_currency_code(&rate.currency))
                .or_default()
                .insert(rate.date, rate.rate);
        }
        Self::from_table(base_currency, table)
    }

    /// Creates a converter from an already indexed table.
    pub fn from_table(base_currency: &str, table: RateTable) -> Self {
        let mut converter = CurrencyConverter {
            base_currency: normalize_currency_code(base_currency),
            rates: HashMap::new(),
            latest: HashMap::new(),
        };
        converter.replace_rates(table);
        converter
    }

    /// Creates a converter from the feed shape: currency -> ("YYYY-MM-DD" -> rate).
    pub fn from_string_table(
        base_currency: &str,
        table: &HashMap<String, HashMap<String, Decimal>>,
    ) -> Result<Self, FxError> {
        Ok(Self::from_table(base_currency, parse_rate_table(table)?))
    }

    /// Replaces the whole rate table and recomputes the latest rate per currency.
    /// Non-positive rates are dropped.
    pub fn replace_rates(&mut self, table: RateTable) {
        let mut rates: RateTable = HashMap::with_capacity(table.len());
        for (currency, history) in table {
            let code = normalize_currency_code(&currency);
            let series: BTreeMap<NaiveDate, Decimal> = history
                .into_iter()
                .filter(|(date, rate)| {
                    let valid = rate.is_sign_positive() && !rate.is_zero();
                    if !valid {
                        debug!("Dropping non-positive FX rate {} for {} on {}", rate, code, date);
                    }
                    valid
                })
                .collect();
            if !series.is_empty() {
                rates.entry(code).or_default().extend(series);
            }
        }

        self.latest = rates
            .iter()
            .filter_map(|(currency, series)| {
                series
                    .iter()
                    .next_back()
                    .map(|(_, rate)| (currency.clone(), *rate))
            })
            .collect();
        self.rates = rates;
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Whether any rate history exists for the currency.
    pub fn has_currency(&self, currency: &str) -> bool {
        self.rates.contains_key(&normalize_currency_code(currency))
    }

    /// Latest known rate of a currency, if it was ever fetched.
    pub fn latest_rate(&self, currency: &str) -> Option<Decimal> {
        self.latest.get(&normalize_currency_code(currency)).copied()
    }

    /// Resolves the multiplier for a currency as of a date (latest when `date` is None).
    pub fn rate_for(&self, currency: &str, date: Option<NaiveDate>) -> (Decimal, RateSource) {
        let code = normalize_currency_code(currency);
        if code.is_empty() || code == self.base_currency {
            return (Decimal::ONE, RateSource::Identity);
        }

        if let (Some(series), Some(on)) = (self.rates.get(&code), date) {
            if let Some(rate) = series.get(&on) {
                return (*rate, RateSource::Exact);
            }
        }

        match self.latest.get(&code) {
            Some(rate) => (*rate, RateSource::Latest),
            None => (Decimal::ONE, RateSource::Fallback),
        }
    }

    /// Converts `amount` expressed in `currency` into the base currency.
    pub fn convert(&self, currency: &str, amount: Decimal, date: Option<NaiveDate>) -> Decimal {
        if amount.is_zero() {
            return amount;
        }
        let (rate, source) = self.rate_for(currency, date);
        match source {
            RateSource::Identity | RateSource::Exact => {}
            RateSource::Latest => debug!(
                "No {} rate on {:?}; using latest known rate {}",
                currency, date, rate
            ),
            RateSource::Fallback => debug!(
                "No rate history for {}; converting {} at 1.0 into {}",
                currency, amount, self.base_currency
            ),
        }
        amount * rate
    }

    /// Converts on a specific date.
    pub fn convert_on(&self, currency: &str, amount: Decimal, date: NaiveDate) -> Decimal {
        self.convert(currency, amount, Some(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn make_converter() -> CurrencyConverter {
        CurrencyConverter::new(
            "CAD",
            vec![
                ExchangeRate::new("USD", d(2023, 1, 3), dec!(1.35)),
                ExchangeRate::new("USD", d(2023, 6, 1), dec!(1.34)),
                ExchangeRate::new("usd", d(2023, 3, 15), dec!(1.37)),
                ExchangeRate::new("EUR", d(2023, 2, 1), dec!(1.45)),
            ],
        )
    }

    #[test]
    fn test_base_currency_is_returned_unchanged() {
        let converter = make_converter();
        assert_eq!(
            converter.convert("CAD", dec!(100), Some(d(2023, 1, 3))),
            dec!(100)
        );
        assert_eq!(converter.convert("cad", dec!(100), None), dec!(100));
    }

    #[test]
    fn test_zero_amount_is_returned_unchanged() {
        let converter = make_converter();
        assert_eq!(converter.convert("USD", dec!(0), Some(d(2023, 1, 3))), dec!(0));
    }

    #[test]
    fn test_exact_date_match() {
        let converter = make_converter();
        assert_eq!(
            converter.convert("USD", dec!(100), Some(d(2023, 3, 15))),
            dec!(137.00)
        );
        assert_eq!(
            converter.rate_for("USD", Some(d(2023, 3, 15))).1,
            RateSource::Exact
        );
    }

    #[test]
    fn test_missing_date_falls_back_to_latest_rate() {
        let converter = make_converter();
        // 2023-03-16 has no entry; latest USD rate is the 2023-06-01 one
        let (rate, source) = converter.rate_for("USD", Some(d(2023, 3, 16)));
        assert_eq!(rate, dec!(1.34));
        assert_eq!(source, RateSource::Latest);
    }

    #[test]
    fn test_date_before_earliest_rate_uses_latest_rate() {
        let converter = make_converter();
        let converted = converter.convert("EUR", dec!(10), Some(d(1999, 1, 1)));
        assert_eq!(converted, dec!(14.50));
    }

    #[test]
    fn test_unknown_currency_falls_back_to_one() {
        let converter = make_converter();
        let (rate, source) = converter.rate_for("GBP", Some(d(2023, 1, 3)));
        assert_eq!(rate, Decimal::ONE);
        assert_eq!(source, RateSource::Fallback);
        assert_eq!(converter.convert("GBP", dec!(42), None), dec!(42));
    }

    #[test]
    fn test_latest_rate_uses_largest_date_key() {
        let converter = make_converter();
        assert_eq!(converter.latest_rate("USD"), Some(dec!(1.34)));
        assert_eq!(converter.latest_rate("EUR"), Some(dec!(1.45)));
        assert_eq!(converter.latest_rate("GBP"), None);
    }

    #[test]
    fn test_replace_rates_recomputes_latest() {
        let mut converter = make_converter();
        let mut table: RateTable = HashMap::new();
        table
            .entry("USD".to_string())
            .or_default()
            .insert(d(2024, 1, 2), dec!(1.32));
        converter.replace_rates(table);

        assert_eq!(converter.latest_rate("USD"), Some(dec!(1.32)));
        assert!(!converter.has_currency("EUR"));
        assert_eq!(converter.rate_for("EUR", None).1, RateSource::Fallback);
    }

    #[test]
    fn test_non_positive_rates_are_dropped() {
        let converter = CurrencyConverter::new(
            "USD",
            vec![
                ExchangeRate::new("JPY", d(2023, 1, 1), dec!(0.0075)),
                ExchangeRate::new("JPY", d(2023, 2, 1), dec!(0)),
            ],
        );
        assert_eq!(converter.latest_rate("JPY"), Some(dec!(0.0075)));
    }

    #[test]
    fn test_from_string_table_parses_dates() {
        let mut history = HashMap::new();
        history.insert("2023-01-03".to_string(), dec!(1.35));
        history.insert("2023-02-03".to_string(), dec!(1.36));
        let mut table = HashMap::new();
        table.insert("usd".to_string(), history);

        let converter = CurrencyConverter::from_string_table("CAD", &table).unwrap();
        assert_eq!(converter.latest_rate("USD"), Some(dec!(1.36)));
    }

    #[test]
    fn test_from_string_table_rejects_bad_date() {
        let mut history = HashMap::new();
        history.insert("03/01/2023".to_string(), dec!(1.35));
        let mut table = HashMap::new();
        table.insert("USD".to_string(), history);

        let result = CurrencyConverter::from_string_table("CAD", &table);
        assert!(matches!(result, Err(FxError::InvalidRateDate { .. })));
    }
}
