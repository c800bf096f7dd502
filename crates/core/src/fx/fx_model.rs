use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::fx::fx_errors::FxError;

/// Rate history per currency: currency -> (date -> multiplier into the base currency).
pub type RateTable = HashMap<String, BTreeMap<NaiveDate, Decimal>>;

/// One observation of a currency's multiplier into the base currency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub currency: String,
    pub date: NaiveDate,
    pub rate: Decimal,
}

impl ExchangeRate {
    pub fn new(currency: &str, date: NaiveDate, rate: Decimal) -> Self {
        ExchangeRate {
            currency: normalize_currency_code(currency),
            date,
            rate,
        }
    }
}

/// Canonical form of a currency code: trimmed, upper case.
pub fn normalize_currency_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Parses the feed shape of a rate table: currency -> ("YYYY-MM-DD" -> rate).
pub fn parse_rate_table(table: &HashMap<String, HashMap<String, Decimal>>) -> Result<RateTable, FxError> {
    let mut parsed: RateTable = HashMap::new();
    for (currency, history) in table {
        let code = normalize_currency_code(currency);
        if code.is_empty() {
            return Err(FxError::InvalidCurrencyCode(currency.clone()));
        }
        let series = parsed.entry(code).or_default();
        for (date_str, rate) in history {
            let date = NaiveDate::from_str(date_str.trim()).map_err(|_| FxError::InvalidRateDate {
                currency: currency.clone(),
                date: date_str.clone(),
            })?;
            series.insert(date, *rate);
        }
    }
    Ok(parsed)
}
