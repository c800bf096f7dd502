use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position record as the host platform reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionInput {
    #[serde(alias = "account")]
    pub account_id: String,
    pub symbol: String,
    pub currency: String,
    pub quantity: Decimal,
    /// Native-currency market value.
    pub market_value: Decimal,
    /// Date the market value was observed; the report's valuation date when absent.
    #[serde(default)]
    pub valuation_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonetaryValue {
    pub local: Decimal,
    pub base: Decimal,
}

/// Position annotated with cost basis and returns. Every derived figure is None when it
/// cannot be computed (no matching lot, zero book value, XIRR unavailable).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub account_id: String,
    pub symbol: String,
    pub currency: String,
    pub quantity: Decimal,
    pub market_value: MonetaryValue,
    pub book_value: Option<MonetaryValue>,
    /// Base-currency market value minus base-currency book value.
    pub gain_amount: Option<Decimal>,
    /// Percent of book value.
    pub gain_percent: Option<Decimal>,
    pub xirr: Option<Decimal>,
}
