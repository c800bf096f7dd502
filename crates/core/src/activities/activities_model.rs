//! Transaction domain models.

use crate::activities::activities_constants::*;
use crate::activities::activities_errors::ActivityError;
use crate::fx::normalize_currency_code;
use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    /// "2-for-1", "2 for 1", "3:2" (new shares first, old shares second)
    static ref SPLIT_RATIO_REGEX: Regex =
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:-\s*for\s*-|for|:)\s*(\d+(?:\.\d+)?)")
            .expect("Invalid regex pattern");
}

/// Closed set of transaction types understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
    Split,
    Reinvest,
    Dividend,
    Distribution,
    Income,
    Interest,
    Fee,
    Tax,
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => TRANSACTION_TYPE_BUY,
            TransactionType::Sell => TRANSACTION_TYPE_SELL,
            TransactionType::Split => TRANSACTION_TYPE_SPLIT,
            TransactionType::Reinvest => TRANSACTION_TYPE_REINVEST,
            TransactionType::Dividend => TRANSACTION_TYPE_DIVIDEND,
            TransactionType::Distribution => TRANSACTION_TYPE_DISTRIBUTION,
            TransactionType::Income => TRANSACTION_TYPE_INCOME,
            TransactionType::Interest => TRANSACTION_TYPE_INTEREST,
            TransactionType::Fee => TRANSACTION_TYPE_FEE,
            TransactionType::Tax => TRANSACTION_TYPE_TAX,
            TransactionType::Deposit => TRANSACTION_TYPE_DEPOSIT,
            TransactionType::Withdrawal => TRANSACTION_TYPE_WITHDRAWAL,
            TransactionType::Transfer => TRANSACTION_TYPE_TRANSFER,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match canonical_type_label(s) {
            Some(TRANSACTION_TYPE_BUY) => Ok(TransactionType::Buy),
            Some(TRANSACTION_TYPE_SELL) => Ok(TransactionType::Sell),
            Some(TRANSACTION_TYPE_SPLIT) => Ok(TransactionType::Split),
            Some(TRANSACTION_TYPE_REINVEST) => Ok(TransactionType::Reinvest),
            Some(TRANSACTION_TYPE_DIVIDEND) => Ok(TransactionType::Dividend),
            Some(TRANSACTION_TYPE_DISTRIBUTION) => Ok(TransactionType::Distribution),
            Some(TRANSACTION_TYPE_INCOME) => Ok(TransactionType::Income),
            Some(TRANSACTION_TYPE_INTEREST) => Ok(TransactionType::Interest),
            Some(TRANSACTION_TYPE_FEE) => Ok(TransactionType::Fee),
            Some(TRANSACTION_TYPE_TAX) => Ok(TransactionType::Tax),
            Some(TRANSACTION_TYPE_DEPOSIT) => Ok(TransactionType::Deposit),
            Some(TRANSACTION_TYPE_WITHDRAWAL) => Ok(TransactionType::Withdrawal),
            Some(TRANSACTION_TYPE_TRANSFER) => Ok(TransactionType::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// Security reference attached to a feed record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRef {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "type")]
    pub security_type: Option<String>,
}

/// A transaction exactly as the host platform delivers it.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub id: String,
    pub date: String,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<String>,
    #[serde(alias = "account")]
    pub account_id: String,
    #[serde(default)]
    pub security: Option<SecurityRef>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Amount in the transaction currency.
    #[serde(default)]
    pub currency_amount: Option<Decimal>,
    /// Amount in the account's reporting currency.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Provider code of the originating operation (FX conversion, journal, ...).
    #[serde(default)]
    pub origin_type: Option<String>,
    #[serde(default)]
    pub is_security_transfer: bool,
    /// Old shares per new share.
    #[serde(default)]
    pub split_ratio: Option<Decimal>,
    #[serde(default)]
    pub deleted: bool,
}

/// A normalized transaction. Immutable once the normalizer hands it out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub account_id: String,
    pub symbol: Option<String>,
    pub transaction_type: TransactionType,
    pub currency: String,
    /// Share delta as delivered (sells and removal legs are usually negative).
    pub shares: Decimal,
    pub price_per_share: Decimal,
    pub currency_amount: Decimal,
    pub base_amount: Decimal,
    pub fee: Decimal,
    pub description: String,
    pub origin_type: Option<String>,
    pub is_security_transfer: bool,
    /// Old shares per new share; only meaningful for splits.
    pub split_ratio: Option<Decimal>,
}

impl Transaction {
    /// Converts a feed record. `base_currency` is the last-resort transaction currency.
    pub fn from_raw(raw: &RawTransaction, base_currency: &str) -> Result<Self, ActivityError> {
        if raw.deleted {
            return Err(ActivityError::Deleted(raw.id.clone()));
        }

        let label = raw
            .transaction_type
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .ok_or_else(|| ActivityError::MissingType(raw.id.clone()))?;
        let transaction_type =
            TransactionType::from_str(label).map_err(|_| ActivityError::UnsupportedType {
                id: raw.id.clone(),
                label: label.to_string(),
            })?;

        if raw.account_id.trim().is_empty() {
            return Err(ActivityError::MissingAccount(raw.id.clone()));
        }

        let date = parse_feed_date(&raw.date).ok_or_else(|| ActivityError::InvalidDate {
            id: raw.id.clone(),
            date: raw.date.clone(),
        })?;

        let symbol = raw
            .security
            .as_ref()
            .map(|security| security.symbol.trim().to_uppercase())
            .filter(|symbol| !symbol.is_empty());

        let currency = raw
            .currency
            .as_deref()
            .or_else(|| raw.security.as_ref().and_then(|s| s.currency.as_deref()))
            .map(normalize_currency_code)
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| normalize_currency_code(base_currency));

        let shares = raw.quantity.unwrap_or(Decimal::ZERO);
        let currency_amount = raw
            .currency_amount
            .or(raw.amount)
            .unwrap_or(Decimal::ZERO);
        let base_amount = raw.amount.unwrap_or(currency_amount);

        // Feeds sometimes omit the price of a fill but carry its total
        let price_per_share = match raw.price {
            Some(price) => price.abs(),
            None if !shares.is_zero() => (currency_amount / shares).abs(),
            None => Decimal::ZERO,
        };

        let description = raw.description.clone().unwrap_or_default();
        let split_ratio = match transaction_type {
            TransactionType::Split => raw
                .split_ratio
                .filter(|ratio| ratio.is_sign_positive() && !ratio.is_zero())
                .or_else(|| parse_split_ratio(&description).ok()),
            _ => None,
        };

        Ok(Transaction {
            id: raw.id.clone(),
            date,
            account_id: raw.account_id.trim().to_string(),
            symbol,
            transaction_type,
            currency,
            shares,
            price_per_share,
            currency_amount,
            base_amount,
            fee: raw.fee.unwrap_or(Decimal::ZERO),
            description,
            origin_type: raw
                .origin_type
                .as_ref()
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
            is_security_transfer: raw.is_security_transfer,
            split_ratio,
        })
    }

    /// Whether the transaction references a security.
    pub fn has_security(&self) -> bool {
        self.symbol.is_some()
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC date is used).
pub fn parse_feed_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(date_time.naive_utc().date());
    }
    None
}

/// Parses a split description into old shares per new share ("2-for-1" -> 0.5).
pub fn parse_split_ratio(description: &str) -> Result<Decimal, ActivityError> {
    let captures = SPLIT_RATIO_REGEX
        .captures(description)
        .ok_or_else(|| ActivityError::InvalidSplitRatio(description.to_string()))?;

    let parse = |index: usize| {
        captures
            .get(index)
            .and_then(|m| Decimal::from_str(m.as_str()).ok())
            .filter(|value| !value.is_zero())
            .ok_or_else(|| ActivityError::InvalidSplitRatio(description.to_string()))
    };
    let new_shares = parse(1)?;
    let old_shares = parse(2)?;
    Ok(old_shares / new_shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(id: &str, kind: &str) -> RawTransaction {
        RawTransaction {
            id: id.to_string(),
            date: "2023-04-03".to_string(),
            transaction_type: Some(kind.to_string()),
            account_id: "acc-1".to_string(),
            security: Some(SecurityRef {
                symbol: "xyz".to_string(),
                currency: Some("usd".to_string()),
                security_type: Some("equity".to_string()),
            }),
            quantity: Some(dec!(10)),
            price: Some(dec!(12.5)),
            currency_amount: Some(dec!(-125)),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_raw_normalizes_fields() {
        let tx = Transaction::from_raw(&raw("t1", "Buy"), "CAD").unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Buy);
        assert_eq!(tx.symbol.as_deref(), Some("XYZ"));
        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2023, 4, 3).unwrap());
        // base amount falls back to the currency amount
        assert_eq!(tx.base_amount, dec!(-125));
    }

    #[test]
    fn test_from_raw_derives_missing_price() {
        let mut record = raw("t1", "sell");
        record.price = None;
        record.quantity = Some(dec!(-4));
        record.currency_amount = Some(dec!(50));
        let tx = Transaction::from_raw(&record, "USD").unwrap();
        assert_eq!(tx.price_per_share, dec!(12.5));
    }

    #[test]
    fn test_from_raw_falls_back_to_base_currency() {
        let mut record = raw("t1", "deposit");
        record.security = None;
        let tx = Transaction::from_raw(&record, "cad").unwrap();
        assert_eq!(tx.currency, "CAD");
        assert!(!tx.has_security());
    }

    #[test]
    fn test_from_raw_rejects_untyped_deleted_and_unknown() {
        let mut untyped = raw("t1", "buy");
        untyped.transaction_type = None;
        assert_eq!(
            Transaction::from_raw(&untyped, "USD"),
            Err(ActivityError::MissingType("t1".to_string()))
        );

        let mut deleted = raw("t2", "buy");
        deleted.deleted = true;
        assert!(matches!(
            Transaction::from_raw(&deleted, "USD"),
            Err(ActivityError::Deleted(_))
        ));

        assert!(matches!(
            Transaction::from_raw(&raw("t3", "journal"), "USD"),
            Err(ActivityError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_from_raw_rejects_bad_date() {
        let mut record = raw("t1", "buy");
        record.date = "April 3rd".to_string();
        assert!(matches!(
            Transaction::from_raw(&record, "USD"),
            Err(ActivityError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_parse_feed_date_accepts_rfc3339() {
        assert_eq!(
            parse_feed_date("2023-04-03T23:30:00-02:00"),
            NaiveDate::from_ymd_opt(2023, 4, 4)
        );
        assert_eq!(parse_feed_date("2023-13-01"), None);
    }

    #[test]
    fn test_parse_split_ratio_variants() {
        assert_eq!(parse_split_ratio("2-for-1 stock split").unwrap(), dec!(0.5));
        assert_eq!(parse_split_ratio("Split 3 for 1").unwrap(), dec!(1) / dec!(3));
        assert_eq!(parse_split_ratio("reverse split 1:10").unwrap(), dec!(10));
        assert!(parse_split_ratio("corporate action").is_err());
        assert!(parse_split_ratio("0:1").is_err());
    }

    #[test]
    fn test_split_ratio_is_read_from_description() {
        let mut record = raw("t1", "split");
        record.description = Some("2 for 1 split".to_string());
        let tx = Transaction::from_raw(&record, "USD").unwrap();
        assert_eq!(tx.split_ratio, Some(dec!(0.5)));
    }

    #[test]
    fn test_transaction_type_display_round_trips() {
        for kind in [TransactionType::Buy, TransactionType::Transfer, TransactionType::Reinvest] {
            assert_eq!(TransactionType::from_str(&kind.to_string()), Ok(kind));
        }
    }
}
