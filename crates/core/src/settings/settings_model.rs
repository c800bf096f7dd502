use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_CURRENCY, DEFAULT_INTERNAL_TRANSFER_CODES, DISPLAY_DECIMAL_PRECISION,
    XIRR_INITIAL_GUESS, XIRR_MAX_ITERATIONS, XIRR_TOLERANCE,
};
use crate::errors::{Result, ValidationError};

/// Tunables of the analytics engine.
///
/// Every field has a default, so a partial JSON document (or `{}`) is a valid
/// configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSettings {
    pub base_currency: String,
    /// Transfer origin types that denote internal FX/journal moves.
    pub internal_transfer_codes: Vec<String>,
    /// Decimal places used when deciding that a closed position carried no gain.
    pub price_precision: u32,
    pub xirr: XirrSettings,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            internal_transfer_codes: DEFAULT_INTERNAL_TRANSFER_CODES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            price_precision: DISPLAY_DECIMAL_PRECISION,
            xirr: XirrSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct XirrSettings {
    pub tolerance: f64,
    pub max_iterations: u32,
    pub initial_guess: f64,
}

impl Default for XirrSettings {
    fn default() -> Self {
        Self {
            tolerance: XIRR_TOLERANCE,
            max_iterations: XIRR_MAX_ITERATIONS,
            initial_guess: XIRR_INITIAL_GUESS,
        }
    }
}

impl AnalyticsSettings {
    /// Parses and validates settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: AnalyticsSettings = serde_json::from_str(json)?;
        let base_currency = parsed.base_currency.clone();
        let settings = parsed.with_base_currency(&base_currency);
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_base_currency(mut self, base_currency: &str) -> Self {
        self.base_currency = base_currency.trim().to_uppercase();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let code = self.base_currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidInput(format!(
                "base currency must be a 3-letter code, got '{}'",
                self.base_currency
            ))
            .into());
        }
        if !(self.xirr.tolerance.is_finite() && self.xirr.tolerance > 0.0) {
            return Err(ValidationError::InvalidInput(format!(
                "xirr tolerance must be positive, got {}",
                self.xirr.tolerance
            ))
            .into());
        }
        if self.xirr.max_iterations == 0 {
            return Err(ValidationError::InvalidInput(
                "xirr maxIterations must be at least 1".to_string(),
            )
            .into());
        }
        if !self.xirr.initial_guess.is_finite() || self.xirr.initial_guess <= -1.0 {
            return Err(ValidationError::InvalidInput(format!(
                "xirr initialGuess must be greater than -1, got {}",
                self.xirr.initial_guess
            ))
            .into());
        }
        Ok(())
    }

    /// Whether a transfer origin type is one of the configured internal codes.
    pub fn is_internal_transfer_code(&self, origin_type: &str) -> bool {
        self.internal_transfer_codes
            .iter()
            .any(|code| code.eq_ignore_ascii_case(origin_type.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let settings = AnalyticsSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, AnalyticsSettings::default());
        assert_eq!(settings.base_currency, "USD");
        assert_eq!(settings.price_precision, 2);
    }

    #[test]
    fn test_partial_document_overrides_fields() {
        let settings = AnalyticsSettings::from_json_str(
            r#"{"baseCurrency":"CAD","xirr":{"maxIterations":50}}"#,
        )
        .unwrap();
        assert_eq!(settings.base_currency, "CAD");
        assert_eq!(settings.xirr.max_iterations, 50);
        assert_eq!(settings.xirr.tolerance, XIRR_TOLERANCE);
    }

    #[test]
    fn test_base_currency_from_document_is_normalized() {
        let settings = AnalyticsSettings::from_json_str(r#"{"baseCurrency":"cad"}"#).unwrap();
        assert_eq!(settings.base_currency, "CAD");
    }

    #[test]
    fn test_rejects_invalid_base_currency() {
        assert!(AnalyticsSettings::from_json_str(r#"{"baseCurrency":"DOLLARS"}"#).is_err());
    }

    #[test]
    fn test_rejects_zero_iteration_cap() {
        assert!(AnalyticsSettings::from_json_str(r#"{"xirr":{"maxIterations":0}}"#).is_err());
    }

    #[test]
    fn test_internal_transfer_code_is_case_insensitive() {
        let settings = AnalyticsSettings::default();
        assert!(settings.is_internal_transfer_code("fxt"));
        assert!(settings.is_internal_transfer_code(" JRN "));
        assert!(!settings.is_internal_transfer_code("TFI"));
    }

    #[test]
    fn test_with_base_currency_normalizes_code() {
        let settings = AnalyticsSettings::default().with_base_currency(" eur ");
        assert_eq!(settings.base_currency, "EUR");
    }
}
