//! Explicit analytics context, passed by reference instead of ambient globals.

use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::fx::{CurrencyConverter, SharedCurrencyConverter};
use crate::settings::AnalyticsSettings;

/// Validated settings plus the FX snapshot every computation of one run reads from.
#[derive(Debug, Clone)]
pub struct AnalyticsContext {
    settings: AnalyticsSettings,
    fx: Arc<CurrencyConverter>,
}

impl AnalyticsContext {
    pub fn new(settings: AnalyticsSettings, fx: Arc<CurrencyConverter>) -> Result<Self> {
        settings.validate()?;
        if fx.base_currency() != settings.base_currency {
            return Err(Error::InvalidConfigValue(format!(
                "FX rates are quoted into {} but the base currency is {}",
                fx.base_currency(),
                settings.base_currency
            )));
        }
        Ok(Self { settings, fx })
    }

    /// For callers that already validated both halves.
    pub(crate) fn from_validated(settings: AnalyticsSettings, fx: Arc<CurrencyConverter>) -> Self {
        Self { settings, fx }
    }

    /// Context over the converter currently published by a shared cache.
    pub fn from_shared(settings: AnalyticsSettings, shared: &SharedCurrencyConverter) -> Result<Self> {
        Self::new(settings, shared.snapshot())
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    pub fn fx(&self) -> &CurrencyConverter {
        &self.fx
    }

    pub fn base_currency(&self) -> &str {
        &self.settings.base_currency
    }
}
