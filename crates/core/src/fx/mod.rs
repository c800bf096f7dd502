//! FX (Foreign Exchange) module - rate tables and base-currency conversion.

pub mod currency_converter;
mod fx_cache;
mod fx_errors;
mod fx_model;

pub use currency_converter::{CurrencyConverter, RateSource};
pub use fx_cache::SharedCurrencyConverter;
pub use fx_errors::FxError;
pub use fx_model::{normalize_currency_code, parse_rate_table, ExchangeRate, RateTable};
