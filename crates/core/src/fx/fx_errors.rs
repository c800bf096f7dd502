use thiserror::Error;

#[derive(Error, Debug)]
pub enum FxError {
    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Invalid rate date '{date}' for {currency}: expected YYYY-MM-DD")]
    InvalidRateDate { currency: String, date: String },
}
