//! Core error types for the analytics engine.
//!
//! The pipeline itself is total: bad records are filtered and logged rather than
//! surfaced. These errors only come out of explicit parsing and configuration
//! entry points.

use thiserror::Error;

use crate::activities::ActivityError;
use crate::fx::FxError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the analytics engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Activity error: {0}")]
    Activity(#[from] ActivityError),

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),
}

/// Validation errors for user input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
