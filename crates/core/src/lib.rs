//! Folio Analytics Core - cost basis, realized P&L and money-weighted returns.
//!
//! Turns a brokerage transaction feed into closed positions, per-date cash flows and
//! XIRR figures. Performs no I/O: the feed, valuations and FX history are handed in,
//! the report is handed back.

pub mod activities;
pub mod constants;
pub mod context;
pub mod errors;
pub mod fx;
pub mod portfolio;
pub mod settings;

pub use context::AnalyticsContext;
pub use portfolio::*;
pub use settings::AnalyticsSettings;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
