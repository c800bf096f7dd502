//! Per-date cash-flow buckets, independent of security positions.

mod cash_flow_aggregator;
mod cash_flow_model;

pub use cash_flow_aggregator::*;
pub use cash_flow_model::*;
