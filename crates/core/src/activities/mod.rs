//! Transactions: feed records, the normalized model and the normalizer.

mod activities_constants;
mod activities_errors;
mod activities_model;
mod normalizer;

pub use activities_constants::*;
pub use activities_errors::ActivityError;
pub use activities_model::*;
pub use normalizer::*;
