//! Cost-basis ledger: per (account, symbol) running lots and the closed positions they emit.

mod ledger_model;
mod position_ledger;

pub use ledger_model::*;
pub use position_ledger::*;
