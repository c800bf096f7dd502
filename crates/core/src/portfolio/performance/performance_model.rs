use chrono::NaiveDate;
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One dated, signed flow of an XIRR schedule. Seen from the investor: money put in is
/// negative, money taken out (and the terminal valuation) is positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowEvent {
    pub when: NaiveDate,
    pub amount: Decimal,
}

impl CashFlowEvent {
    pub fn new(when: NaiveDate, amount: Decimal) -> Self {
        CashFlowEvent { when, amount }
    }
}

/// Why no rate could be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum XirrFailure {
    EmptySchedule,
    /// All flows share one sign, so no rate zeroes the NPV.
    NoSignChange,
    DidNotConverge,
}

/// Result of the XIRR root finder. Never an error: callers show a neutral value when
/// the rate is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum XirrOutcome {
    Converged { rate: f64, iterations: u32 },
    NonConvergent { reason: XirrFailure },
}

impl XirrOutcome {
    pub fn rate(&self) -> Option<f64> {
        match self {
            XirrOutcome::Converged { rate, .. } => Some(*rate),
            XirrOutcome::NonConvergent { .. } => None,
        }
    }

    /// Annualized rate as a decimal fraction (0.1 = 10%).
    pub fn rate_decimal(&self) -> Option<Decimal> {
        self.rate().and_then(Decimal::from_f64)
    }
}
