//! Money-weighted return solver.
//!
//! Finds `rate` with `Σ amount_i / (1 + rate)^(days_i / 365) = 0`, `days_i` counted from
//! the earliest event. Newton-Raphson runs first; when it stalls or leaves the domain
//! the root is bracketed and bisected.

use crate::constants::{DAYS_PER_YEAR, XIRR_MAX_RATE, XIRR_MIN_RATE};
use crate::portfolio::performance::performance_model::{CashFlowEvent, XirrFailure, XirrOutcome};
use crate::settings::XirrSettings;

use log::{debug, warn};
use num_traits::ToPrimitive;

/// Solves the schedule. Event order does not matter.
pub fn solve_xirr(events: &[CashFlowEvent], settings: &XirrSettings) -> XirrOutcome {
    let first_date = match events.iter().map(|event| event.when).min() {
        Some(date) => date,
        None => return XirrOutcome::NonConvergent { reason: XirrFailure::EmptySchedule },
    };

    let flows: Vec<(f64, f64)> = events
        .iter()
        .filter_map(|event| {
            let amount = event.amount.to_f64()?;
            let years = (event.when - first_date).num_days() as f64 / DAYS_PER_YEAR;
            Some((amount, years))
        })
        .filter(|(amount, _)| *amount != 0.0)
        .collect();

    let has_inflow = flows.iter().any(|(amount, _)| *amount > 0.0);
    let has_outflow = flows.iter().any(|(amount, _)| *amount < 0.0);
    if !has_inflow || !has_outflow {
        debug!("XIRR schedule of {} events has no sign change", events.len());
        return XirrOutcome::NonConvergent { reason: XirrFailure::NoSignChange };
    }

    if let Some(outcome) = newton(&flows, settings) {
        return outcome;
    }
    if let Some(outcome) = bisect(&flows, settings) {
        return outcome;
    }

    warn!(
        "XIRR did not converge over {} cash flows after {} iterations per phase",
        flows.len(),
        settings.max_iterations
    );
    XirrOutcome::NonConvergent { reason: XirrFailure::DidNotConverge }
}

/// Net present value and its derivative with respect to the rate.
fn npv_and_derivative(flows: &[(f64, f64)], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for (amount, years) in flows {
        let discount = (1.0 + rate).powf(*years);
        npv += amount / discount;
        // d/dr [cf / (1+r)^t] = -t * cf / (1+r)^(t+1)
        dnpv -= years * amount / (discount * (1.0 + rate));
    }
    (npv, dnpv)
}

fn npv(flows: &[(f64, f64)], rate: f64) -> f64 {
    npv_and_derivative(flows, rate).0
}

fn newton(flows: &[(f64, f64)], settings: &XirrSettings) -> Option<XirrOutcome> {
    let mut rate = settings.initial_guess;
    for iteration in 1..=settings.max_iterations {
        let (value, derivative) = npv_and_derivative(flows, rate);
        if !value.is_finite() || !derivative.is_finite() || derivative.abs() < f64::EPSILON {
            return None;
        }

        let next = rate - value / derivative;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - rate).abs() < settings.tolerance {
            return Some(XirrOutcome::Converged { rate: next, iterations: iteration });
        }
        rate = next;
    }
    None
}

fn bisect(flows: &[(f64, f64)], settings: &XirrSettings) -> Option<XirrOutcome> {
    let mut low = XIRR_MIN_RATE;
    let mut high = 1.0;
    let low_value = npv(flows, low);
    if low_value.is_nan() {
        return None;
    }

    // Grow the upper bound until the NPV changes sign
    while npv(flows, high).signum() == low_value.signum() {
        if high >= XIRR_MAX_RATE {
            return None;
        }
        high = (high * 2.0).min(XIRR_MAX_RATE);
    }

    for iteration in 1..=settings.max_iterations {
        let mid = (low + high) / 2.0;
        let mid_value = npv(flows, mid);
        if mid_value.abs() < settings.tolerance || (high - low) / 2.0 < settings.tolerance {
            return Some(XirrOutcome::Converged { rate: mid, iterations: iteration });
        }
        if mid_value.signum() == low_value.signum() {
            low = mid;
        } else {
            high = mid;
        }
    }
    None
}
