//! Builds XIRR schedules from aggregated cash flows and valuations.

use crate::fx::CurrencyConverter;
use crate::portfolio::cash_flow::DailyCashFlow;
use crate::portfolio::performance::performance_model::{CashFlowEvent, XirrFailure, XirrOutcome};
use crate::portfolio::performance::xirr::solve_xirr;
use crate::settings::XirrSettings;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Portfolio-level schedule: one event per date with a nonzero net external flow
/// (`withdrawal - deposit`), then the last valuation as a positive terminal event.
///
/// Returns None when there is no valuation to close the schedule with.
pub fn build_portfolio_schedule(
    daily_flows: &[DailyCashFlow],
    valuations: &BTreeMap<NaiveDate, Decimal>,
    valuation_currency: &str,
    fx: &CurrencyConverter,
) -> Option<Vec<CashFlowEvent>> {
    let (last_date, last_value) = valuations.iter().next_back()?;

    let mut events: Vec<CashFlowEvent> = daily_flows
        .iter()
        .filter(|day| day.date <= *last_date)
        .filter_map(|day| {
            let net = day.net_external_flow();
            (!net.is_zero()).then(|| CashFlowEvent::new(day.date, net))
        })
        .collect();

    let terminal = fx.convert_on(valuation_currency, *last_value, *last_date);
    events.push(CashFlowEvent::new(*last_date, terminal));
    debug!(
        "Portfolio XIRR schedule has {} events ending {} at {}",
        events.len(),
        last_date,
        terminal
    );
    Some(events)
}

/// Money-weighted return of the whole portfolio.
pub fn portfolio_xirr(
    daily_flows: &[DailyCashFlow],
    valuations: &BTreeMap<NaiveDate, Decimal>,
    valuation_currency: &str,
    fx: &CurrencyConverter,
    settings: &XirrSettings,
) -> XirrOutcome {
    let events = match build_portfolio_schedule(daily_flows, valuations, valuation_currency, fx) {
        Some(events) => events,
        None => {
            debug!("No valuation available; portfolio XIRR unavailable");
            return XirrOutcome::NonConvergent { reason: XirrFailure::EmptySchedule };
        }
    };

    let outcome = solve_xirr(&events, settings);
    if let XirrOutcome::NonConvergent { reason } = outcome {
        warn!("Portfolio XIRR unavailable: {:?}", reason);
    }
    outcome
}
