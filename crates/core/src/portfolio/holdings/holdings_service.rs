//! Annotates host positions with ledger cost basis, unrealized gain and per-position XIRR.

use crate::activities::{Transaction, TransactionType};
use crate::constants::DECIMAL_PRECISION;
use crate::fx::{normalize_currency_code, CurrencyConverter};
use crate::portfolio::holdings::holdings_model::{MonetaryValue, PositionInput, PositionReport};
use crate::portfolio::ledger::{LedgerReport, LotKey};
use crate::portfolio::performance::{solve_xirr, CashFlowEvent, XirrOutcome};
use crate::settings::XirrSettings;

use chrono::NaiveDate;
use log::debug;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Trade cash flows of one (account, symbol) in base currency, each converted on its
/// trade date (buys negative, sells positive), closed by the terminal market value.
pub fn build_position_schedule<'a>(
    trades: impl IntoIterator<Item = &'a Transaction>,
    terminal_value: Decimal,
    valuation_date: NaiveDate,
    fx: &CurrencyConverter,
) -> Vec<CashFlowEvent> {
    let mut events: Vec<CashFlowEvent> = trades
        .into_iter()
        .filter(|tx| tx.date <= valuation_date)
        .filter_map(|tx| {
            // Direction comes from the type; feeds disagree on the sign of sell quantities
            let gross = tx.shares.abs() * tx.price_per_share;
            let amount = match tx.transaction_type {
                TransactionType::Buy => -gross,
                TransactionType::Sell => gross,
                _ => return None,
            };
            (!amount.is_zero())
                .then(|| CashFlowEvent::new(tx.date, fx.convert_on(&tx.currency, amount, tx.date)))
        })
        .collect();
    events.push(CashFlowEvent::new(valuation_date, terminal_value));
    events
}

/// Annotates each position. `valuation_date` applies to positions that carry no date of
/// their own; when both are missing latest FX rates are used and XIRR is skipped.
pub fn annotate_positions(
    positions: &[PositionInput],
    ledger: &LedgerReport,
    transactions: &[Transaction],
    valuation_date: Option<NaiveDate>,
    fx: &CurrencyConverter,
    settings: &XirrSettings,
) -> Vec<PositionReport> {
    let mut trades_by_key: HashMap<LotKey, Vec<&Transaction>> = HashMap::new();
    for tx in transactions {
        if let Some(symbol) = tx.symbol.as_deref() {
            trades_by_key
                .entry(LotKey::new(&tx.account_id, symbol))
                .or_default()
                .push(tx);
        }
    }

    positions
        .par_iter()
        .map(|position| {
            let key = LotKey::new(&position.account_id, &position.symbol.to_uppercase());
            let trades = trades_by_key.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            annotate_position(position, ledger, trades, valuation_date, fx, settings)
        })
        .collect()
}

fn annotate_position(
    position: &PositionInput,
    ledger: &LedgerReport,
    trades: &[&Transaction],
    valuation_date: Option<NaiveDate>,
    fx: &CurrencyConverter,
    settings: &XirrSettings,
) -> PositionReport {
    let on = position.valuation_date.or(valuation_date);
    let currency = normalize_currency_code(&position.currency);
    let symbol = position.symbol.to_uppercase();

    let market_value = MonetaryValue {
        local: position.market_value,
        base: fx.convert(&currency, position.market_value, on),
    };

    let book_value = ledger
        .open_position(&position.account_id, &symbol)
        .map(|lot| MonetaryValue {
            local: lot.book_value,
            base: fx.convert(&lot.currency, lot.book_value, on),
        });

    let gain_amount = book_value
        .as_ref()
        .map(|book| market_value.base - book.base);
    let gain_percent = match (&book_value, gain_amount) {
        (Some(book), Some(gain)) if !book.base.is_zero() => Some(
            (gain / book.base.abs() * Decimal::ONE_HUNDRED).round_dp(DECIMAL_PRECISION),
        ),
        _ => None,
    };

    let xirr = on.and_then(|date| {
        let events =
            build_position_schedule(trades.iter().copied(), market_value.base, date, fx);
        match solve_xirr(&events, settings) {
            outcome @ XirrOutcome::Converged { .. } => outcome
                .rate_decimal()
                .map(|rate| rate.round_dp(DECIMAL_PRECISION)),
            XirrOutcome::NonConvergent { reason } => {
                debug!(
                    "XIRR unavailable for {} in account {}: {:?}",
                    symbol, position.account_id, reason
                );
                None
            }
        }
    });

    PositionReport {
        account_id: position.account_id.clone(),
        symbol,
        currency,
        quantity: position.quantity,
        market_value,
        book_value,
        gain_amount,
        gain_percent,
        xirr,
    }
}
