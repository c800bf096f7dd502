//! Cash-flow classification and per-date folding.
//!
//! Every amount is converted to the base currency on its own date before it is bucketed.

use crate::activities::{Transaction, TransactionType};
use crate::fx::CurrencyConverter;
use crate::portfolio::cash_flow::cash_flow_model::{CashFlowKind, DailyCashFlow};
use crate::settings::AnalyticsSettings;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Classify the cash leg of a transaction.
///
/// Transfers count as external flows when they move securities between accounts, or
/// when they are pure external cash moves: no security reference and an origin type that
/// is not one of the internal FX/journal codes. Inbound transfers land in the deposit
/// bucket, outbound ones in the withdrawal bucket. Trades, splits and reinvestments have no
/// external cash leg and return None.
pub fn classify_cash_flow(tx: &Transaction, settings: &AnalyticsSettings) -> Option<CashFlowKind> {
    match tx.transaction_type {
        TransactionType::Deposit => Some(CashFlowKind::Deposit),
        TransactionType::Withdrawal => Some(CashFlowKind::Withdrawal),
        TransactionType::Transfer => {
            let internal = tx
                .origin_type
                .as_deref()
                .map(|code| settings.is_internal_transfer_code(code))
                .unwrap_or(false);
            if tx.is_security_transfer || (!internal && !tx.has_security()) {
                Some(CashFlowKind::Deposit)
            } else {
                None
            }
        }
        TransactionType::Fee
        | TransactionType::Interest
        | TransactionType::Tax
        | TransactionType::Income
        | TransactionType::Dividend
        | TransactionType::Distribution => Some(CashFlowKind::Income),
        TransactionType::Buy
        | TransactionType::Sell
        | TransactionType::Split
        | TransactionType::Reinvest => None,
    }
}

/// Folds transactions into `DailyCashFlow` buckets keyed by date.
#[derive(Debug, Default)]
pub struct CashFlowAggregator {
    days: BTreeMap<NaiveDate, DailyCashFlow>,
}

impl CashFlowAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tx: &Transaction, settings: &AnalyticsSettings, fx: &CurrencyConverter) {
        let kind = match classify_cash_flow(tx, settings) {
            Some(kind) => kind,
            None => return,
        };
        let amount = fx.convert_on(&tx.currency, tx.currency_amount, tx.date);
        if amount.is_zero() {
            return;
        }

        let day = self
            .days
            .entry(tx.date)
            .or_insert_with(|| DailyCashFlow::new(tx.date));
        match (kind, tx.transaction_type) {
            (CashFlowKind::Deposit, TransactionType::Transfer) => {
                let inbound = inbound_transfer_value(tx, amount);
                if inbound.is_sign_negative() {
                    day.withdrawal += inbound.abs();
                } else {
                    day.deposit += inbound;
                }
            }
            (CashFlowKind::Deposit, _) => day.deposit += amount.abs(),
            (CashFlowKind::Withdrawal, _) => day.withdrawal += amount.abs(),
            (CashFlowKind::Income, _) if amount > Decimal::ZERO => day.income += amount,
            (CashFlowKind::Income, _) => day.interest += amount.abs(),
        }
        debug!("Bucketed {} {} on {} as {:?}", tx.transaction_type, tx.id, tx.date, kind);
    }

    pub fn extend<'a>(
        &mut self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
        settings: &AnalyticsSettings,
        fx: &CurrencyConverter,
    ) {
        for tx in transactions {
            self.add(tx, settings, fx);
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyCashFlow> {
        self.days.get(&date)
    }

    /// Buckets ordered by date.
    pub fn into_daily_flows(self) -> Vec<DailyCashFlow> {
        self.days
            .into_values()
            .filter(|day| !day.is_empty())
            .collect()
    }
}

/// Value a transfer brings into the portfolio, negative when value leaves. Cash transfers
/// carry it directly in their amount; security transfers follow trade signs, where
/// receiving shares is negative.
fn inbound_transfer_value(tx: &Transaction, amount: Decimal) -> Decimal {
    if tx.is_security_transfer {
        -amount
    } else {
        amount
    }
}

/// Convenience fold over a full transaction list.
pub fn aggregate_cash_flows(
    transactions: &[Transaction],
    settings: &AnalyticsSettings,
    fx: &CurrencyConverter,
) -> Vec<DailyCashFlow> {
    let mut aggregator = CashFlowAggregator::new();
    aggregator.extend(transactions, settings, fx);
    aggregator.into_daily_flows()
}
