use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::QUANTITY_THRESHOLD;

/// Shares below this magnitude are treated as zero.
pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// Ledger cell identity: one running lot per account and security.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct LotKey {
    pub account_id: String,
    pub symbol: String,
}

impl LotKey {
    pub fn new(account_id: &str, symbol: &str) -> Self {
        LotKey {
            account_id: account_id.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotState {
    Flat,
    Long,
    Short,
}

/// Direction of a trade leg as seen by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Mutable running lot for one (account, symbol). Created lazily, never removed;
/// it may pass through zero any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenLot {
    pub key: LotKey,
    pub currency: String,
    /// Positive when long, negative when short.
    pub shares: Decimal,
    /// None while flat.
    pub avg_price: Option<Decimal>,
    pub open_date: Option<NaiveDate>,
    /// Indices into the owning ledger's transaction arena, oldest first.
    pub pending_transactions: Vec<usize>,
}

impl OpenLot {
    pub fn new(key: LotKey, currency: &str) -> Self {
        OpenLot {
            key,
            currency: currency.to_string(),
            shares: Decimal::ZERO,
            avg_price: None,
            open_date: None,
            pending_transactions: Vec::new(),
        }
    }

    pub fn state(&self) -> LotState {
        if self.shares.is_zero() {
            LotState::Flat
        } else if self.shares.is_sign_positive() {
            LotState::Long
        } else {
            LotState::Short
        }
    }

    /// Whether a trade on `side` reduces this lot rather than extending it.
    pub fn is_opposed_by(&self, side: TradeSide) -> bool {
        matches!(
            (self.state(), side),
            (LotState::Long, TradeSide::Sell) | (LotState::Short, TradeSide::Buy)
        )
    }

    /// `shares * avg_price` in the lot currency; negative for shorts, None while flat.
    pub fn book_value(&self) -> Option<Decimal> {
        self.avg_price.map(|avg| self.shares * avg)
    }

    pub(crate) fn reset(&mut self) {
        self.shares = Decimal::ZERO;
        self.avg_price = None;
        self.open_date = None;
        self.pending_transactions.clear();
    }
}

/// Reporting snapshot of a non-flat lot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    pub account_id: String,
    pub symbol: String,
    pub currency: String,
    pub shares: Decimal,
    pub avg_price: Decimal,
    pub open_date: NaiveDate,
    /// `shares * avg_price` in the position currency.
    pub book_value: Decimal,
    pub pending_transactions: Vec<String>,
}

/// A realized match between an opening leg and a closing leg. Immutable once emitted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPosition {
    pub account_id: String,
    pub symbol: String,
    pub currency: String,
    pub closed_shares: Decimal,
    pub buy_date: NaiveDate,
    pub buy_price: Decimal,
    pub sell_date: NaiveDate,
    pub sell_price: Decimal,
    /// `closed_shares * buy_price` in base currency as of `buy_date`.
    pub buy_cost_base: Decimal,
    /// `closed_shares * sell_price` in base currency as of `sell_date`.
    pub sell_cost_base: Decimal,
    #[serde(rename = "realizedPnL")]
    pub realized_pnl: Decimal,
    /// Percent of `buy_cost_base`; None when the buy leg cost nothing.
    #[serde(rename = "realizedPnLRatio")]
    pub realized_pnl_ratio: Option<Decimal>,
    pub contributing_transactions: Vec<String>,
}

impl ClosedPosition {
    /// False when both legs priced the same after rounding (a wash, e.g. a transfer).
    pub fn has_economic_gain(&self, precision: u32) -> bool {
        self.buy_price.round_dp(precision) != self.sell_price.round_dp(precision)
    }
}

/// Totals over reportable closed positions, in base currency.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealizedSummary {
    pub positions: usize,
    pub buy_cost_base: Decimal,
    pub sell_cost_base: Decimal,
    #[serde(rename = "realizedPnL")]
    pub realized_pnl: Decimal,
}

/// Everything the ledger produced for one transaction history.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReport {
    /// Every closing event, in processing order.
    pub closed_positions: Vec<ClosedPosition>,
    pub open_positions: Vec<OpenPosition>,
    pub price_precision: u32,
}

impl LedgerReport {
    /// Closed positions that carry an economic gain or loss.
    pub fn realized_positions(&self) -> impl Iterator<Item = &ClosedPosition> + '_ {
        let precision = self.price_precision;
        self.closed_positions
            .iter()
            .filter(move |position| position.has_economic_gain(precision))
    }

    pub fn realized_summary(&self) -> RealizedSummary {
        self.realized_positions()
            .fold(RealizedSummary::default(), |mut summary, position| {
                summary.positions += 1;
                summary.buy_cost_base += position.buy_cost_base;
                summary.sell_cost_base += position.sell_cost_base;
                summary.realized_pnl += position.realized_pnl;
                summary
            })
    }

    pub fn open_position(&self, account_id: &str, symbol: &str) -> Option<&OpenPosition> {
        self.open_positions
            .iter()
            .find(|p| p.account_id == account_id && p.symbol == symbol)
    }
}
