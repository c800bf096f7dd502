use crate::activities::{Transaction, TransactionType};
use crate::constants::DECIMAL_PRECISION;
use crate::fx::CurrencyConverter;
use crate::portfolio::ledger::ledger_model::{
    is_quantity_significant, ClosedPosition, LedgerReport, LotKey, OpenLot, OpenPosition,
    TradeSide,
};

use chrono::NaiveDate;
use log::{debug, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Cost-basis state machine over (account, symbol) lots.
///
/// Transactions must be applied in date order (ties in feed order). Every applied
/// transaction is kept in an arena; lots refer to their not-yet-closed legs by index.
#[derive(Debug, Default)]
pub struct PositionLedger {
    arena: Vec<Transaction>,
    lots: HashMap<LotKey, OpenLot>,
    closed: Vec<ClosedPosition>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one transaction. Returns the closed position it produced, if any.
    pub fn apply(
        &mut self,
        tx: &Transaction,
        fx: &CurrencyConverter,
    ) -> Option<&ClosedPosition> {
        let symbol = match tx.symbol.as_deref() {
            Some(symbol) => symbol,
            None => return None,
        };
        let key = LotKey::new(&tx.account_id, symbol);

        let closed_before = self.closed.len();
        match tx.transaction_type {
            TransactionType::Buy => self.trade(key, tx, TradeSide::Buy, tx.price_per_share, fx),
            TransactionType::Sell => {
                self.trade(key, tx, TradeSide::Sell, tx.price_per_share, fx)
            }
            TransactionType::Split => self.split(key, tx),
            TransactionType::Reinvest
            | TransactionType::Dividend
            | TransactionType::Distribution => {
                // Cash side was already counted as income; new shares come in at no cost
                if tx.shares.is_sign_positive() && !tx.shares.is_zero() {
                    self.trade(key, tx, TradeSide::Buy, Decimal::ZERO, fx);
                }
            }
            TransactionType::Transfer => {
                if tx.is_security_transfer {
                    self.security_transfer(key, tx, fx);
                }
            }
            TransactionType::Income
            | TransactionType::Interest
            | TransactionType::Fee
            | TransactionType::Tax
            | TransactionType::Deposit
            | TransactionType::Withdrawal => {}
        }

        if self.closed.len() > closed_before {
            self.closed.last()
        } else {
            None
        }
    }

    pub fn lot(&self, account_id: &str, symbol: &str) -> Option<&OpenLot> {
        self.lots.get(&LotKey::new(account_id, symbol))
    }

    /// Non-flat lots, ordered by key.
    pub fn open_lots(&self) -> Vec<&OpenLot> {
        let mut lots: Vec<&OpenLot> = self
            .lots
            .values()
            .filter(|lot| !lot.shares.is_zero())
            .collect();
        lots.sort_by(|a, b| a.key.cmp(&b.key));
        lots
    }

    /// Transactions still contributing to a lot (opened or extended it since it was last flat).
    pub fn pending_transactions<'a>(
        &'a self,
        lot: &'a OpenLot,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        lot.pending_transactions
            .iter()
            .filter_map(move |&index| self.arena.get(index))
    }

    pub fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Running book value of all open lots in base currency, valued as of `on`
    /// (latest rates when None).
    pub fn book_value(&self, fx: &CurrencyConverter, on: Option<NaiveDate>) -> Decimal {
        self.lots
            .values()
            .filter_map(|lot| {
                lot.book_value()
                    .map(|value| fx.convert(&lot.currency, value, on))
            })
            .sum()
    }

    pub fn open_positions(&self) -> Vec<OpenPosition> {
        self.open_lots()
            .into_iter()
            .filter_map(|lot| {
                let avg_price = lot.avg_price?;
                let open_date = lot.open_date?;
                Some(OpenPosition {
                    account_id: lot.key.account_id.clone(),
                    symbol: lot.key.symbol.clone(),
                    currency: lot.currency.clone(),
                    shares: lot.shares,
                    avg_price,
                    open_date,
                    book_value: lot.shares * avg_price,
                    pending_transactions: self
                        .pending_transactions(lot)
                        .map(|tx| tx.id.clone())
                        .collect(),
                })
            })
            .collect()
    }

    fn record(&mut self, tx: &Transaction) -> usize {
        self.arena.push(tx.clone());
        self.arena.len() - 1
    }

    /// Inter-account security move: the sending side sells, the receiving side buys.
    fn security_transfer(&mut self, key: LotKey, tx: &Transaction, fx: &CurrencyConverter) {
        if tx.base_amount.is_sign_negative() && !tx.base_amount.is_zero() {
            self.trade(key, tx, TradeSide::Buy, tx.price_per_share, fx);
        } else if !tx.base_amount.is_zero() {
            self.trade(key, tx, TradeSide::Sell, tx.price_per_share, fx);
        } else {
            warn!(
                "Security transfer {} for {} in account {} has a zero amount; direction is ambiguous, skipping",
                tx.id, key.symbol, key.account_id
            );
        }
    }

    fn trade(
        &mut self,
        key: LotKey,
        tx: &Transaction,
        side: TradeSide,
        price: Decimal,
        fx: &CurrencyConverter,
    ) {
        let quantity = tx.shares.abs();
        if !is_quantity_significant(&quantity) {
            debug!("Transaction {} moves no shares; ledger unchanged", tx.id);
            return;
        }
        let delta = match side {
            TradeSide::Buy => quantity,
            TradeSide::Sell => -quantity,
        };

        let index = self.record(tx);
        let lot = self
            .lots
            .entry(key.clone())
            .or_insert_with(|| OpenLot::new(key, &tx.currency));

        if !lot.is_opposed_by(side) {
            Self::extend(lot, tx, delta, price, index);
            return;
        }

        let closed = Self::close(lot, &self.arena, tx, side, delta, price, index, fx);
        self.closed.push(closed);
    }

    /// Opens a flat lot or grows a lot in the same direction.
    fn extend(lot: &mut OpenLot, tx: &Transaction, delta: Decimal, price: Decimal, index: usize) {
        let new_shares = lot.shares + delta;
        lot.avg_price = Some(match lot.avg_price {
            Some(avg) if !lot.shares.is_zero() => (avg * lot.shares + price * delta) / new_shares,
            _ => price,
        });
        if lot.shares.is_zero() {
            lot.open_date = Some(tx.date);
            lot.currency = tx.currency.clone();
        }
        lot.shares = new_shares;
        lot.pending_transactions.push(index);
    }

    /// Matches an opposing trade against the lot and emits the realized leg.
    #[allow(clippy::too_many_arguments)]
    fn close(
        lot: &mut OpenLot,
        arena: &[Transaction],
        tx: &Transaction,
        side: TradeSide,
        delta: Decimal,
        price: Decimal,
        index: usize,
        fx: &CurrencyConverter,
    ) -> ClosedPosition {
        let open_shares = lot.shares;
        let open_price = lot.avg_price.unwrap_or(Decimal::ZERO);
        let open_date = lot.open_date.unwrap_or(tx.date);
        let closed_shares = open_shares.abs().min(delta.abs());

        // (date, price, currency) of each leg
        let lot_leg = (open_date, open_price, lot.currency.as_str());
        let tx_leg = (tx.date, price, tx.currency.as_str());
        let (buy, sell) = match side {
            TradeSide::Buy => (tx_leg, lot_leg),
            TradeSide::Sell => (lot_leg, tx_leg),
        };

        let buy_cost_base = fx.convert_on(buy.2, closed_shares * buy.1, buy.0);
        let sell_cost_base = fx.convert_on(sell.2, closed_shares * sell.1, sell.0);
        let realized_pnl = sell_cost_base - buy_cost_base;
        let realized_pnl_ratio = if buy_cost_base.is_zero() {
            None
        } else {
            Some(realized_pnl / buy_cost_base * Decimal::ONE_HUNDRED)
        };

        let mut contributing_transactions: Vec<String> = lot
            .pending_transactions
            .iter()
            .filter_map(|&i| arena.get(i).map(|t| t.id.clone()))
            .collect();
        contributing_transactions.push(tx.id.clone());

        let closed = ClosedPosition {
            account_id: lot.key.account_id.clone(),
            symbol: lot.key.symbol.clone(),
            currency: lot.currency.clone(),
            closed_shares,
            buy_date: buy.0,
            buy_price: buy.1,
            sell_date: sell.0,
            sell_price: sell.1,
            buy_cost_base,
            sell_cost_base,
            realized_pnl,
            realized_pnl_ratio,
            contributing_transactions,
        };

        let remaining = open_shares + delta;
        if !is_quantity_significant(&remaining) {
            lot.reset();
        } else if remaining.is_sign_negative() != open_shares.is_sign_negative() {
            // Excess opens a new position in the opposite direction
            lot.shares = remaining;
            lot.avg_price = Some(price);
            lot.open_date = Some(tx.date);
            lot.currency = tx.currency.clone();
            lot.pending_transactions = vec![index];
        } else {
            lot.shares = remaining;
            lot.pending_transactions.push(index);
        }

        closed
    }

    /// Applies the removal leg of a split; the addition leg is ignored.
    fn split(&mut self, key: LotKey, tx: &Transaction) {
        if !tx.shares.is_sign_negative() || tx.shares.is_zero() {
            debug!("Split {} is an addition leg; ignored", tx.id);
            return;
        }
        let ratio = match tx.split_ratio {
            Some(ratio) if ratio.is_sign_positive() && !ratio.is_zero() => ratio,
            _ => {
                warn!(
                    "Split {} for {} has no usable ratio ('{}'); skipping",
                    tx.id, key.symbol, tx.description
                );
                return;
            }
        };
        let has_position = self
            .lots
            .get(&key)
            .map(|lot| !lot.shares.is_zero())
            .unwrap_or(false);
        if !has_position {
            debug!("Split {} for {} applies to a flat lot; ignored", tx.id, key.symbol);
            return;
        }

        let index = self.record(tx);
        if let Some(lot) = self.lots.get_mut(&key) {
            // Ratios like 2/3 are inexact; round away the residue before flooring
            let split_shares = (lot.shares.abs() / ratio)
                .round_dp(DECIMAL_PRECISION)
                .floor();
            lot.shares = if lot.shares.is_sign_negative() {
                -split_shares
            } else {
                split_shares
            };
            lot.avg_price = lot.avg_price.map(|avg| avg * ratio);
            lot.pending_transactions.push(index);
            if lot.shares.is_zero() {
                lot.reset();
            }
        }
    }

    fn into_parts(self) -> (Vec<ClosedPosition>, Vec<OpenPosition>) {
        let open = self.open_positions();
        (self.closed, open)
    }
}

/// Runs the ledger over a whole history.
///
/// Transactions are stably sorted by date and grouped per (account, symbol); groups are
/// independent, so they are folded in parallel. Closed positions come back in the same
/// order a single sequential pass would emit them.
pub fn build_ledger(
    transactions: &[Transaction],
    fx: &CurrencyConverter,
    price_precision: u32,
) -> LedgerReport {
    let mut order: Vec<usize> = (0..transactions.len()).collect();
    order.sort_by_key(|&i| transactions[i].date);

    let mut groups: BTreeMap<LotKey, Vec<(usize, &Transaction)>> = BTreeMap::new();
    for (rank, &i) in order.iter().enumerate() {
        let tx = &transactions[i];
        if let Some(symbol) = tx.symbol.as_deref() {
            groups
                .entry(LotKey::new(&tx.account_id, symbol))
                .or_default()
                .push((rank, tx));
        }
    }

    let folded: Vec<(Vec<(usize, ClosedPosition)>, Vec<OpenPosition>)> = groups
        .into_par_iter()
        .map(|(_, group)| {
            let mut ledger = PositionLedger::new();
            let mut ranks = Vec::new();
            for (rank, tx) in group {
                if ledger.apply(tx, fx).is_some() {
                    ranks.push(rank);
                }
            }
            let (closed, open) = ledger.into_parts();
            (ranks.into_iter().zip(closed).collect(), open)
        })
        .collect();

    let mut closed_positions: Vec<(usize, ClosedPosition)> = Vec::new();
    let mut open_positions = Vec::new();
    for (closed, open) in folded {
        closed_positions.extend(closed);
        open_positions.extend(open);
    }
    closed_positions.sort_by_key(|(rank, _)| *rank);

    debug!(
        "Ledger produced {} closed positions and {} open positions",
        closed_positions.len(),
        open_positions.len()
    );

    LedgerReport {
        closed_positions: closed_positions
            .into_iter()
            .map(|(_, position)| position)
            .collect(),
        open_positions,
        price_precision,
    }
}
