//! Feed normalization: drop unusable records, then fold same-day partial fills.

use crate::activities::activities_errors::ActivityError;
use crate::activities::activities_model::{RawTransaction, Transaction, TransactionType};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters describing what normalization did to a feed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationStats {
    pub received: usize,
    pub deleted: usize,
    pub untyped: usize,
    pub malformed: usize,
    pub merged: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedTransactions {
    pub transactions: Vec<Transaction>,
    pub stats: NormalizationStats,
}

/// Identity of transactions that are folded together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MergeKey {
    date: NaiveDate,
    transaction_type: TransactionType,
    symbol: Option<String>,
    currency: String,
    account_id: String,
}

impl MergeKey {
    fn of(tx: &Transaction) -> Self {
        MergeKey {
            date: tx.date,
            transaction_type: tx.transaction_type,
            symbol: tx.symbol.clone(),
            currency: tx.currency.clone(),
            account_id: tx.account_id.clone(),
        }
    }
}

/// Converts and filters the raw feed, then merges same-day duplicates.
/// Output keeps arrival order; callers sort by date downstream.
pub fn normalize_transactions(
    raw_transactions: &[RawTransaction],
    base_currency: &str,
) -> NormalizedTransactions {
    let mut stats = NormalizationStats {
        received: raw_transactions.len(),
        ..Default::default()
    };

    let mut converted = Vec::with_capacity(raw_transactions.len());
    for raw in raw_transactions {
        match Transaction::from_raw(raw, base_currency) {
            Ok(tx) => converted.push(tx),
            Err(ActivityError::Deleted(_)) => stats.deleted += 1,
            Err(ActivityError::MissingType(_)) => stats.untyped += 1,
            Err(e) => {
                debug!("Dropping feed record: {}", e);
                stats.malformed += 1;
            }
        }
    }

    let (transactions, merged) = merge_same_day_duplicates(converted);
    stats.merged = merged;

    debug!(
        "Normalized {} feed records into {} transactions ({} deleted, {} untyped, {} malformed, {} merged)",
        stats.received,
        transactions.len(),
        stats.deleted,
        stats.untyped,
        stats.malformed,
        stats.merged
    );

    NormalizedTransactions {
        transactions,
        stats,
    }
}

/// Collapses transactions sharing {date, type, symbol, currency, account} into the first
/// of them. Returns the survivors and the number of records folded away.
///
/// Legs whose share deltas point in opposite directions are never folded: a split's
/// removal and addition legs share every key field but must stay apart.
pub fn merge_same_day_duplicates(transactions: Vec<Transaction>) -> (Vec<Transaction>, usize) {
    let mut merged: Vec<Transaction> = Vec::with_capacity(transactions.len());
    let mut index_by_key: HashMap<MergeKey, Vec<usize>> = HashMap::new();
    let mut folded = 0;

    for tx in transactions {
        let slots = index_by_key.entry(MergeKey::of(&tx)).or_default();
        let target = slots
            .iter()
            .copied()
            .find(|&slot| same_direction(merged[slot].shares, tx.shares));

        match target {
            Some(slot) => {
                fold_into(&mut merged[slot], &tx);
                folded += 1;
            }
            None => {
                slots.push(merged.len());
                merged.push(tx);
            }
        }
    }

    (merged, folded)
}

fn same_direction(a: Decimal, b: Decimal) -> bool {
    a.is_zero() || b.is_zero() || a.is_sign_negative() == b.is_sign_negative()
}

fn fold_into(target: &mut Transaction, other: &Transaction) {
    let weight_target = target.shares.abs();
    let weight_other = other.shares.abs();

    if !weight_target.is_zero()
        && !weight_other.is_zero()
        && !target.price_per_share.is_zero()
        && !other.price_per_share.is_zero()
    {
        target.price_per_share = (target.price_per_share * weight_target
            + other.price_per_share * weight_other)
            / (weight_target + weight_other);
    } else if target.price_per_share.is_zero() {
        target.price_per_share = other.price_per_share;
    }

    target.shares += other.shares;
    target.currency_amount += other.currency_amount;
    target.base_amount += other.base_amount;
    target.fee += other.fee;
    target.is_security_transfer |= other.is_security_transfer;
    if target.split_ratio.is_none() {
        target.split_ratio = other.split_ratio;
    }
}
