// Transaction types
//
// Each constant is the canonical (lower-case) feed label of one transaction category.

/// Purchase of a security. Opens or extends a long lot, or closes a short one.
pub const TRANSACTION_TYPE_BUY: &str = "buy";

/// Disposal of a security. Closes a long lot, or opens/extends a short one.
pub const TRANSACTION_TYPE_SELL: &str = "sell";

/// Stock split or reverse split, delivered as a removal leg and an addition leg.
pub const TRANSACTION_TYPE_SPLIT: &str = "split";

/// Distribution reinvested in new shares. The cash side is booked as income elsewhere.
pub const TRANSACTION_TYPE_REINVEST: &str = "reinvest";

/// Cash dividend paid into the account.
pub const TRANSACTION_TYPE_DIVIDEND: &str = "dividend";

/// Fund distribution (cash, or shares when reinvested).
pub const TRANSACTION_TYPE_DISTRIBUTION: &str = "distribution";

/// Other investment income.
pub const TRANSACTION_TYPE_INCOME: &str = "income";

/// Interest earned or charged on cash.
pub const TRANSACTION_TYPE_INTEREST: &str = "interest";

/// Stand-alone fee not tied to a trade.
pub const TRANSACTION_TYPE_FEE: &str = "fee";

/// Tax paid from or refunded into the account.
pub const TRANSACTION_TYPE_TAX: &str = "tax";

/// Incoming funds from outside the portfolio.
pub const TRANSACTION_TYPE_DEPOSIT: &str = "deposit";

/// Outgoing funds to outside the portfolio.
pub const TRANSACTION_TYPE_WITHDRAWAL: &str = "withdrawal";

/// Cash or securities moved between accounts, or between the portfolio and the outside.
pub const TRANSACTION_TYPE_TRANSFER: &str = "transfer";

/// Alternative labels some feeds use, mapped onto canonical labels.
pub const TRANSACTION_TYPE_ALIASES: [(&str, &str); 7] = [
    ("reinvestment", TRANSACTION_TYPE_REINVEST),
    ("dividends", TRANSACTION_TYPE_DIVIDEND),
    ("withdraw", TRANSACTION_TYPE_WITHDRAWAL),
    ("transfer_in", TRANSACTION_TYPE_TRANSFER),
    ("transfer_out", TRANSACTION_TYPE_TRANSFER),
    ("transferin", TRANSACTION_TYPE_TRANSFER),
    ("transferout", TRANSACTION_TYPE_TRANSFER),
];

/// Resolves a feed label to its canonical label, case-insensitively.
pub fn canonical_type_label(label: &str) -> Option<&'static str> {
    let lowered = label.trim().to_lowercase();
    let canonical = [
        TRANSACTION_TYPE_BUY,
        TRANSACTION_TYPE_SELL,
        TRANSACTION_TYPE_SPLIT,
        TRANSACTION_TYPE_REINVEST,
        TRANSACTION_TYPE_DIVIDEND,
        TRANSACTION_TYPE_DISTRIBUTION,
        TRANSACTION_TYPE_INCOME,
        TRANSACTION_TYPE_INTEREST,
        TRANSACTION_TYPE_FEE,
        TRANSACTION_TYPE_TAX,
        TRANSACTION_TYPE_DEPOSIT,
        TRANSACTION_TYPE_WITHDRAWAL,
        TRANSACTION_TYPE_TRANSFER,
    ];
    canonical
        .iter()
        .find(|label| **label == lowered)
        .copied()
        .or_else(|| {
            TRANSACTION_TYPE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == lowered)
                .map(|(_, label)| *label)
        })
}
