use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which bucket a transaction's cash leg lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashFlowKind {
    /// Money entering from outside the portfolio. For transfers, the direction picks
    /// the deposit or withdrawal bucket.
    Deposit,
    Withdrawal,
    /// Income when the converted amount is positive, otherwise a fee/interest charge.
    Income,
}

/// Base-currency totals for one date. Every bucket is a non-negative magnitude.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyCashFlow {
    pub date: NaiveDate,
    pub deposit: Decimal,
    pub withdrawal: Decimal,
    pub income: Decimal,
    /// Fees, taxes and interest charges (absolute value).
    pub interest: Decimal,
}

impl DailyCashFlow {
    pub fn new(date: NaiveDate) -> Self {
        DailyCashFlow {
            date,
            deposit: Decimal::ZERO,
            withdrawal: Decimal::ZERO,
            income: Decimal::ZERO,
            interest: Decimal::ZERO,
        }
    }

    /// External flow seen from the investor: positive when money left the portfolio.
    pub fn net_external_flow(&self) -> Decimal {
        self.withdrawal - self.deposit
    }

    pub fn is_empty(&self) -> bool {
        self.deposit.is_zero()
            && self.withdrawal.is_zero()
            && self.income.is_zero()
            && self.interest.is_zero()
    }
}
