use thiserror::Error;

/// Reasons a raw feed record cannot become a `Transaction`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    #[error("Transaction {0} has no type")]
    MissingType(String),

    #[error("Transaction {id} has unsupported type '{label}'")]
    UnsupportedType { id: String, label: String },

    #[error("Transaction {id} has unparseable date '{date}'")]
    InvalidDate { id: String, date: String },

    #[error("Transaction {0} has no account")]
    MissingAccount(String),

    #[error("Transaction {0} is deleted")]
    Deleted(String),

    #[error("Invalid split ratio: {0}")]
    InvalidSplitRatio(String),
}
