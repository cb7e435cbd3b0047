//! Error types for the ledger

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::types::MemberId;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Split or payer references a member outside the group's member set
    #[error("Unknown member {member_id} in expense {expense_id}")]
    UnknownMember {
        /// Offending expense
        expense_id: Uuid,
        /// Member not present in the member set
        member_id: MemberId,
    },

    /// Split amounts do not add up to the expense total
    #[error("Split total mismatch in expense {expense_id}: expected {expected}, got {actual}")]
    SplitTotalMismatch {
        /// Offending expense
        expense_id: Uuid,
        /// Expense total (tax and tip inclusive)
        expected: Decimal,
        /// Sum of split amounts
        actual: Decimal,
    },

    /// Split carries a negative amount
    #[error("Negative split amount {amount} for {member_id} in expense {expense_id}")]
    NegativeSplit {
        /// Offending expense
        expense_id: Uuid,
        /// Member the split belongs to
        member_id: MemberId,
        /// The negative amount
        amount: Decimal,
    },

    /// Expense draft cannot be turned into splits
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
