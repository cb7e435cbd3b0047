//! Group Ledger Core
//!
//! Expense ledger model and balance aggregation for shared-expense groups.
//!
//! # Architecture
//!
//! - **Value types**: members, groups, expenses and splits are plain data
//!   supplied by the surrounding application
//! - **Wholesale recomputation**: balances are rebuilt from the full ledger on
//!   every call, never patched in place
//! - **Fixed-point money**: all amounts are [`rust_decimal::Decimal`]
//! - **Split construction**: [`ExpenseDraft`] builds equal, custom and
//!   itemized splits with tax and tip spread proportionally
//!
//! # Invariants
//!
//! - A payer never owes themselves
//! - Confirmed splits contribute no outstanding debt
//! - Σ(net balances) == 0 whenever every participant is in the member set

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod money;
pub mod config;
pub mod error;
pub mod aggregator;
pub mod splits;

// Re-exports
pub use aggregator::{compute_balances, BalanceAggregator};
pub use config::{AggregationPolicy, UnknownMemberPolicy};
pub use error::{Error, Result};
pub use splits::{allocate, ExpenseDraft, ExpenseItem, SplitMethod};
pub use types::{Balance, Expense, GroupId, MemberId, Split, SplitStatus};
