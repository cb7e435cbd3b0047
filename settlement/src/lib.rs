//! Settlement Engine
//!
//! Turns a group's net balances into a short list of point-to-point payments
//! that clears every outstanding debt.
//!
//! # Architecture
//!
//! 1. **Aggregation**: [`ledger_core`] derives per-member balances from the
//!    expense ledger
//! 2. **Netting**: [`netting`] pairs the largest creditor with the largest
//!    debtor until every position is within epsilon of zero
//! 3. **Engine**: [`engine`] keeps the latest balances per group and serves
//!    settlement suggestions on demand
//!
//! # Example
//!
//! ```
//! use ledger_core::{compute_balances, Expense, GroupId, MemberId, Split};
//! use rust_decimal::Decimal;
//!
//! let group = GroupId::new("roommates");
//! let (alice, bob) = (MemberId::new("alice"), MemberId::new("bob"));
//! let expense = Expense::new(
//!     group.clone(),
//!     alice.clone(),
//!     Decimal::new(10000, 2),
//!     vec![Split::pending(bob.clone(), Decimal::new(5000, 2))],
//! );
//!
//! let balances = compute_balances(&group, &[alice, bob], &[expense]);
//! let balances: Vec<_> = balances.into_values().collect();
//! let plan = settlement::optimize(&group, &balances);
//!
//! assert_eq!(plan.settlements.len(), 1);
//! assert_eq!(plan.settlements[0].amount, Decimal::new(5000, 2));
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod netting;
pub mod error;
pub mod config;
pub mod metrics;
pub mod engine;

// Re-exports
pub use config::Config;
pub use engine::{GroupSnapshot, SettlementEngine};
pub use error::{Error, Result};
pub use netting::{apply_settlements, net_positions, optimize, SettlementOptimizer};
pub use types::*;
