//! Aggregation policy
//!
//! Controls how the aggregator treats ledger data that breaks the upstream
//! input contract. The default is fully permissive: malformed data
//! propagates arithmetically and outsiders are dropped from the result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::money::DEFAULT_EPSILON;

/// Treatment of payers or split members missing from the member set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMemberPolicy {
    /// Accumulate against in-set members, omit the outsider's own record
    #[default]
    Drop,
    /// Create a record for the outsider and return it
    Include,
    /// Fail the aggregation
    Reject,
}

impl FromStr for UnknownMemberPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "include" => Ok(Self::Include),
            "reject" => Ok(Self::Reject),
            other => Err(crate::Error::Config(format!(
                "Unknown member policy '{}' (expected drop, include or reject)",
                other
            ))),
        }
    }
}

/// Aggregator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationPolicy {
    /// Members outside the member set
    pub unknown_members: UnknownMemberPolicy,

    /// Check Σ(split amounts) against the expense total
    pub validate_split_totals: bool,

    /// Allowed difference between split sum and total
    pub split_total_tolerance: Decimal,

    /// Fail on negative split amounts
    pub reject_negative_splits: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            unknown_members: UnknownMemberPolicy::Drop,
            validate_split_totals: false,
            split_total_tolerance: DEFAULT_EPSILON,
            reject_negative_splits: false,
        }
    }
}

impl AggregationPolicy {
    /// Strict policy: every contract violation is an error
    pub fn strict() -> Self {
        Self {
            unknown_members: UnknownMemberPolicy::Reject,
            validate_split_totals: true,
            split_total_tolerance: DEFAULT_EPSILON,
            reject_negative_splits: true,
        }
    }

    /// Validate the policy itself
    pub fn validate(&self) -> crate::Result<()> {
        if self.split_total_tolerance.is_sign_negative() {
            return Err(crate::Error::Config(format!(
                "split_total_tolerance must be non-negative, got {}",
                self.split_total_tolerance
            )));
        }
        Ok(())
    }
}
