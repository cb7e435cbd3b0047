//! Core types for the settlement optimizer

use chrono::{DateTime, Utc};
use ledger_core::{Balance, GroupId, MemberId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settlement status
///
/// Settlements are emitted as [`SettlementStatus::Pending`]; later states are
/// advanced by payment confirmation flows outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Proposed, not yet paid
    Pending,
    /// Debtor reports the payment as sent
    Sent,
    /// Creditor reports the payment as received
    Received,
    /// Payment confirmed
    Confirmed,
}

/// Proposed transfer from a debtor to a creditor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement ID
    pub id: Uuid,

    /// Member who pays
    pub from_member_id: MemberId,

    /// Member who receives
    pub to_member_id: MemberId,

    /// Amount to transfer
    pub amount: Decimal,

    /// Group the debt belongs to
    pub group_id: GroupId,

    /// Settlement status
    pub status: SettlementStatus,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Create a pending settlement
    pub fn pending(
        group_id: GroupId,
        from_member_id: MemberId,
        to_member_id: MemberId,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_member_id,
            to_member_id,
            amount,
            group_id,
            status: SettlementStatus::Pending,
            created_at,
        }
    }
}

/// Member's net position (positive = net creditor, negative = net debtor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetPosition {
    /// Member ID
    pub member_id: MemberId,

    /// Net balance
    pub net_balance: Decimal,
}

impl NetPosition {
    /// Create new position
    pub fn new(member_id: MemberId, net_balance: Decimal) -> Self {
        Self {
            member_id,
            net_balance,
        }
    }
}

impl From<&Balance> for NetPosition {
    fn from(balance: &Balance) -> Self {
        Self::new(balance.member_id.clone(), balance.net_balance)
    }
}

/// Optimizer output for one group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Group ID
    pub group_id: GroupId,

    /// Settlements in emission order
    pub settlements: Vec<Settlement>,

    /// Σ positive net balances
    pub total_credit: Decimal,

    /// Σ |negative net balances|
    pub total_debit: Decimal,

    /// Credit left unsettled when the optimizer stopped
    pub residual_credit: Decimal,

    /// Debit left unsettled when the optimizer stopped
    pub residual_debit: Decimal,

    /// Σ pairings at or below epsilon that were not emitted
    pub suppressed_dust: Decimal,

    /// Threshold used for this plan
    pub epsilon: Decimal,
}

impl SettlementPlan {
    /// Σ emitted settlement amounts
    pub fn total_settled(&self) -> Decimal {
        self.settlements.iter().map(|s| s.amount).sum()
    }

    /// Check if the plan leaves a meaningful unsettled remainder
    pub fn has_residual(&self) -> bool {
        self.residual_credit >= self.epsilon || self.residual_debit >= self.epsilon
    }

    /// Check if nothing needs to be paid
    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }

    /// Number of settlements
    pub fn len(&self) -> usize {
        self.settlements.len()
    }
}

/// Settlement statistics for a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NettingStats {
    /// Number of members with a balance record
    pub member_count: usize,

    /// Number of expenses aggregated
    pub expense_count: usize,

    /// Σ expense totals
    pub total_spent: Decimal,

    /// Number of pairwise (debtor, creditor) obligations
    pub gross_obligation_count: usize,

    /// Σ pairwise obligations
    pub gross_outstanding: Decimal,

    /// Number of proposed settlements
    pub settlement_count: usize,

    /// Σ proposed settlement amounts
    pub net_transfer_total: Decimal,

    /// Amount no longer moved thanks to netting
    pub amount_saved: Decimal,

    /// Pairwise obligations replaced by netting
    pub transfers_eliminated: usize,

    /// Netting efficiency (0.0 - 1.0)
    pub efficiency: f64,
}

impl NettingStats {
    /// Calculate netting efficiency
    pub fn calculate_efficiency(gross: Decimal, net: Decimal) -> f64 {
        if gross == Decimal::ZERO {
            return 0.0;
        }

        ((gross - net) / gross).to_f64().unwrap_or(0.0)
    }
}
