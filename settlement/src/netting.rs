//! Settlement minimization
//!
//! Greedy debt simplification over net balances.
//!
//! # Algorithm
//!
//! 1. Split members into net creditors and net debtors
//! 2. Sort creditors by largest credit, debtors by largest debt
//! 3. Pair the current creditor with the current debtor and transfer
//!    min(credit, |debt|)
//! 4. Advance whichever side has been driven below epsilon
//!
//! Total volume moved is optimal (Σ positive net balances). The transaction
//! count is at most `creditors + debtors - 1` but not guaranteed minimal.
//!
//! # Example
//!
//! ```text
//! Net positions:
//!   A: +$30
//!   B: +$20
//!   C: -$50
//!
//! Settlements:
//!   C pays A: $30
//!   C pays B: $20
//! ```

use crate::{types::*, Error, Result};
use chrono::Utc;
use ledger_core::{money::DEFAULT_EPSILON, Balance, GroupId, MemberId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Optimize with the default 0.01 threshold
pub fn optimize(group_id: &GroupId, balances: &[Balance]) -> SettlementPlan {
    SettlementOptimizer::default().optimize(group_id, balances)
}

/// Net positions of the balances that belong to `group_id`
pub fn net_positions(group_id: &GroupId, balances: &[Balance]) -> Vec<NetPosition> {
    let positions: Vec<NetPosition> = balances
        .iter()
        .filter(|b| &b.group_id == group_id)
        .map(NetPosition::from)
        .collect();

    if positions.len() != balances.len() {
        tracing::debug!(
            "Ignored {} balances not belonging to group {}",
            balances.len() - positions.len(),
            group_id
        );
    }

    positions
}

/// Apply settlements to net positions as if every transfer had been paid
///
/// The payer's position moves up by the amount and the payee's moves down.
/// Settlements naming members absent from `positions` are ignored.
pub fn apply_settlements(positions: &[NetPosition], settlements: &[Settlement]) -> Vec<NetPosition> {
    let mut result = positions.to_vec();
    let index: HashMap<&MemberId, usize> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| (&p.member_id, i))
        .collect();

    for settlement in settlements {
        if let Some(&i) = index.get(&settlement.from_member_id) {
            result[i].net_balance += settlement.amount;
        }
        if let Some(&i) = index.get(&settlement.to_member_id) {
            result[i].net_balance -= settlement.amount;
        }
    }

    result
}

/// Remaining amount for one side of the pairing
#[derive(Debug)]
struct Outstanding {
    member_id: MemberId,
    remaining: Decimal,
}

/// Settlement optimizer
#[derive(Debug, Clone)]
pub struct SettlementOptimizer {
    /// Amounts at or below this are not emitted
    epsilon: Decimal,
}

impl Default for SettlementOptimizer {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl SettlementOptimizer {
    /// Create new optimizer
    pub fn new(epsilon: Decimal) -> Result<Self> {
        if epsilon <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "Settlement epsilon must be positive, got {}",
                epsilon
            )));
        }

        Ok(Self { epsilon })
    }

    /// Threshold below which amounts are treated as settled
    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Compute settlements for the balances of `group_id`
    pub fn optimize(&self, group_id: &GroupId, balances: &[Balance]) -> SettlementPlan {
        self.optimize_positions(group_id, &net_positions(group_id, balances))
    }

    /// Compute settlements from net positions
    ///
    /// Works on a local copy of the positions; the input is never modified.
    pub fn optimize_positions(&self, group_id: &GroupId, positions: &[NetPosition]) -> SettlementPlan {
        let mut creditors: Vec<Outstanding> = positions
            .iter()
            .filter(|p| p.net_balance > Decimal::ZERO)
            .map(|p| Outstanding {
                member_id: p.member_id.clone(),
                remaining: p.net_balance,
            })
            .collect();

        let mut debtors: Vec<Outstanding> = positions
            .iter()
            .filter(|p| p.net_balance < Decimal::ZERO)
            .map(|p| Outstanding {
                member_id: p.member_id.clone(),
                remaining: p.net_balance.abs(),
            })
            .collect();

        // Largest first; ties by member id so the plan is reproducible
        let by_size = |a: &Outstanding, b: &Outstanding| {
            b.remaining
                .cmp(&a.remaining)
                .then_with(|| a.member_id.cmp(&b.member_id))
        };
        creditors.sort_by(by_size);
        debtors.sort_by(by_size);

        let total_credit: Decimal = creditors.iter().map(|c| c.remaining).sum();
        let total_debit: Decimal = debtors.iter().map(|d| d.remaining).sum();

        let created_at = Utc::now();
        let mut settlements = Vec::new();
        let mut suppressed_dust = Decimal::ZERO;
        let (mut i, mut j) = (0, 0);

        while i < creditors.len() && j < debtors.len() {
            let creditor = &mut creditors[i];
            let debtor = &mut debtors[j];

            let amount = creditor.remaining.min(debtor.remaining);

            if amount > self.epsilon {
                settlements.push(Settlement::pending(
                    group_id.clone(),
                    debtor.member_id.clone(),
                    creditor.member_id.clone(),
                    amount,
                    created_at,
                ));
            } else {
                suppressed_dust += amount;
            }

            creditor.remaining -= amount;
            debtor.remaining -= amount;

            // One side reaches exactly zero each step, so the loop terminates
            if creditor.remaining < self.epsilon {
                i += 1;
            }
            if debtor.remaining < self.epsilon {
                j += 1;
            }
        }

        let plan = SettlementPlan {
            group_id: group_id.clone(),
            settlements,
            total_credit,
            total_debit,
            residual_credit: creditors.iter().map(|c| c.remaining).sum(),
            residual_debit: debtors.iter().map(|d| d.remaining).sum(),
            suppressed_dust,
            epsilon: self.epsilon,
        };

        if plan.has_residual() {
            tracing::warn!(
                "Group {} does not net to zero: {} credit and {} debit left unsettled",
                group_id,
                plan.residual_credit,
                plan.residual_debit
            );
        }

        tracing::info!(
            "Group {}: {} creditors, {} debtors -> {} settlements totalling {}",
            group_id,
            creditors.len(),
            debtors.len(),
            plan.len(),
            plan.total_settled()
        );

        plan
    }
}
