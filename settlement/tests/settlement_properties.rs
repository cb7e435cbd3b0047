//! Property-based tests for settlement invariants
//!
//! These tests use proptest to verify:
//! - No self-transfers and no transfers at or below epsilon
//! - Volume conservation: Σ(settled) + dust + residual == Σ(credit)
//! - Consistent balance sets settle completely
//! - Re-optimizing after paying a plan proposes (almost) nothing

use ledger_core::{compute_balances, Balance, Expense, GroupId, MemberId, Split, SplitStatus};
use proptest::prelude::*;
use rust_decimal::Decimal;
use settlement::{apply_settlements, net_positions, NetPosition, SettlementOptimizer, SettlementPlan};

const MEMBERS: [&str; 6] = ["ana", "ben", "cleo", "dev", "eli", "fay"];

fn group() -> GroupId {
    GroupId::new("festival")
}

fn members() -> Vec<MemberId> {
    MEMBERS.iter().map(|m| MemberId::new(*m)).collect()
}

/// Strategy for generating cent amounts (0.01 to 500.00)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn member_strategy() -> impl Strategy<Value = MemberId> {
    prop::sample::select(MEMBERS.to_vec()).prop_map(MemberId::new)
}

fn expense_strategy() -> impl Strategy<Value = Expense> {
    let split = (member_strategy(), amount_strategy(), any::<bool>()).prop_map(
        |(member_id, amount, confirmed)| Split {
            member_id,
            amount,
            status: if confirmed {
                SplitStatus::Confirmed
            } else {
                SplitStatus::Pending
            },
        },
    );

    (member_strategy(), prop::collection::vec(split, 1..6)).prop_map(|(paid_by, splits)| {
        let total = splits.iter().map(|s| s.amount).sum();
        Expense::new(group(), paid_by, total, splits)
    })
}

/// Balances derived from a random ledger; always internally consistent
fn balances_strategy() -> impl Strategy<Value = Vec<Balance>> {
    prop::collection::vec(expense_strategy(), 0..25).prop_map(|expenses| {
        compute_balances(&group(), &members(), &expenses)
            .into_values()
            .collect()
    })
}

/// Arbitrary positions; not required to net to zero
fn positions_strategy() -> impl Strategy<Value = Vec<NetPosition>> {
    prop::collection::vec(-100_000i64..100_000i64, 0..MEMBERS.len()).prop_map(|cents| {
        cents
            .into_iter()
            .enumerate()
            .map(|(i, c)| NetPosition::new(MemberId::new(MEMBERS[i]), Decimal::new(c, 2)))
            .collect()
    })
}

fn assert_well_formed(plan: &SettlementPlan) -> Result<(), TestCaseError> {
    for settlement in &plan.settlements {
        prop_assert_ne!(&settlement.from_member_id, &settlement.to_member_id);
        prop_assert!(settlement.amount > plan.epsilon);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Settlements are never self-transfers or dust
    #[test]
    fn prop_settlements_well_formed(positions in positions_strategy()) {
        let plan = SettlementOptimizer::default().optimize_positions(&group(), &positions);
        assert_well_formed(&plan)?;
    }

    /// Property: Every unit of credit is settled, suppressed or reported
    #[test]
    fn prop_volume_accounted_for(positions in positions_strategy()) {
        let plan = SettlementOptimizer::default().optimize_positions(&group(), &positions);

        prop_assert_eq!(
            plan.total_settled() + plan.suppressed_dust + plan.residual_credit,
            plan.total_credit
        );
        prop_assert_eq!(
            plan.residual_credit - plan.residual_debit,
            plan.total_credit - plan.total_debit
        );
    }

    /// Property: A consistent balance set settles with no residual
    #[test]
    fn prop_consistent_balances_fully_settled(balances in balances_strategy()) {
        let plan = SettlementOptimizer::default().optimize(&group(), &balances);

        assert_well_formed(&plan)?;
        prop_assert_eq!(plan.total_credit, plan.total_debit);
        prop_assert!(!plan.has_residual());
        prop_assert_eq!(plan.total_settled() + plan.suppressed_dust, plan.total_credit);
    }

    /// Property: Greedy pairing needs fewer transfers than participants
    #[test]
    fn prop_transfer_count_bounded(balances in balances_strategy()) {
        let plan = SettlementOptimizer::default().optimize(&group(), &balances);
        let participants = balances.iter().filter(|b| b.net_balance != Decimal::ZERO).count();

        prop_assert!(plan.len() <= participants.saturating_sub(1));
    }

    /// Property: Paying a plan leaves nothing (beyond dust) to settle
    #[test]
    fn prop_reoptimize_after_payment(balances in balances_strategy()) {
        let optimizer = SettlementOptimizer::default();
        let positions = net_positions(&group(), &balances);

        let first = optimizer.optimize_positions(&group(), &positions);
        let paid = apply_settlements(&positions, &first.settlements);
        let second = optimizer.optimize_positions(&group(), &paid);

        prop_assert!(second.total_settled() <= first.suppressed_dust);
        if first.suppressed_dust == Decimal::ZERO {
            prop_assert!(second.is_empty());
            for position in &paid {
                prop_assert_eq!(position.net_balance, Decimal::ZERO);
            }
        }
    }

    /// Property: Plans are reproducible regardless of input order
    #[test]
    fn prop_order_independent(balances in balances_strategy()) {
        let optimizer = SettlementOptimizer::default();
        let mut reversed = balances.clone();
        reversed.reverse();

        let a = optimizer.optimize(&group(), &balances);
        let b = optimizer.optimize(&group(), &reversed);

        let key = |plan: &SettlementPlan| {
            plan.settlements
                .iter()
                .map(|s| (s.from_member_id.clone(), s.to_member_id.clone(), s.amount))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(key(&a), key(&b));
    }
}
