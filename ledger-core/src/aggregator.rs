//! Balance aggregation
//!
//! Walks a group's expense ledger and derives, for every member, the pairwise
//! amounts owed and owed-to plus a net balance.
//!
//! # Algorithm
//!
//! 1. Seed an empty balance for every member of the group
//! 2. For each outstanding split of each expense in the group, move the split
//!    amount into `debtor.owes[payer]` and `payer.owed_by[debtor]`
//! 3. Derive `net = Σ owed_by − Σ owes` per member
//!
//! # Example
//!
//! ```text
//! Expense: A paid $100
//!   A: $50 (confirmed)
//!   B: $50 (pending)
//!
//! Balances:
//!   A: owed_by {B: $50}, net +$50
//!   B: owes    {A: $50}, net -$50
//! ```

use crate::{
    config::{AggregationPolicy, UnknownMemberPolicy},
    types::*,
    Error, Result,
};
use std::collections::{HashMap, HashSet};

/// Compute balances with the default (permissive) policy
///
/// Never fails: malformed splits propagate arithmetically and members outside
/// `members` are dropped from the result.
pub fn compute_balances(
    group_id: &GroupId,
    members: &[MemberId],
    expenses: &[Expense],
) -> HashMap<MemberId, Balance> {
    BalanceAggregator::default().accumulate(group_id, members, expenses)
}

/// Balance aggregator
#[derive(Debug, Clone, Default)]
pub struct BalanceAggregator {
    policy: AggregationPolicy,
}

impl BalanceAggregator {
    /// Create new aggregator
    pub fn new(policy: AggregationPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// Active policy
    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Compute balances for `group_id`
    ///
    /// Returns one balance per member of `members`, even when the member took
    /// part in no expense. Expenses of other groups are ignored.
    pub fn compute(
        &self,
        group_id: &GroupId,
        members: &[MemberId],
        expenses: &[Expense],
    ) -> Result<HashMap<MemberId, Balance>> {
        let known: HashSet<&MemberId> = members.iter().collect();

        for expense in expenses.iter().filter(|e| &e.group_id == group_id) {
            self.check_expense(expense, &known)?;
        }

        Ok(self.accumulate(group_id, members, expenses))
    }

    /// Reject expenses that break the configured contract
    fn check_expense(&self, expense: &Expense, known: &HashSet<&MemberId>) -> Result<()> {
        if self.policy.unknown_members == UnknownMemberPolicy::Reject {
            let participants = std::iter::once(&expense.paid_by)
                .chain(expense.splits.iter().map(|s| &s.member_id));

            for member_id in participants {
                if !known.contains(member_id) {
                    return Err(Error::UnknownMember {
                        expense_id: expense.id,
                        member_id: member_id.clone(),
                    });
                }
            }
        }

        if self.policy.reject_negative_splits {
            if let Some(split) = expense.splits.iter().find(|s| s.amount.is_sign_negative()) {
                return Err(Error::NegativeSplit {
                    expense_id: expense.id,
                    member_id: split.member_id.clone(),
                    amount: split.amount,
                });
            }
        }

        if self.policy.validate_split_totals {
            let actual = expense.split_total();
            if (actual - expense.total_amount).abs() > self.policy.split_total_tolerance {
                return Err(Error::SplitTotalMismatch {
                    expense_id: expense.id,
                    expected: expense.total_amount,
                    actual,
                });
            }
        }

        Ok(())
    }

    fn accumulate(
        &self,
        group_id: &GroupId,
        members: &[MemberId],
        expenses: &[Expense],
    ) -> HashMap<MemberId, Balance> {
        let mut balances: HashMap<MemberId, Balance> = members
            .iter()
            .map(|m| (m.clone(), Balance::new(m.clone(), group_id.clone())))
            .collect();

        let mut expense_count = 0usize;
        let mut counted = 0usize;
        let mut skipped_self = 0usize;
        let mut skipped_confirmed = 0usize;
        let mut dropped: HashSet<MemberId> = HashSet::new();

        for expense in expenses.iter().filter(|e| &e.group_id == group_id) {
            expense_count += 1;

            for split in &expense.splits {
                // A payer cannot owe themselves
                if split.member_id == expense.paid_by {
                    skipped_self += 1;
                    continue;
                }

                if !split.is_outstanding() {
                    skipped_confirmed += 1;
                    continue;
                }

                match self.entry(&mut balances, &split.member_id, group_id) {
                    Some(debtor) => debtor.add_owes(&expense.paid_by, split.amount),
                    None => {
                        dropped.insert(split.member_id.clone());
                    }
                }

                match self.entry(&mut balances, &expense.paid_by, group_id) {
                    Some(payer) => payer.add_owed_by(&split.member_id, split.amount),
                    None => {
                        dropped.insert(expense.paid_by.clone());
                    }
                }

                counted += 1;
            }
        }

        for balance in balances.values_mut() {
            balance.recompute_net();
        }

        if !dropped.is_empty() {
            tracing::warn!(
                "Group {}: {} participant(s) outside the member set were dropped",
                group_id,
                dropped.len()
            );
        }

        tracing::debug!(
            "Group {}: {} expenses, {} splits counted, {} self-splits and {} confirmed splits skipped",
            group_id,
            expense_count,
            counted,
            skipped_self,
            skipped_confirmed
        );

        balances
    }

    /// Balance record for `member_id`, honouring the unknown member policy
    fn entry<'a>(
        &self,
        balances: &'a mut HashMap<MemberId, Balance>,
        member_id: &MemberId,
        group_id: &GroupId,
    ) -> Option<&'a mut Balance> {
        match self.policy.unknown_members {
            UnknownMemberPolicy::Include => Some(
                balances
                    .entry(member_id.clone())
                    .or_insert_with(|| Balance::new(member_id.clone(), group_id.clone())),
            ),
            UnknownMemberPolicy::Drop | UnknownMemberPolicy::Reject => balances.get_mut(member_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn member(id: &str) -> MemberId {
        MemberId::new(id)
    }

    fn group() -> GroupId {
        GroupId::new("roommates")
    }

    fn split(id: &str, amount: Decimal, status: SplitStatus) -> Split {
        Split {
            member_id: member(id),
            amount,
            status,
        }
    }

    fn expense(paid_by: &str, total: Decimal, splits: Vec<Split>) -> Expense {
        Expense::new(group(), member(paid_by), total, splits)
    }

    #[test]
    fn test_two_member_scenario() {
        let members = vec![member("A"), member("B")];
        let expenses = vec![expense(
            "A",
            dec!(100),
            vec![
                split("A", dec!(50), SplitStatus::Confirmed),
                split("B", dec!(50), SplitStatus::Pending),
            ],
        )];

        let balances = compute_balances(&group(), &members, &expenses);

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[&member("A")].net_balance, dec!(50));
        assert_eq!(balances[&member("A")].owed_by[&member("B")], dec!(50));
        assert_eq!(balances[&member("B")].net_balance, dec!(-50));
        assert_eq!(balances[&member("B")].owes[&member("A")], dec!(50));
    }

    #[test]
    fn test_confirmed_split_contributes_nothing() {
        let members = vec![member("A"), member("B")];
        let expenses = vec![expense(
            "A",
            dec!(60),
            vec![
                split("A", dec!(30), SplitStatus::Pending),
                split("B", dec!(30), SplitStatus::Confirmed),
            ],
        )];

        let balances = compute_balances(&group(), &members, &expenses);

        for balance in balances.values() {
            assert!(balance.owes.is_empty());
            assert!(balance.owed_by.is_empty());
            assert_eq!(balance.net_balance, Decimal::ZERO);
        }
    }

    #[test]
    fn test_paid_split_still_outstanding() {
        let members = vec![member("A"), member("B")];
        let expenses = vec![expense(
            "B",
            dec!(20),
            vec![split("A", dec!(20), SplitStatus::Paid)],
        )];

        let balances = compute_balances(&group(), &members, &expenses);
        assert_eq!(balances[&member("A")].net_balance, dec!(-20));
        assert_eq!(balances[&member("B")].net_balance, dec!(20));
    }

    #[test]
    fn test_empty_ledger_seeds_every_member() {
        let members = vec![member("A"), member("B"), member("C")];

        let balances = compute_balances(&group(), &members, &[]);

        assert_eq!(balances.len(), 3);
        assert!(balances.values().all(|b| b.net_balance == Decimal::ZERO));
        assert!(balances.values().all(|b| b.group_id == group()));
    }

    #[test]
    fn test_no_members_yields_empty_set() {
        let expenses = vec![expense("A", dec!(10), vec![split("B", dec!(10), SplitStatus::Pending)])];
        let balances = compute_balances(&group(), &[], &expenses);
        assert!(balances.is_empty());
    }

    #[test]
    fn test_other_groups_ignored() {
        let members = vec![member("A"), member("B")];
        let mut foreign = expense("A", dec!(40), vec![split("B", dec!(40), SplitStatus::Pending)]);
        foreign.group_id = GroupId::new("trip");

        let balances = compute_balances(&group(), &members, &[foreign]);
        assert!(balances.values().all(|b| b.net_balance == Decimal::ZERO));
    }

    #[test]
    fn test_accumulates_across_expenses() {
        let members = vec![member("A"), member("B"), member("C")];
        let expenses = vec![
            expense(
                "A",
                dec!(90),
                vec![
                    split("A", dec!(30), SplitStatus::Pending),
                    split("B", dec!(30), SplitStatus::Pending),
                    split("C", dec!(30), SplitStatus::Pending),
                ],
            ),
            expense(
                "B",
                dec!(45),
                vec![
                    split("A", dec!(15), SplitStatus::Pending),
                    split("B", dec!(15), SplitStatus::Pending),
                    split("C", dec!(15), SplitStatus::Pending),
                ],
            ),
        ];

        let balances = compute_balances(&group(), &members, &expenses);

        // A: +60 - 15 = 45, B: +30 - 30 = 0, C: -45
        assert_eq!(balances[&member("A")].net_balance, dec!(45));
        assert_eq!(balances[&member("B")].net_balance, dec!(0));
        assert_eq!(balances[&member("C")].net_balance, dec!(-45));
        assert_eq!(balances[&member("B")].owes[&member("A")], dec!(30));
        assert_eq!(balances[&member("A")].owes[&member("B")], dec!(15));

        let total: Decimal = balances.values().map(|b| b.net_balance).sum();
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_member_dropped_by_default() {
        let members = vec![member("A")];
        let expenses = vec![expense("A", dec!(25), vec![split("Z", dec!(25), SplitStatus::Pending)])];

        let balances = compute_balances(&group(), &members, &expenses);

        assert_eq!(balances.len(), 1);
        assert_eq!(balances[&member("A")].owed_by[&member("Z")], dec!(25));
        assert_eq!(balances[&member("A")].net_balance, dec!(25));
    }

    #[test]
    fn test_unknown_payer_dropped_by_default() {
        let members = vec![member("B")];
        let expenses = vec![expense("Z", dec!(25), vec![split("B", dec!(25), SplitStatus::Pending)])];

        let balances = compute_balances(&group(), &members, &expenses);

        assert_eq!(balances.len(), 1);
        assert!(!balances.contains_key(&member("Z")));
        assert_eq!(balances[&member("B")].owes[&member("Z")], dec!(25));
        assert_eq!(balances[&member("B")].net_balance, dec!(-25));
    }

    #[test]
    fn test_unknown_member_included() {
        let policy = AggregationPolicy {
            unknown_members: UnknownMemberPolicy::Include,
            ..Default::default()
        };
        let aggregator = BalanceAggregator::new(policy).unwrap();
        let members = vec![member("A")];
        let expenses = vec![expense("A", dec!(25), vec![split("Z", dec!(25), SplitStatus::Pending)])];

        let balances = aggregator.compute(&group(), &members, &expenses).unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[&member("Z")].net_balance, dec!(-25));
    }

    #[test]
    fn test_unknown_member_rejected() {
        let aggregator = BalanceAggregator::new(AggregationPolicy::strict()).unwrap();
        let members = vec![member("A")];
        let expenses = vec![expense("A", dec!(25), vec![split("Z", dec!(25), SplitStatus::Pending)])];

        let err = aggregator.compute(&group(), &members, &expenses).unwrap_err();
        assert!(matches!(err, Error::UnknownMember { ref member_id, .. } if *member_id == member("Z")));
    }

    #[test]
    fn test_split_total_validation() {
        let aggregator = BalanceAggregator::new(AggregationPolicy::strict()).unwrap();
        let members = vec![member("A"), member("B")];
        let expenses = vec![expense(
            "A",
            dec!(156.78),
            vec![
                split("A", dec!(78.39), SplitStatus::Confirmed),
                split("B", dec!(70.00), SplitStatus::Pending),
            ],
        )];

        let err = aggregator.compute(&group(), &members, &expenses).unwrap_err();
        assert!(matches!(err, Error::SplitTotalMismatch { actual, .. } if actual == dec!(148.39)));
    }

    #[test]
    fn test_split_total_within_tolerance() {
        let aggregator = BalanceAggregator::new(AggregationPolicy::strict()).unwrap();
        let members = vec![member("A"), member("B"), member("C")];
        let expenses = vec![expense(
            "A",
            dec!(100.00),
            vec![
                split("A", dec!(33.33), SplitStatus::Pending),
                split("B", dec!(33.33), SplitStatus::Pending),
                split("C", dec!(33.33), SplitStatus::Pending),
            ],
        )];

        let balances = aggregator.compute(&group(), &members, &expenses).unwrap();
        assert_eq!(balances[&member("A")].net_balance, dec!(66.66));
    }

    #[test]
    fn test_negative_split_propagates_by_default() {
        let members = vec![member("A"), member("B")];
        let expenses = vec![expense("A", dec!(-10), vec![split("B", dec!(-10), SplitStatus::Pending)])];

        let balances = compute_balances(&group(), &members, &expenses);
        assert_eq!(balances[&member("A")].net_balance, dec!(-10));
        assert_eq!(balances[&member("B")].net_balance, dec!(10));
    }

    #[test]
    fn test_negative_split_rejected_under_strict_policy() {
        let aggregator = BalanceAggregator::new(AggregationPolicy::strict()).unwrap();
        let members = vec![member("A"), member("B")];
        let expenses = vec![expense("A", dec!(-10), vec![split("B", dec!(-10), SplitStatus::Pending)])];

        let err = aggregator.compute(&group(), &members, &expenses).unwrap_err();
        assert!(matches!(err, Error::NegativeSplit { .. }));
    }
}
