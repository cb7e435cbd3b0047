//! Core ledger types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Member identifier (opaque, stable string or UUID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Create new member ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Create new group ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Split status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStatus {
    /// Not yet paid
    #[default]
    Pending,
    /// Marked as paid by the debtor
    Paid,
    /// Payment confirmed by the payer; no outstanding debt
    Confirmed,
}

/// One member's share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Member the share is attributed to
    pub member_id: MemberId,

    /// Share amount in the group's currency
    pub amount: Decimal,

    /// Split status
    #[serde(default)]
    pub status: SplitStatus,
}

impl Split {
    /// Create a pending split
    pub fn pending(member_id: MemberId, amount: Decimal) -> Self {
        Self {
            member_id,
            amount,
            status: SplitStatus::Pending,
        }
    }

    /// Whether the split still represents outstanding debt
    pub fn is_outstanding(&self) -> bool {
        self.status != SplitStatus::Confirmed
    }
}

/// Shared expense fronted by one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Owning group
    pub group_id: GroupId,

    /// Short description
    #[serde(default)]
    pub title: String,

    /// Member who fronted the money
    pub paid_by: MemberId,

    /// Total amount, tax and tip inclusive
    pub total_amount: Decimal,

    /// Tax portion of the total
    #[serde(default)]
    pub tax: Option<Decimal>,

    /// Tip portion of the total
    #[serde(default)]
    pub tip: Option<Decimal>,

    /// Expense date
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,

    /// Per-member shares, in entry order
    pub splits: Vec<Split>,
}

impl Expense {
    /// Create a new expense dated now
    pub fn new(
        group_id: GroupId,
        paid_by: MemberId,
        total_amount: Decimal,
        splits: Vec<Split>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            title: String::new(),
            paid_by,
            total_amount,
            tax: None,
            tip: None,
            date: Utc::now(),
            splits,
        }
    }

    /// Sum of all split amounts, regardless of status
    pub fn split_total(&self) -> Decimal {
        self.splits.iter().map(|s| s.amount).sum()
    }
}

/// A member's position within one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Member ID
    pub member_id: MemberId,

    /// Group ID
    pub group_id: GroupId,

    /// Amounts this member owes, keyed by creditor
    pub owes: HashMap<MemberId, Decimal>,

    /// Amounts owed to this member, keyed by debtor
    pub owed_by: HashMap<MemberId, Decimal>,

    /// Net position (positive = owed money, negative = owes money)
    pub net_balance: Decimal,
}

impl Balance {
    /// Create an empty balance
    pub fn new(member_id: MemberId, group_id: GroupId) -> Self {
        Self {
            member_id,
            group_id,
            owes: HashMap::new(),
            owed_by: HashMap::new(),
            net_balance: Decimal::ZERO,
        }
    }

    /// Record that this member owes `creditor`
    pub fn add_owes(&mut self, creditor: &MemberId, amount: Decimal) {
        *self.owes.entry(creditor.clone()).or_insert(Decimal::ZERO) += amount;
    }

    /// Record that `debtor` owes this member
    pub fn add_owed_by(&mut self, debtor: &MemberId, amount: Decimal) {
        *self.owed_by.entry(debtor.clone()).or_insert(Decimal::ZERO) += amount;
    }

    /// Total this member owes
    pub fn total_owes(&self) -> Decimal {
        self.owes.values().copied().sum()
    }

    /// Total owed to this member
    pub fn total_owed_by(&self) -> Decimal {
        self.owed_by.values().copied().sum()
    }

    /// Re-derive `net_balance` from the two maps
    pub fn recompute_net(&mut self) {
        self.net_balance = self.total_owed_by() - self.total_owes();
    }

    /// Check if net creditor
    pub fn is_creditor(&self) -> bool {
        self.net_balance > Decimal::ZERO
    }

    /// Check if net debtor
    pub fn is_debtor(&self) -> bool {
        self.net_balance < Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_net() {
        let alice = MemberId::new("alice");
        let bob = MemberId::new("bob");
        let carol = MemberId::new("carol");
        let mut balance = Balance::new(alice, GroupId::new("flat"));

        balance.add_owes(&bob, dec!(40.00));
        balance.add_owes(&bob, dec!(10.00));
        balance.add_owed_by(&carol, dec!(75.50));
        balance.recompute_net();

        assert_eq!(balance.owes[&bob], dec!(50.00));
        assert_eq!(balance.total_owes(), dec!(50.00));
        assert_eq!(balance.total_owed_by(), dec!(75.50));
        assert_eq!(balance.net_balance, dec!(25.50));
        assert!(balance.is_creditor());
        assert!(!balance.is_debtor());
    }

    #[test]
    fn test_expense_json_defaults() {
        let json = r#"{
            "group_id": "flat",
            "paid_by": "alice",
            "total_amount": "100.00",
            "splits": [
                { "member_id": "alice", "amount": "50.00", "status": "confirmed" },
                { "member_id": "bob", "amount": "50.00" }
            ]
        }"#;

        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.paid_by, MemberId::new("alice"));
        assert_eq!(expense.splits[0].status, SplitStatus::Confirmed);
        assert_eq!(expense.splits[1].status, SplitStatus::Pending);
        assert_eq!(expense.split_total(), dec!(100.00));
        assert!(expense.tax.is_none());
    }
}
