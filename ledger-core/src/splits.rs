//! Split construction
//!
//! Turns a draft expense into an [`Expense`] whose splits add up to the
//! total, tax and tip inclusive. Three methods are supported:
//!
//! - **Equal**: the total is shared evenly between the listed members
//! - **Custom**: each member's share of the subtotal is given explicitly
//! - **Itemized**: each item is shared evenly between its assignees
//!
//! Tax and tip are spread in proportion to each member's subtotal share.
//! Shares are whole cents; leftover cents go one at a time to members in
//! listing order. The payer's own split is created confirmed, every other
//! split pending.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::{Expense, GroupId, MemberId, Split, SplitStatus},
};

const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// One line of an itemized receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseItem {
    /// Item description
    pub name: String,

    /// Item price, before tax and tip
    pub amount: Decimal,

    /// Members sharing the item
    pub assigned_to: Vec<MemberId>,
}

impl ExpenseItem {
    /// Create an item
    pub fn new(name: impl Into<String>, amount: Decimal, assigned_to: Vec<MemberId>) -> Self {
        Self {
            name: name.into(),
            amount,
            assigned_to,
        }
    }
}

/// How the subtotal is divided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "with", rename_all = "lowercase")]
pub enum SplitMethod {
    /// Even shares between the listed members
    Equal(Vec<MemberId>),
    /// Explicit share of the subtotal per member
    Custom(Vec<(MemberId, Decimal)>),
    /// Per-item even shares
    Itemized(Vec<ExpenseItem>),
}

/// Expense under construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseDraft {
    /// Owning group
    pub group_id: GroupId,

    /// Member who fronted the money
    pub paid_by: MemberId,

    /// Short description
    #[serde(default)]
    pub title: String,

    /// Amount before tax and tip
    pub subtotal: Decimal,

    /// Tax on top of the subtotal
    #[serde(default)]
    pub tax: Option<Decimal>,

    /// Tip on top of the subtotal
    #[serde(default)]
    pub tip: Option<Decimal>,

    /// Split method
    pub method: SplitMethod,
}

impl ExpenseDraft {
    /// Share `subtotal` evenly between `members`
    pub fn equal(
        group_id: GroupId,
        paid_by: MemberId,
        subtotal: Decimal,
        members: Vec<MemberId>,
    ) -> Self {
        Self::with_method(group_id, paid_by, subtotal, SplitMethod::Equal(members))
    }

    /// Explicit shares; the subtotal is their sum
    pub fn custom(group_id: GroupId, paid_by: MemberId, shares: Vec<(MemberId, Decimal)>) -> Self {
        let subtotal = shares.iter().map(|(_, amount)| *amount).sum();
        Self::with_method(group_id, paid_by, subtotal, SplitMethod::Custom(shares))
    }

    /// Itemized receipt; the subtotal is the sum of item prices
    pub fn itemized(group_id: GroupId, paid_by: MemberId, items: Vec<ExpenseItem>) -> Self {
        let subtotal = items.iter().map(|item| item.amount).sum();
        Self::with_method(group_id, paid_by, subtotal, SplitMethod::Itemized(items))
    }

    fn with_method(
        group_id: GroupId,
        paid_by: MemberId,
        subtotal: Decimal,
        method: SplitMethod,
    ) -> Self {
        Self {
            group_id,
            paid_by,
            title: String::new(),
            subtotal,
            tax: None,
            tip: None,
            method,
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the tax
    pub fn with_tax(mut self, tax: Decimal) -> Self {
        self.tax = Some(tax);
        self
    }

    /// Set the tip
    pub fn with_tip(mut self, tip: Decimal) -> Self {
        self.tip = Some(tip);
        self
    }

    /// Tax plus tip
    pub fn extras(&self) -> Decimal {
        self.tax.unwrap_or_default() + self.tip.unwrap_or_default()
    }

    /// Subtotal plus tax and tip
    pub fn total(&self) -> Decimal {
        self.subtotal + self.extras()
    }

    /// Build the expense
    pub fn build(self) -> Result<Expense> {
        for (label, value) in [("subtotal", Some(self.subtotal)), ("tax", self.tax), ("tip", self.tip)] {
            if let Some(value) = value {
                if value < Decimal::ZERO {
                    return Err(Error::InvalidSplit(format!("negative {}: {}", label, value)));
                }
            }
        }

        let shares = match &self.method {
            SplitMethod::Equal(members) => {
                ensure_distinct(members)?;
                let weights = vec![Decimal::ONE; members.len()];
                members
                    .iter()
                    .cloned()
                    .zip(allocate(self.total(), &weights)?)
                    .collect()
            }
            SplitMethod::Custom(shares) => {
                let members: Vec<MemberId> = shares.iter().map(|(m, _)| m.clone()).collect();
                ensure_distinct(&members)?;
                if let Some((member, amount)) = shares.iter().find(|(_, a)| *a < Decimal::ZERO) {
                    return Err(Error::InvalidSplit(format!(
                        "negative share {} for {}",
                        amount, member
                    )));
                }
                if self.subtotal != shares.iter().map(|(_, a)| *a).sum::<Decimal>() {
                    return Err(Error::InvalidSplit(format!(
                        "custom shares do not add up to subtotal {}",
                        self.subtotal
                    )));
                }
                with_extras(shares.clone(), self.extras())?
            }
            SplitMethod::Itemized(items) => {
                let base = itemize(items)?;
                if self.subtotal != base.iter().map(|(_, a)| *a).sum::<Decimal>() {
                    return Err(Error::InvalidSplit(format!(
                        "items do not add up to subtotal {}",
                        self.subtotal
                    )));
                }
                with_extras(base, self.extras())?
            }
        };

        let splits: Vec<Split> = shares
            .into_iter()
            .map(|(member_id, amount)| {
                let status = if member_id == self.paid_by {
                    SplitStatus::Confirmed
                } else {
                    SplitStatus::Pending
                };
                Split {
                    member_id,
                    amount,
                    status,
                }
            })
            .collect();

        let total = self.total();
        let mut expense = Expense::new(self.group_id, self.paid_by, total, splits);
        expense.title = self.title;
        expense.tax = self.tax;
        expense.tip = self.tip;

        tracing::debug!(
            "Built expense {} ({} splits, total {})",
            expense.id,
            expense.splits.len(),
            expense.total_amount
        );

        Ok(expense)
    }
}

/// Divide `total` in proportion to `weights`, in whole cents
///
/// The shares always sum to `total` exactly. Zero-weight entries get zero.
/// Cents lost to truncation go one each to positive-weight entries in
/// order; any sub-cent remainder of `total` lands on the first of them.
pub fn allocate(total: Decimal, weights: &[Decimal]) -> Result<Vec<Decimal>> {
    if weights.iter().any(|w| *w < Decimal::ZERO) {
        return Err(Error::InvalidSplit("negative allocation weight".to_string()));
    }

    let weight_sum: Decimal = weights.iter().sum();
    if weight_sum.is_zero() {
        if total.is_zero() {
            return Ok(vec![Decimal::ZERO; weights.len()]);
        }
        return Err(Error::InvalidSplit(format!(
            "nothing to allocate {} against",
            total
        )));
    }

    let mut shares: Vec<Decimal> = weights
        .iter()
        .map(|w| (total * *w / weight_sum).round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .collect();

    let mut leftover = total - shares.iter().sum::<Decimal>();
    let step = if leftover.is_sign_negative() { -CENT } else { CENT };
    let receivers: Vec<usize> = (0..weights.len())
        .filter(|&i| weights[i] > Decimal::ZERO)
        .collect();

    for &i in receivers.iter().cycle() {
        if leftover.abs() < CENT {
            break;
        }
        shares[i] += step;
        leftover -= step;
    }

    // Sub-cent dust when `total` itself has more than two decimal places
    if !leftover.is_zero() {
        shares[receivers[0]] += leftover;
    }

    Ok(shares)
}

/// Per-member item totals, in first-assigned order
fn itemize(items: &[ExpenseItem]) -> Result<Vec<(MemberId, Decimal)>> {
    if items.is_empty() {
        return Err(Error::InvalidSplit("no items".to_string()));
    }

    let mut totals: Vec<(MemberId, Decimal)> = Vec::new();
    for item in items {
        if item.assigned_to.is_empty() {
            return Err(Error::InvalidSplit(format!("item '{}' has no assignees", item.name)));
        }
        if item.amount < Decimal::ZERO {
            return Err(Error::InvalidSplit(format!(
                "item '{}' has negative amount {}",
                item.name, item.amount
            )));
        }
        ensure_distinct(&item.assigned_to)?;

        let weights = vec![Decimal::ONE; item.assigned_to.len()];
        for (member, share) in item.assigned_to.iter().zip(allocate(item.amount, &weights)?) {
            match totals.iter_mut().find(|(m, _)| m == member) {
                Some((_, total)) => *total += share,
                None => totals.push((member.clone(), share)),
            }
        }
    }

    Ok(totals)
}

/// Add tax and tip to `base` in proportion to each share
fn with_extras(base: Vec<(MemberId, Decimal)>, extras: Decimal) -> Result<Vec<(MemberId, Decimal)>> {
    let weights: Vec<Decimal> = base.iter().map(|(_, amount)| *amount).collect();
    let extra_shares = allocate(extras, &weights)?;

    Ok(base
        .into_iter()
        .zip(extra_shares)
        .map(|((member, amount), extra)| (member, amount + extra))
        .collect())
}

fn ensure_distinct(members: &[MemberId]) -> Result<()> {
    if members.is_empty() {
        return Err(Error::InvalidSplit("no members to split between".to_string()));
    }
    for (i, member) in members.iter().enumerate() {
        if members[..i].contains(member) {
            return Err(Error::InvalidSplit(format!("{} listed twice", member)));
        }
    }
    Ok(())
}
