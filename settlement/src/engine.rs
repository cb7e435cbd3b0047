//! Group settlement engine
//!
//! Holds the latest balance snapshot per group and answers settlement
//! requests against it.
//!
//! # Consistency
//!
//! Each group has its own lock, held only to swap or read the snapshot.
//! Aggregation runs before the lock is taken and the finished snapshot
//! replaces the previous one whole, so a reader sees either the previous
//! snapshot or the new one, never a mix. Every recomputation draws a
//! revision number when it starts; a snapshot only replaces an older
//! revision. Different groups never contend, and a group only gets a slot
//! once a recomputation for it succeeds.

use crate::{
    config::Config,
    metrics::Metrics,
    netting::SettlementOptimizer,
    types::*,
    Error, Result,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ledger_core::{Balance, BalanceAggregator, Expense, GroupId, MemberId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Balances of one group as of the last recomputation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Group ID
    pub group_id: GroupId,

    /// One balance per member
    pub balances: HashMap<MemberId, Balance>,

    /// Number of the group's expenses aggregated
    pub expense_count: usize,

    /// Σ total amounts of the group's expenses
    pub total_spent: Decimal,

    /// Recomputation timestamp
    pub computed_at: DateTime<Utc>,

    /// Engine-wide revision, increasing in recomputation start order
    pub revision: u64,
}

impl GroupSnapshot {
    /// Balances ordered by member ID
    pub fn sorted_balances(&self) -> Vec<Balance> {
        let mut balances: Vec<Balance> = self.balances.values().cloned().collect();
        balances.sort_by(|a, b| a.member_id.cmp(&b.member_id));
        balances
    }

    /// Σ pairwise obligations and their count
    fn gross_obligations(&self) -> (Decimal, usize) {
        self.balances.values().fold((Decimal::ZERO, 0), |(sum, count), b| {
            (sum + b.total_owes(), count + b.owes.len())
        })
    }
}

type GroupSlot = Arc<Mutex<Option<GroupSnapshot>>>;

/// Settlement engine
#[derive(Debug)]
pub struct SettlementEngine {
    /// Balance aggregator
    aggregator: BalanceAggregator,

    /// Settlement optimizer
    optimizer: SettlementOptimizer,

    /// Latest snapshot per group
    groups: DashMap<GroupId, GroupSlot>,

    /// Next snapshot revision
    next_revision: AtomicU64,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let aggregator = BalanceAggregator::new(config.aggregation.clone())?;
        let optimizer = SettlementOptimizer::new(config.netting.epsilon)?;
        let metrics = Metrics::new()?;

        tracing::info!(
            "Starting {} v{} (epsilon {})",
            config.service_name,
            config.service_version,
            config.netting.epsilon
        );

        Ok(Self {
            aggregator,
            optimizer,
            groups: DashMap::new(),
            next_revision: AtomicU64::new(1),
            metrics,
            config,
        })
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Recompute a group's balances and replace its snapshot
    ///
    /// Call after every change to the group's expense ledger. On error the
    /// previous snapshot is kept. Returns the snapshot stored for the group
    /// afterwards, which is a newer one if a later recomputation finished
    /// first.
    pub fn recompute_balances(
        &self,
        group_id: &GroupId,
        members: &[MemberId],
        expenses: &[Expense],
    ) -> Result<GroupSnapshot> {
        let revision = self.next_revision.fetch_add(1, Ordering::Relaxed);

        let balances = self.aggregator.compute(group_id, members, expenses)?;

        let (expense_count, total_spent) = expenses
            .iter()
            .filter(|e| &e.group_id == group_id)
            .fold((0usize, Decimal::ZERO), |(count, sum), e| {
                (count + 1, sum + e.total_amount)
            });

        let snapshot = GroupSnapshot {
            group_id: group_id.clone(),
            balances,
            expense_count,
            total_spent,
            computed_at: Utc::now(),
            revision,
        };

        let stored = self.install(snapshot);

        self.metrics.record_recomputation();
        self.metrics.set_tracked_groups(self.tracked_group_count());

        tracing::info!(
            "Recomputed group {}: {} members, {} expenses, {} spent",
            group_id,
            stored.balances.len(),
            stored.expense_count,
            stored.total_spent
        );

        Ok(stored)
    }

    /// Latest snapshot for a group
    pub fn snapshot(&self, group_id: &GroupId) -> Option<GroupSnapshot> {
        let slot = self.groups.get(group_id).map(|s| Arc::clone(s.value()))?;
        let current = slot.lock();
        current.clone()
    }

    /// Propose settlements from the group's latest snapshot
    pub fn suggest_settlements(&self, group_id: &GroupId) -> Result<SettlementPlan> {
        let snapshot = self
            .snapshot(group_id)
            .ok_or_else(|| Error::UnknownGroup(group_id.clone()))?;

        Ok(self.plan(&snapshot))
    }

    /// Netting statistics for the group's latest snapshot
    pub fn statistics(&self, group_id: &GroupId) -> Result<NettingStats> {
        let snapshot = self
            .snapshot(group_id)
            .ok_or_else(|| Error::UnknownGroup(group_id.clone()))?;
        let plan = self.plan(&snapshot);

        let (gross_outstanding, gross_obligation_count) = snapshot.gross_obligations();
        let net_transfer_total = plan.total_settled();

        Ok(NettingStats {
            member_count: snapshot.balances.len(),
            expense_count: snapshot.expense_count,
            total_spent: snapshot.total_spent,
            gross_obligation_count,
            gross_outstanding,
            settlement_count: plan.len(),
            net_transfer_total,
            amount_saved: gross_outstanding - net_transfer_total,
            transfers_eliminated: gross_obligation_count.saturating_sub(plan.len()),
            efficiency: NettingStats::calculate_efficiency(gross_outstanding, net_transfer_total),
        })
    }

    /// Drop a group's snapshot
    pub fn remove_group(&self, group_id: &GroupId) -> Option<GroupSnapshot> {
        let (_, slot) = self.groups.remove(group_id)?;
        self.metrics.set_tracked_groups(self.tracked_group_count());
        let snapshot = slot.lock().take();
        snapshot
    }

    /// Number of groups with a snapshot
    ///
    /// Slots are only created by successful recomputations and removed
    /// whole, so this never touches a group's lock.
    pub fn tracked_group_count(&self) -> usize {
        self.groups.len()
    }

    fn plan(&self, snapshot: &GroupSnapshot) -> SettlementPlan {
        let started = Instant::now();
        let plan = self
            .optimizer
            .optimize(&snapshot.group_id, &snapshot.sorted_balances());

        self.metrics.record_plan(
            plan.len(),
            plan.has_residual(),
            started.elapsed().as_secs_f64(),
        );

        plan
    }

    /// Store a snapshot unless a newer revision is already in place
    fn install(&self, snapshot: GroupSnapshot) -> GroupSnapshot {
        let slot = self.slot(&snapshot.group_id);
        let mut current = slot.lock();
        match current.as_ref() {
            Some(existing) if existing.revision > snapshot.revision => {
                tracing::debug!(
                    "Group {}: revision {} superseded by {}",
                    snapshot.group_id,
                    snapshot.revision,
                    existing.revision
                );
                existing.clone()
            }
            _ => {
                *current = Some(snapshot.clone());
                snapshot
            }
        }
    }

    fn slot(&self, group_id: &GroupId) -> GroupSlot {
        // Clone the Arc so the map shard is released before locking the group
        Arc::clone(
            self.groups
                .entry(group_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        )
    }
}
