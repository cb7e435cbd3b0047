//! Metrics collection for observability
//!
//! Prometheus metrics for the settlement engine, kept in a private registry
//! so several engines can live in one process.
//!
//! # Metrics
//!
//! - `settlement_recomputations_total` - Balance recomputations
//! - `settlement_settlements_emitted_total` - Settlements proposed
//! - `settlement_residual_plans_total` - Plans that left an unsettled residual
//! - `settlement_optimize_duration_seconds` - Histogram of optimizer latencies
//! - `settlement_tracked_groups` - Groups with a balance snapshot

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Balance recomputations
    pub recomputations_total: IntCounter,

    /// Settlements proposed
    pub settlements_emitted_total: IntCounter,

    /// Plans with an unsettled residual
    pub residual_plans_total: IntCounter,

    /// Optimizer duration histogram
    pub optimize_duration: Histogram,

    /// Groups with a balance snapshot
    pub tracked_groups: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let recomputations_total = IntCounter::new(
            "settlement_recomputations_total",
            "Total number of balance recomputations",
        )?;
        registry.register(Box::new(recomputations_total.clone()))?;

        let settlements_emitted_total = IntCounter::new(
            "settlement_settlements_emitted_total",
            "Total number of settlements proposed",
        )?;
        registry.register(Box::new(settlements_emitted_total.clone()))?;

        let residual_plans_total = IntCounter::new(
            "settlement_residual_plans_total",
            "Plans that left an unsettled residual",
        )?;
        registry.register(Box::new(residual_plans_total.clone()))?;

        let optimize_duration = Histogram::with_opts(
            HistogramOpts::new(
                "settlement_optimize_duration_seconds",
                "Histogram of optimizer latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100]),
        )?;
        registry.register(Box::new(optimize_duration.clone()))?;

        let tracked_groups = IntGauge::new(
            "settlement_tracked_groups",
            "Groups with a balance snapshot",
        )?;
        registry.register(Box::new(tracked_groups.clone()))?;

        Ok(Self {
            recomputations_total,
            settlements_emitted_total,
            residual_plans_total,
            optimize_duration,
            tracked_groups,
            registry,
        })
    }

    /// Record balance recomputation
    pub fn record_recomputation(&self) {
        self.recomputations_total.inc();
    }

    /// Record an optimizer run
    pub fn record_plan(&self, settlement_count: usize, has_residual: bool, duration_seconds: f64) {
        self.settlements_emitted_total.inc_by(settlement_count as u64);
        if has_residual {
            self.residual_plans_total.inc();
        }
        self.optimize_duration.observe(duration_seconds);
    }

    /// Update tracked group count
    pub fn set_tracked_groups(&self, count: usize) {
        self.tracked_groups.set(count as i64);
    }

    /// Render in Prometheus text exposition format
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
