//! Settlement CLI
//!
//! Usage: `settle <ledger.json> [config.toml]`
//!
//! Reads a group ledger (`group_id`, `members`, `expenses`, and optional
//! `drafts` whose splits are built on load) and prints the group's balances,
//! the proposed settlements and netting statistics as JSON.
//! Without a config file the configuration is taken from the environment.

use anyhow::{bail, Context};
use ledger_core::{Balance, Expense, ExpenseDraft, GroupId, MemberId};
use serde::{Deserialize, Serialize};
use settlement::{Config, NettingStats, SettlementEngine, SettlementPlan};

#[derive(Debug, Deserialize)]
struct LedgerFile {
    group_id: GroupId,
    members: Vec<MemberId>,
    #[serde(default)]
    expenses: Vec<Expense>,
    #[serde(default)]
    drafts: Vec<ExpenseDraft>,
}

#[derive(Debug, Serialize)]
struct Report {
    group_id: GroupId,
    balances: Vec<Balance>,
    plan: SettlementPlan,
    stats: NettingStats,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(ledger_path) = args.next() else {
        bail!("usage: settle <ledger.json> [config.toml]");
    };

    let config = match args.next() {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => Config::from_env().context("failed to load config from environment")?,
    };

    let content = std::fs::read_to_string(&ledger_path)
        .with_context(|| format!("failed to read {}", ledger_path))?;
    let mut ledger: LedgerFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", ledger_path))?;

    for (index, draft) in std::mem::take(&mut ledger.drafts).into_iter().enumerate() {
        let expense = draft
            .build()
            .with_context(|| format!("failed to build draft #{}", index))?;
        ledger.expenses.push(expense);
    }

    let engine = SettlementEngine::new(config)?;
    let snapshot = engine.recompute_balances(&ledger.group_id, &ledger.members, &ledger.expenses)?;
    let plan = engine.suggest_settlements(&ledger.group_id)?;
    let stats = engine.statistics(&ledger.group_id)?;

    let report = Report {
        group_id: ledger.group_id,
        balances: snapshot.sorted_balances(),
        plan,
        stats,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
