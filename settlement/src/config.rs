//! Configuration for the settlement engine

use ledger_core::{money::DEFAULT_EPSILON, AggregationPolicy};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Netting configuration
    pub netting: NettingConfig,

    /// Balance aggregation policy
    pub aggregation: AggregationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            netting: NettingConfig::default(),
            aggregation: AggregationPolicy::default(),
        }
    }
}

/// Netting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// Amounts at or below this are treated as settled (default: 0.01)
    pub epsilon: Decimal,
}

impl Default for NettingConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(epsilon) = std::env::var("SETTLEMENT_EPSILON") {
            config.netting.epsilon = Decimal::from_str(epsilon.trim()).map_err(|e| {
                crate::Error::Config(format!("Invalid SETTLEMENT_EPSILON '{}': {}", epsilon, e))
            })?;
        }

        if let Ok(policy) = std::env::var("SETTLEMENT_UNKNOWN_MEMBERS") {
            config.aggregation.unknown_members = policy.parse()?;
        }

        if let Ok(flag) = std::env::var("SETTLEMENT_VALIDATE_SPLIT_TOTALS") {
            config.aggregation.validate_split_totals = parse_flag(&flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.netting.epsilon <= Decimal::ZERO {
            return Err(crate::Error::Config(format!(
                "netting.epsilon must be positive, got {}",
                self.netting.epsilon
            )));
        }
        self.aggregation.validate()?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(crate::Error::Config(format!("Invalid boolean '{}'", other))),
    }
}
