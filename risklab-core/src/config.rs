//! Risk configuration — gate, ledger and simulator settings in one document.
//!
//! Every section uses `#[serde(default)]`, so a TOML file only needs the keys
//! it changes:
//!
//! ```toml
//! [gate]
//! min_score = 85.0
//!
//! [ledger]
//! max_position_pct = 0.20
//!
//! [ledger.retrain]
//! max_consecutive_losses = 5
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ConfigHash;
use crate::gate::GateConfig;
use crate::ledger::LedgerConfig;
use crate::simulator::SimulatorConfig;

/// Top-level tables a risk document may contain.
pub const RISK_SECTIONS: [&str; 3] = ["gate", "ledger", "simulator"];

/// Upper bound for `simulator.neutral_exit_minutes` (seven days).
pub const MAX_NEUTRAL_EXIT_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to parse risk config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize risk config: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub gate: GateConfig,
    pub ledger: LedgerConfig,
    pub simulator: SimulatorConfig,
}

impl RiskConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(text)?;
        if let Some(key) = table.keys().find(|k| !RISK_SECTIONS.contains(&k.as_str())) {
            return Err(ConfigError::invalid(key.as_str(), "unknown section"));
        }
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gate(&self.gate)?;
        self.ledger.validate()?;
        if self.simulator.max_lookahead_bars == 0 {
            return Err(ConfigError::invalid(
                "simulator.max_lookahead_bars",
                "must be at least 1",
            ));
        }
        if !(0..=MAX_NEUTRAL_EXIT_MINUTES).contains(&self.simulator.neutral_exit_minutes) {
            return Err(ConfigError::invalid(
                "simulator.neutral_exit_minutes",
                format!(
                    "must be in [0, {MAX_NEUTRAL_EXIT_MINUTES}], got {}",
                    self.simulator.neutral_exit_minutes
                ),
            ));
        }
        Ok(())
    }

    /// BLAKE3 of the canonical JSON form.
    pub fn config_hash(&self) -> Result<ConfigHash, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(ConfigHash::from_bytes(&json))
    }
}

fn validate_gate(gate: &GateConfig) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&gate.min_score) {
        return Err(ConfigError::invalid(
            "gate.min_score",
            format!("must be in [0, 100], got {}", gate.min_score),
        ));
    }
    if !(0.0..=1.0).contains(&gate.min_confidence) {
        return Err(ConfigError::invalid(
            "gate.min_confidence",
            format!("must be in [0, 1], got {}", gate.min_confidence),
        ));
    }
    if gate.dynamic_threshold && gate.rolling_window == 0 {
        return Err(ConfigError::invalid(
            "gate.rolling_window",
            "must be at least 1 when the dynamic threshold is enabled",
        ));
    }
    Ok(())
}
