//! Serializable run configuration.
//!
//! A run file has a `[run]` section for inputs and execution, plus the risk
//! sections (`[gate]`, `[ledger]`, `[ledger.retrain]`, `[simulator]`). Keys
//! left out of the file take the values of [`RunConfig::default`], which is
//! the reference backtest preset, not the stand-alone component defaults.
//!
//! ```toml
//! [run]
//! bars = "data/bars.csv"
//! signals = "data/signals.jsonl"
//! passes = 3
//!
//! [gate]
//! dynamic_threshold = true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use risklab_core::config::{ConfigError, RiskConfig, RISK_SECTIONS};

/// Content-addressable run identifier (hex BLAKE3).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("run config has an invalid shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error(transparent)]
    Risk(#[from] ConfigError),

    #[error("invalid value for `run.{field}`: {reason}")]
    InvalidRun { field: &'static str, reason: String },

    #[error("unknown section `[{0}]` in run config")]
    UnknownSection(String),
}

/// Inputs and execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// Bars CSV (`symbol,timestamp,open,high,low,close,volume`).
    pub bars: Option<PathBuf>,
    /// Signals as a JSON array or JSONL.
    pub signals: Option<PathBuf>,
    /// Only these symbols are run. Empty runs every symbol with signals.
    pub symbols: Vec<String>,
    /// Passes over the signal stream; the gate policy carries over.
    pub passes: usize,
    /// Run symbols on the rayon pool.
    pub parallel: bool,
    pub output_dir: Option<PathBuf>,
    /// Recorded in the fingerprint.
    pub seed: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            bars: None,
            signals: None,
            symbols: Vec::new(),
            passes: 1,
            parallel: true,
            output_dir: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(flatten)]
    pub risk: RiskConfig,
}

impl Default for RunConfig {
    /// Reference backtest preset: static 80 floor, 20% position cap, 50-trade
    /// Kelly lookback, 10,000 starting capital.
    fn default() -> Self {
        let mut risk = RiskConfig::default();
        risk.gate.min_score = 80.0;
        risk.gate.dynamic_threshold = false;
        risk.ledger.initial_capital = 10_000.0;
        risk.ledger.max_position_pct = 0.20;
        risk.ledger.kelly_lookback = 50;
        Self {
            run: RunSection::default(),
            risk,
        }
    }
}

impl RunConfig {
    /// Parse a run file, filling missing keys from the preset.
    pub fn from_toml_str(text: &str) -> Result<Self, RunConfigError> {
        let file: toml::Table = toml::from_str(text)?;
        if let Some(key) = file
            .keys()
            .find(|k| k.as_str() != "run" && !RISK_SECTIONS.contains(&k.as_str()))
        {
            return Err(RunConfigError::UnknownSection(key.clone()));
        }
        let mut merged = serde_json::to_value(Self::default())?;
        merge(&mut merged, serde_json::to_value(file)?);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.run.passes == 0 {
            return Err(RunConfigError::InvalidRun {
                field: "passes",
                reason: "must be at least 1".into(),
            });
        }
        self.risk.validate()?;
        Ok(())
    }

    /// Deterministic hash of the whole configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, RunConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

// Deep-merge `overlay` into `base`; tables merge key by key, everything else
// replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
