//! Run fingerprinting — deterministic identification of a risk run.
//!
//! - `ConfigHash`: BLAKE3 of the canonical risk config JSON.
//! - `DatasetHash`: BLAKE3 over every bar (symbols in sorted order) and every
//!   signal in stream order.
//! - `RunFingerprint`: the record written into each report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, RiskConfig};
use crate::domain::{ConfigHash, DatasetHash, MarketData, RunId, StrategySignal};

/// Content hash of the bars and signals a run consumed.
///
/// Hashes raw field bytes rather than a serialized form, so float formatting
/// cannot change the result.
pub fn dataset_hash(market: &MarketData, signals: &[StrategySignal]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();

    for symbol in market.symbols() {
        hasher.update(symbol.as_bytes());
        if let Some(series) = market.get(&symbol) {
            hasher.update(&(series.len() as u64).to_le_bytes());
            for bar in series.bars() {
                hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
                for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                    hasher.update(&v.to_le_bytes());
                }
            }
        }
    }

    hasher.update(&(signals.len() as u64).to_le_bytes());
    for s in signals {
        hasher.update(s.symbol.as_bytes());
        hasher.update(&s.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(s.kind.as_str().as_bytes());
        hasher.update(s.risk_tier.as_str().as_bytes());
        for v in [s.entry_price, s.stop_loss, s.take_profit, s.score, s.confidence] {
            hasher.update(&v.to_le_bytes());
        }
        for (name, value) in &s.features {
            hasher.update(name.as_bytes());
            hasher.update(&value.to_le_bytes());
        }
    }

    DatasetHash(hasher.finalize().to_hex().to_string())
}

/// Complete identity of one risk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub symbols: Vec<String>,
    pub bar_count: usize,
    pub signal_count: usize,
}

impl RunFingerprint {
    pub fn new(
        config: &RiskConfig,
        market: &MarketData,
        signals: &[StrategySignal],
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let config_hash = config.config_hash()?;
        let dataset_hash = dataset_hash(market, signals);
        let run_id = RunId::new(config_hash.clone(), dataset_hash.clone(), seed).hash();
        Ok(Self {
            run_id,
            created_at: Utc::now(),
            seed,
            config_hash,
            dataset_hash,
            symbols: market.symbols(),
            bar_count: market.bar_count(),
            signal_count: signals.len(),
        })
    }
}
