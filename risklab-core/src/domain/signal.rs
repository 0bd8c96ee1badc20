//! StrategySignal — a candidate trade produced by the external signal generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Strategy family that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Breakout,
    Trend,
    CounterTrend,
}

impl StrategyKind {
    /// Position direction the simulator assumes for this strategy family.
    ///
    /// `Trend` signals are traded short; `Breakout` and `CounterTrend` long.
    pub fn direction(self) -> Direction {
        match self {
            StrategyKind::Trend => Direction::Short,
            StrategyKind::Breakout | StrategyKind::CounterTrend => Direction::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Breakout => "breakout",
            StrategyKind::Trend => "trend",
            StrategyKind::CounterTrend => "counter_trend",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier attached to a signal by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Extreme => "extreme",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long or short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

/// A generated trading signal. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub kind: StrategyKind,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Strategy score, 0–100.
    pub score: f64,
    /// Generator confidence, 0.0–1.0.
    pub confidence: f64,
    pub risk_tier: RiskTier,
    /// Feature snapshot taken at generation time. Carried, never read by the engine.
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl StrategySignal {
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }
}
