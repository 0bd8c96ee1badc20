//! Gate policy — admission thresholds and the evaluation rule chain.

use serde::{Deserialize, Serialize};

use super::window::ScoreWindow;
use super::{GateDecision, RejectReason};
use crate::domain::{RiskTier, StrategySignal};

/// Initial gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub min_score: f64,
    pub min_confidence: f64,
    pub allow_high_risk: bool,
    pub dynamic_threshold: bool,
    /// Number of accepted scores the dynamic threshold looks at.
    pub rolling_window: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_score: 80.0,
            min_confidence: 0.4,
            allow_high_risk: true,
            dynamic_threshold: true,
            rolling_window: 20,
        }
    }
}

/// Mutable admission policy for one backtest run.
///
/// Thresholds move only through [`super::adapt`]; the score window moves only
/// when a signal is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub min_score: f64,
    pub min_confidence: f64,
    pub allow_high_risk: bool,
    pub dynamic_threshold_enabled: bool,
    pub window: ScoreWindow,
}

/// Threshold values only, for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub min_score: f64,
    pub min_confidence: f64,
    pub allow_high_risk: bool,
}

/// Observability view of the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateStats {
    pub min_score: f64,
    /// Effective dynamic floor, `None` when disabled. Equals `min_score`
    /// until the window fills.
    pub dynamic_threshold: Option<f64>,
    pub recent_mean_score: Option<f64>,
    pub recent_std_score: Option<f64>,
    pub buffered_scores: usize,
    pub recent_scores: usize,
    pub min_confidence: f64,
    pub allow_high_risk: bool,
}

impl GatePolicy {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            min_score: config.min_score,
            min_confidence: config.min_confidence,
            allow_high_risk: config.allow_high_risk,
            dynamic_threshold_enabled: config.dynamic_threshold,
            window: ScoreWindow::new(config.rolling_window),
        }
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            min_score: self.min_score,
            min_confidence: self.min_confidence,
            allow_high_risk: self.allow_high_risk,
        }
    }

    /// The score floor currently in force: `max(mean + 0.5·std, min_score)`
    /// when the dynamic threshold is on and the window is full, else `min_score`.
    pub fn effective_floor(&self) -> f64 {
        if !self.dynamic_threshold_enabled {
            return self.min_score;
        }
        match self.window.dynamic_threshold() {
            Some(dynamic) => dynamic.max(self.min_score),
            None => self.min_score,
        }
    }

    pub fn allows_tier(&self, tier: RiskTier) -> bool {
        match tier {
            RiskTier::Low | RiskTier::Medium => true,
            RiskTier::High => self.allow_high_risk,
            RiskTier::Extreme => false,
        }
    }

    /// Run the rule chain against a signal. First failing rule wins.
    ///
    /// Accepting a signal pushes its score into the rolling window.
    pub fn should_execute(&mut self, signal: &StrategySignal) -> GateDecision {
        if let Some(reason) = self.check(signal) {
            return GateDecision::Rejected(reason);
        }
        self.window.push(signal.score);
        GateDecision::Accepted {
            score: signal.score,
            confidence: signal.confidence,
        }
    }

    /// Rule chain without side effects.
    pub fn check(&self, signal: &StrategySignal) -> Option<RejectReason> {
        if signal.score < self.min_score {
            return Some(RejectReason::ScoreBelowFloor {
                score: signal.score,
                floor: self.min_score,
            });
        }

        if self.dynamic_threshold_enabled {
            if let Some(dynamic) = self.window.dynamic_threshold() {
                let floor = dynamic.max(self.min_score);
                if signal.score < floor {
                    return Some(RejectReason::BelowDynamicThreshold {
                        score: signal.score,
                        threshold: floor,
                    });
                }
            }
        }

        if !self.allows_tier(signal.risk_tier) {
            return Some(RejectReason::RiskTierBlocked {
                tier: signal.risk_tier,
            });
        }

        if signal.confidence < self.min_confidence {
            return Some(RejectReason::ConfidenceBelowFloor {
                confidence: signal.confidence,
                floor: self.min_confidence,
            });
        }

        None
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            min_score: self.min_score,
            dynamic_threshold: self
                .dynamic_threshold_enabled
                .then(|| self.effective_floor()),
            recent_mean_score: self.window.mean(),
            recent_std_score: self.window.std_dev(),
            buffered_scores: self.window.len(),
            recent_scores: self.window.recent().len(),
            min_confidence: self.min_confidence,
            allow_high_risk: self.allow_high_risk,
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}
