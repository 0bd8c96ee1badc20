//! Signal gate — admits or rejects candidate signals.
//!
//! The adaptive gate evaluates a short-circuiting rule chain (static score
//! floor, dynamic score floor, risk tier, confidence floor) and, after each
//! executed batch, retunes its own thresholds from realized outcomes.
//! A pass-through [`OpenGate`] is provided as a baseline.
//!
//! # Architecture invariant
//! Gates never see ledger state; they decide from the signal and their own
//! policy only.

pub mod adapt;
pub mod policy;
pub mod window;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{RiskTier, StrategySignal};

pub use adapt::{adapt, AdaptAction, AdaptReport, BatchPerformance, NO_LOSS_PROFIT_FACTOR};
pub use policy::{GateConfig, GatePolicy, GateStats, PolicySnapshot};
pub use window::ScoreWindow;

/// Why the gate turned a signal away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RejectReason {
    ScoreBelowFloor { score: f64, floor: f64 },
    BelowDynamicThreshold { score: f64, threshold: f64 },
    RiskTierBlocked { tier: RiskTier },
    ConfidenceBelowFloor { confidence: f64, floor: f64 },
}

impl RejectReason {
    /// Stable rule name, matching the serialized tag.
    pub fn rule(&self) -> &'static str {
        match self {
            RejectReason::ScoreBelowFloor { .. } => "score_below_floor",
            RejectReason::BelowDynamicThreshold { .. } => "below_dynamic_threshold",
            RejectReason::RiskTierBlocked { .. } => "risk_tier_blocked",
            RejectReason::ConfidenceBelowFloor { .. } => "confidence_below_floor",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ScoreBelowFloor { score, floor } => {
                write!(f, "score below floor: {score:.1} < {floor:.1}")
            }
            RejectReason::BelowDynamicThreshold { score, threshold } => {
                write!(f, "score below dynamic threshold: {score:.1} < {threshold:.1}")
            }
            RejectReason::RiskTierBlocked { tier } => write!(f, "risk tier not allowed: {tier}"),
            RejectReason::ConfidenceBelowFloor { confidence, floor } => {
                write!(f, "confidence below floor: {confidence:.2} < {floor:.2}")
            }
        }
    }
}

/// Verdict for a single signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Accepted { score: f64, confidence: f64 },
    Rejected(RejectReason),
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            GateDecision::Rejected(reason) => Some(*reason),
            GateDecision::Accepted { .. } => None,
        }
    }

    /// Human-readable reason, for accepted and rejected signals alike.
    pub fn reason(&self) -> String {
        match self {
            GateDecision::Accepted { score, confidence } => {
                format!("accepted: score {score:.1}, confidence {confidence:.2}")
            }
            GateDecision::Rejected(reason) => reason.to_string(),
        }
    }
}

/// Trait for signal gates.
///
/// `evaluate` may update internal state on acceptance (e.g. the score
/// window); `adapt` is called once per executed batch with the realized pnl
/// of every trade in it.
pub trait SignalGate: Send + Sync {
    /// Human-readable name (e.g., "adaptive_gate", "open_gate").
    fn name(&self) -> &str;

    fn evaluate(&mut self, signal: &StrategySignal) -> GateDecision;

    /// Returns `None` for gates that do not adapt.
    fn adapt(&mut self, realized_pnls: &[f64]) -> Option<AdaptReport>;

    /// Current policy, for gates that have one.
    fn policy(&self) -> Option<&GatePolicy>;
}

/// Score/confidence/risk-tier gate with self-tuning thresholds.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveGate {
    policy: GatePolicy,
}

impl AdaptiveGate {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            policy: GatePolicy::from_config(config),
        }
    }

    pub fn stats(&self) -> GateStats {
        self.policy.stats()
    }
}

impl SignalGate for AdaptiveGate {
    fn name(&self) -> &str {
        "adaptive_gate"
    }

    fn evaluate(&mut self, signal: &StrategySignal) -> GateDecision {
        self.policy.should_execute(signal)
    }

    fn adapt(&mut self, realized_pnls: &[f64]) -> Option<AdaptReport> {
        Some(adapt(&mut self.policy, realized_pnls))
    }

    fn policy(&self) -> Option<&GatePolicy> {
        Some(&self.policy)
    }
}

/// No-op gate. Accepts every signal and never adapts.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl SignalGate for OpenGate {
    fn name(&self) -> &str {
        "open_gate"
    }

    fn evaluate(&mut self, signal: &StrategySignal) -> GateDecision {
        GateDecision::Accepted {
            score: signal.score,
            confidence: signal.confidence,
        }
    }

    fn adapt(&mut self, _realized_pnls: &[f64]) -> Option<AdaptReport> {
        None
    }

    fn policy(&self) -> Option<&GatePolicy> {
        None
    }
}
