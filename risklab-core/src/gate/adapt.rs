//! Threshold adaptation from realized trade outcomes.
//!
//! A hysteresis controller with fixed additive steps:
//!
//! | Condition                              | min_score     | min_confidence  | high risk |
//! |----------------------------------------|---------------|-----------------|-----------|
//! | no trades                              | −1, floor 70  | −0.02, floor 0.3 | unchanged |
//! | win rate > 60% and profit factor > 1.2 | −2, floor 70  | −0.05, floor 0.3 | allowed   |
//! | win rate < 45% or profit factor < 1.0  | +2, cap 95    | +0.05, cap 0.8   | blocked   |
//! | otherwise                              | unchanged     | unchanged        | unchanged |

use serde::{Deserialize, Serialize};
use tracing::info;

use super::policy::{GatePolicy, PolicySnapshot};

const SCORE_FLOOR: f64 = 70.0;
const SCORE_CAP: f64 = 95.0;
const CONFIDENCE_FLOOR: f64 = 0.3;
const CONFIDENCE_CAP: f64 = 0.8;

const NUDGE_SCORE_STEP: f64 = 1.0;
const NUDGE_CONFIDENCE_STEP: f64 = 0.02;
const SCORE_STEP: f64 = 2.0;
const CONFIDENCE_STEP: f64 = 0.05;

const RELAX_WIN_RATE_PCT: f64 = 60.0;
const RELAX_PROFIT_FACTOR: f64 = 1.2;
const TIGHTEN_WIN_RATE_PCT: f64 = 45.0;
const TIGHTEN_PROFIT_FACTOR: f64 = 1.0;

/// Profit factor reported when a batch has no losing trades.
pub const NO_LOSS_PROFIT_FACTOR: f64 = 2.0;

/// What `adapt` did to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptAction {
    /// No trades: small relaxation to escape a zero-signal regime.
    Nudged,
    Relaxed,
    Tightened,
    Held,
}

/// Win rate and profit factor of a batch of realized trades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchPerformance {
    pub trade_count: usize,
    /// Fraction of trades with pnl > 0.
    pub win_rate: f64,
    /// Gross profit / |gross loss|, or [`NO_LOSS_PROFIT_FACTOR`] without losers.
    pub profit_factor: f64,
}

impl BatchPerformance {
    /// `None` for an empty batch.
    pub fn from_pnls(pnls: &[f64]) -> Option<Self> {
        if pnls.is_empty() {
            return None;
        }
        let wins = pnls.iter().filter(|&&p| p > 0.0).count();
        let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
        let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).sum();
        let profit_factor = if gross_loss < 0.0 {
            gross_profit / gross_loss.abs()
        } else {
            NO_LOSS_PROFIT_FACTOR
        };
        Some(Self {
            trade_count: pnls.len(),
            win_rate: wins as f64 / pnls.len() as f64,
            profit_factor,
        })
    }

    fn win_rate_pct(&self) -> f64 {
        self.win_rate * 100.0
    }
}

/// Result of one adaptation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptReport {
    pub action: AdaptAction,
    pub performance: Option<BatchPerformance>,
    pub before: PolicySnapshot,
    pub after: PolicySnapshot,
}

/// Adjust `policy` thresholds from the pnl of every trade executed in the batch.
pub fn adapt(policy: &mut GatePolicy, realized_pnls: &[f64]) -> AdaptReport {
    let before = policy.snapshot();

    let performance = BatchPerformance::from_pnls(realized_pnls);
    let action = match performance {
        None => {
            policy.min_score = (policy.min_score - NUDGE_SCORE_STEP).max(SCORE_FLOOR);
            policy.min_confidence =
                (policy.min_confidence - NUDGE_CONFIDENCE_STEP).max(CONFIDENCE_FLOOR);
            AdaptAction::Nudged
        }
        Some(perf)
            if perf.win_rate_pct() > RELAX_WIN_RATE_PCT
                && perf.profit_factor > RELAX_PROFIT_FACTOR =>
        {
            policy.min_score = (policy.min_score - SCORE_STEP).max(SCORE_FLOOR);
            policy.min_confidence = (policy.min_confidence - CONFIDENCE_STEP).max(CONFIDENCE_FLOOR);
            policy.allow_high_risk = true;
            AdaptAction::Relaxed
        }
        Some(perf)
            if perf.win_rate_pct() < TIGHTEN_WIN_RATE_PCT
                || perf.profit_factor < TIGHTEN_PROFIT_FACTOR =>
        {
            policy.min_score = (policy.min_score + SCORE_STEP).min(SCORE_CAP);
            policy.min_confidence = (policy.min_confidence + CONFIDENCE_STEP).min(CONFIDENCE_CAP);
            policy.allow_high_risk = false;
            AdaptAction::Tightened
        }
        Some(_) => AdaptAction::Held,
    };

    let after = policy.snapshot();
    info!(
        ?action,
        trades = realized_pnls.len(),
        win_rate = performance.map(|p| p.win_rate),
        profit_factor = performance.map(|p| p.profit_factor),
        min_score = after.min_score,
        min_confidence = after.min_confidence,
        allow_high_risk = after.allow_high_risk,
        "gate policy adapted"
    );

    AdaptReport {
        action,
        performance,
        before,
        after,
    }
}
