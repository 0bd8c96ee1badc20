//! Performance metrics — pure functions over a pass's results.
//!
//! Every metric is a pure function: capital curve and/or executed trades in,
//! scalar out. No dependencies on the runner or data loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use risklab_core::domain::Direction;
use risklab_core::engine::ExecutedTrade;

/// Aggregate performance metrics for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_return_pct: f64,
    pub avg_duration_minutes: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    /// Keyed by exit reason name (`profit`, `stop_loss`, `timeout`).
    pub exit_reasons: BTreeMap<String, usize>,
    pub long_trades: usize,
    pub short_trades: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from a capital curve and the executed trades.
    pub fn compute(capital_curve: &[f64], trades: &[ExecutedTrade]) -> Self {
        let (long_trades, short_trades) = direction_counts(trades);
        Self {
            total_return: total_return(capital_curve),
            max_drawdown: max_drawdown(capital_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_return_pct: avg_return_pct(trades),
            avg_duration_minutes: avg_duration_minutes(trades),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            exit_reasons: exit_reason_counts(trades),
            long_trades,
            short_trades,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(capital_curve: &[f64]) -> f64 {
    match (capital_curve.first(), capital_curve.last()) {
        (Some(&initial), Some(&last)) if capital_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if capital is constant or monotonically increasing.
pub fn max_drawdown(capital_curve: &[f64]) -> f64 {
    let Some(&first) = capital_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &c in capital_curve {
        if c > peak {
            peak = c;
        }
        if peak > 0.0 {
            let dd = (c - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Fraction of trades with positive pnl.
pub fn win_rate(trades: &[ExecutedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.outcome.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 when there are no losses.
pub fn profit_factor(trades: &[ExecutedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().map(|t| t.pnl()).filter(|p| *p > 0.0).sum();
    let gross_loss: f64 = trades
        .iter()
        .map(|t| t.pnl())
        .filter(|p| *p < 0.0)
        .map(f64::abs)
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean of the long-style `return_pct` across trades.
pub fn avg_return_pct(trades: &[ExecutedTrade]) -> f64 {
    let returns: Vec<f64> = trades.iter().map(|t| t.outcome.return_pct).collect();
    mean_f64(&returns)
}

pub fn avg_duration_minutes(trades: &[ExecutedTrade]) -> f64 {
    let minutes: Vec<f64> = trades.iter().map(|t| t.outcome.duration_minutes()).collect();
    mean_f64(&minutes)
}

pub fn max_consecutive_wins(trades: &[ExecutedTrade]) -> usize {
    max_consecutive(trades, true)
}

pub fn max_consecutive_losses(trades: &[ExecutedTrade]) -> usize {
    max_consecutive(trades, false)
}

pub fn exit_reason_counts(trades: &[ExecutedTrade]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for trade in trades {
        *counts
            .entry(trade.outcome.exit_reason.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// (long, short) trade counts.
pub fn direction_counts(trades: &[ExecutedTrade]) -> (usize, usize) {
    let long = trades
        .iter()
        .filter(|t| t.direction == Direction::Long)
        .count();
    (long, trades.len() - long)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn max_consecutive(trades: &[ExecutedTrade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.outcome.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
