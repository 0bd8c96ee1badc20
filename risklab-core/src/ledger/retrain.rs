//! Advisory retraining triggers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TradeEntry;

/// Thresholds for the retraining advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrainConfig {
    /// Drawdown (fraction) at or above which retraining is advised.
    pub max_drawdown: f64,
    pub max_consecutive_losses: u32,
    /// Trailing trades for the win-rate check.
    pub win_rate_window: usize,
    /// Win rate (fraction) at or below which retraining is advised.
    pub min_win_rate: f64,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            max_drawdown: 0.30,
            max_consecutive_losses: 7,
            win_rate_window: 20,
            min_win_rate: 0.30,
        }
    }
}

/// A tripped retraining condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum RetrainTrigger {
    Drawdown { drawdown: f64 },
    LossStreak { consecutive_losses: u32 },
    LowWinRate { win_rate: f64, window: usize },
}

impl fmt::Display for RetrainTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrainTrigger::Drawdown { drawdown } => {
                write!(f, "drawdown {:.1}%", drawdown * 100.0)
            }
            RetrainTrigger::LossStreak { consecutive_losses } => {
                write!(f, "{consecutive_losses} consecutive losses")
            }
            RetrainTrigger::LowWinRate { win_rate, window } => {
                write!(f, "win rate {:.1}% over last {window} trades", win_rate * 100.0)
            }
        }
    }
}

/// Every condition currently tripped, in drawdown / streak / win-rate order.
pub fn retraining_triggers(
    config: &RetrainConfig,
    drawdown: f64,
    consecutive_losses: u32,
    history: &[TradeEntry],
) -> Vec<RetrainTrigger> {
    let mut triggers = Vec::new();

    if drawdown >= config.max_drawdown {
        triggers.push(RetrainTrigger::Drawdown { drawdown });
    }

    if consecutive_losses >= config.max_consecutive_losses {
        triggers.push(RetrainTrigger::LossStreak { consecutive_losses });
    }

    let window = config.win_rate_window;
    if window > 0 && history.len() >= window {
        let recent = &history[history.len() - window..];
        let wins = recent.iter().filter(|t| t.pnl > 0.0).count();
        let win_rate = wins as f64 / window as f64;
        if win_rate <= config.min_win_rate {
            triggers.push(RetrainTrigger::LowWinRate { win_rate, window });
        }
    }

    triggers
}
