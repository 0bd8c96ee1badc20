//! TradeOutcome — the resolved result of one simulated trade.

use super::signal::Direction;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a simulated trade closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Profit,
    StopLoss,
    Timeout,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Profit => "profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single sized signal, folded into the ledger exactly once.
///
/// `pnl` is signed from the position's point of view. `return_pct` is always
/// the long-style price delta `(exit - entry) / entry * 100`, so for short
/// positions its sign is opposite to `pnl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub direction: Direction,
    pub exit_price: f64,
    pub exit_timestamp: DateTime<Utc>,
    pub pnl: f64,
    pub return_pct: f64,
    /// Holding time in seconds (exit time minus signal time).
    pub duration_secs: i64,
    pub exit_reason: ExitReason,
}

impl TradeOutcome {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs as f64 / 60.0
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
