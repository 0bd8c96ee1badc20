//! Outcome simulator — resolves a sized signal against the bars that follow it.
//!
//! The simulator walks at most `max_lookahead_bars` bars strictly after the
//! signal timestamp and exits at the first bar that touches the take-profit or
//! the stop-loss. With no touch it exits at the last scanned close; with no
//! bars at all it returns a flat, neutral outcome.
//!
//! | Direction | take-profit touched  | stop-loss touched     |
//! |-----------|----------------------|-----------------------|
//! | Long      | `high >= take_profit` | `low <= stop_loss`    |
//! | Short     | `low <= take_profit`  | `high >= stop_loss`   |

pub mod priority;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{bars_after, Direction, ExitReason, PriceBar, StrategySignal, TradeOutcome};

pub use priority::IntrabarPriority;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    pub max_lookahead_bars: usize,
    /// Exit offset for the neutral outcome when no bars follow the signal.
    pub neutral_exit_minutes: i64,
    pub intrabar_priority: IntrabarPriority,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_lookahead_bars: 60,
            neutral_exit_minutes: 30,
            intrabar_priority: IntrabarPriority::TakeProfitFirst,
        }
    }
}

/// Deterministic trade-outcome simulator.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSimulator {
    config: SimulatorConfig,
}

impl OutcomeSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Resolve one trade.
    ///
    /// `bars` must be sorted by timestamp; bars at or before the signal
    /// timestamp are skipped.
    pub fn simulate(
        &self,
        signal: &StrategySignal,
        position_size: f64,
        bars: &[PriceBar],
    ) -> TradeOutcome {
        let direction = signal.direction();
        let following = bars_after(bars, signal.timestamp);
        let window = &following[..following.len().min(self.config.max_lookahead_bars)];

        let Some(last) = window.last() else {
            let exit_timestamp = Duration::try_minutes(self.config.neutral_exit_minutes)
                .and_then(|offset| signal.timestamp.checked_add_signed(offset))
                .unwrap_or(signal.timestamp);
            return TradeOutcome {
                direction,
                exit_price: signal.entry_price,
                exit_timestamp,
                pnl: 0.0,
                return_pct: 0.0,
                duration_secs: (exit_timestamp - signal.timestamp).num_seconds(),
                exit_reason: ExitReason::Timeout,
            };
        };

        let (exit_price, exit_timestamp, exit_reason) = window
            .iter()
            .find_map(|bar| {
                let (tp_hit, sl_hit) = touches(direction, signal, bar);
                self.config
                    .intrabar_priority
                    .resolve(tp_hit, sl_hit)
                    .map(|reason| match reason {
                        ExitReason::Profit => (signal.take_profit, bar.timestamp, reason),
                        _ => (signal.stop_loss, bar.timestamp, reason),
                    })
            })
            .unwrap_or((last.close, last.timestamp, ExitReason::Timeout));

        let (pnl, return_pct) = price_move(direction, signal.entry_price, exit_price, position_size);

        TradeOutcome {
            direction,
            exit_price,
            exit_timestamp,
            pnl,
            return_pct,
            duration_secs: (exit_timestamp - signal.timestamp).num_seconds(),
            exit_reason,
        }
    }
}

fn touches(direction: Direction, signal: &StrategySignal, bar: &PriceBar) -> (bool, bool) {
    match direction {
        Direction::Long => (bar.high >= signal.take_profit, bar.low <= signal.stop_loss),
        Direction::Short => (bar.low <= signal.take_profit, bar.high >= signal.stop_loss),
    }
}

/// `(pnl, return_pct)`. `return_pct` is the long-style price change for
/// both directions; `pnl` flips sign for shorts.
fn price_move(direction: Direction, entry: f64, exit: f64, size: f64) -> (f64, f64) {
    if entry == 0.0 {
        return (0.0, 0.0);
    }
    let change = (exit - entry) / entry;
    let pnl = match direction {
        Direction::Long => change * size,
        Direction::Short => -change * size,
    };
    (pnl, change * 100.0)
}
