//! Capital ledger — capital, drawdown and loss-streak state plus position sizing.
//!
//! Sizing combines a fractional Kelly estimate from recent returns with two
//! dampeners: one for drawdown beyond a threshold and one for losing streaks.
//!
//! ```text
//! raw  = capital * kelly * confidence * mdd_adj * loss_adj
//! size = max(min_position, min(raw, capital * max_position_pct))
//! ```
//!
//! The minimum position wins when `capital * max_position_pct` falls below it.

pub mod dampening;
pub mod kelly;
pub mod retrain;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConfigError;

pub use dampening::{consecutive_loss_adjustment, mdd_adjustment};
pub use kelly::{kelly_fraction, KellyParams};
pub use retrain::{retraining_triggers, RetrainConfig, RetrainTrigger};

/// Trade history the ledger always retains, whatever `history_limit` says.
pub const MIN_HISTORY: usize = 100;

/// Ledger settings. Defaults are the stand-alone sizer defaults; the run
/// preset tightens `max_position_pct` and `kelly_lookback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub initial_capital: f64,
    /// Cap on a single position as a fraction of current capital.
    pub max_position_pct: f64,
    /// Drawdown (fraction) where the mdd dampener starts cutting size.
    pub mdd_threshold: f64,
    pub kelly_lookback: usize,
    pub kelly_min_trades: usize,
    pub kelly_floor: f64,
    pub kelly_scale: f64,
    /// Smallest position the sizer will emit, in currency.
    pub min_position_size: f64,
    /// Bound on retained trade history. `None` keeps everything.
    pub history_limit: Option<usize>,
    pub retrain: RetrainConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            max_position_pct: 0.25,
            mdd_threshold: 0.15,
            kelly_lookback: 100,
            kelly_min_trades: 10,
            kelly_floor: 0.01,
            kelly_scale: 0.25,
            min_position_size: 100.0,
            history_limit: None,
            retrain: RetrainConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn kelly_params(&self) -> KellyParams {
        KellyParams {
            lookback: self.kelly_lookback,
            min_trades: self.kelly_min_trades,
            floor: self.kelly_floor,
            scale: self.kelly_scale,
            max_fraction: self.max_position_pct,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::invalid(
                "ledger.initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        if !(self.max_position_pct > 0.0 && self.max_position_pct <= 1.0) {
            return Err(ConfigError::invalid(
                "ledger.max_position_pct",
                format!("must be in (0, 1], got {}", self.max_position_pct),
            ));
        }
        if self.kelly_floor < 0.0 || self.kelly_floor > self.max_position_pct {
            return Err(ConfigError::invalid(
                "ledger.kelly_floor",
                format!(
                    "must be in [0, max_position_pct = {}], got {}",
                    self.max_position_pct, self.kelly_floor
                ),
            ));
        }
        if !(self.mdd_threshold >= 0.0 && self.mdd_threshold < 1.0) {
            return Err(ConfigError::invalid(
                "ledger.mdd_threshold",
                format!("must be in [0, 1), got {}", self.mdd_threshold),
            ));
        }
        if self.kelly_lookback == 0 {
            return Err(ConfigError::invalid("ledger.kelly_lookback", "must be at least 1"));
        }
        if self.min_position_size < 0.0 {
            return Err(ConfigError::invalid(
                "ledger.min_position_size",
                format!("must be non-negative, got {}", self.min_position_size),
            ));
        }
        if let Some(limit) = self.history_limit {
            let required = self
                .kelly_lookback
                .max(MIN_HISTORY)
                .max(self.retrain.win_rate_window);
            if limit < required {
                return Err(ConfigError::invalid(
                    "ledger.history_limit",
                    format!("must be at least {required}, got {limit}"),
                ));
            }
        }
        Ok(())
    }
}

/// One realized trade as the ledger saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub timestamp: DateTime<Utc>,
    pub pnl: f64,
    pub return_pct: f64,
    pub capital_after: f64,
}

/// Mutable ledger state for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub initial_capital: f64,
    pub current_capital: f64,
    /// Never decreases.
    pub peak_capital: f64,
    /// `max(0, (peak - current) / peak)`.
    pub current_drawdown: f64,
    pub consecutive_losses: u32,
    /// Trades folded in so far, including any trimmed from `trade_history`.
    pub total_trades: usize,
    pub trade_history: Vec<TradeEntry>,
}

impl LedgerState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            current_capital: initial_capital,
            peak_capital: initial_capital,
            current_drawdown: 0.0,
            consecutive_losses: 0,
            total_trades: 0,
            trade_history: Vec::new(),
        }
    }
}

/// The factors behind one position size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingBreakdown {
    pub capital: f64,
    pub kelly_fraction: f64,
    pub confidence: f64,
    pub mdd_adjustment: f64,
    pub loss_adjustment: f64,
    /// Product of all factors, before clamping.
    pub raw_size: f64,
    pub position_size: f64,
}

/// Snapshot of ledger risk state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub initial_capital: f64,
    pub current_capital: f64,
    pub peak_capital: f64,
    pub total_return_pct: f64,
    pub drawdown_pct: f64,
    pub consecutive_losses: u32,
    pub total_trades: usize,
    pub needs_retraining: bool,
}

/// Capital-aware position sizer and trade ledger.
#[derive(Debug, Clone)]
pub struct CapitalLedger {
    config: LedgerConfig,
    state: LedgerState,
}

impl CapitalLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let state = LedgerState::new(config.initial_capital);
        Self { config, state }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Back to initial capital with empty history.
    pub fn reset(&mut self) {
        self.state = LedgerState::new(self.config.initial_capital);
    }

    pub fn kelly_fraction(&self) -> f64 {
        let returns: Vec<f64> = self
            .state
            .trade_history
            .iter()
            .map(|t| t.return_pct)
            .collect();
        kelly_fraction(&returns, &self.config.kelly_params())
    }

    pub fn mdd_adjustment(&self) -> f64 {
        mdd_adjustment(self.state.current_drawdown, self.config.mdd_threshold)
    }

    pub fn consecutive_loss_adjustment(&self) -> f64 {
        consecutive_loss_adjustment(self.state.consecutive_losses)
    }

    pub fn position_size(&self, confidence: f64) -> f64 {
        self.sizing(confidence).position_size
    }

    /// Size a position for a signal of the given confidence.
    pub fn sizing(&self, confidence: f64) -> SizingBreakdown {
        let capital = self.state.current_capital;
        let kelly = self.kelly_fraction();
        let mdd_adj = self.mdd_adjustment();
        let loss_adj = self.consecutive_loss_adjustment();

        let raw_size = capital * kelly * confidence * mdd_adj * loss_adj;
        let cap = capital * self.config.max_position_pct;
        let position_size = raw_size.min(cap).max(self.config.min_position_size);

        debug!(
            capital,
            kelly,
            confidence,
            mdd_adj,
            loss_adj,
            raw_size,
            position_size,
            "sized position"
        );

        SizingBreakdown {
            capital,
            kelly_fraction: kelly,
            confidence,
            mdd_adjustment: mdd_adj,
            loss_adjustment: loss_adj,
            raw_size,
            position_size,
        }
    }

    /// Fold one realized trade into the ledger.
    pub fn update(&mut self, timestamp: DateTime<Utc>, pnl: f64, return_pct: f64) -> &TradeEntry {
        let prior_drawdown = self.state.current_drawdown;
        let state = &mut self.state;

        state.current_capital += pnl;
        if state.current_capital > state.peak_capital {
            state.peak_capital = state.current_capital;
            state.current_drawdown = 0.0;
        } else if state.peak_capital > 0.0 {
            state.current_drawdown =
                ((state.peak_capital - state.current_capital) / state.peak_capital).max(0.0);
        } else {
            state.current_drawdown = 0.0;
        }

        if pnl < 0.0 {
            state.consecutive_losses += 1;
        } else {
            state.consecutive_losses = 0;
        }

        state.total_trades += 1;
        state.trade_history.push(TradeEntry {
            timestamp,
            pnl,
            return_pct,
            capital_after: state.current_capital,
        });
        self.trim_history();

        debug!(
            pnl,
            return_pct,
            capital = self.state.current_capital,
            peak = self.state.peak_capital,
            drawdown = self.state.current_drawdown,
            consecutive_losses = self.state.consecutive_losses,
            "ledger updated"
        );
        if prior_drawdown < self.config.mdd_threshold
            && self.state.current_drawdown >= self.config.mdd_threshold
        {
            warn!(
                drawdown = self.state.current_drawdown,
                threshold = self.config.mdd_threshold,
                "drawdown past threshold, dampening position sizes"
            );
        }

        let last = self.state.trade_history.len() - 1;
        &self.state.trade_history[last]
    }

    // History grows to twice the limit, then drops back to the limit.
    fn trim_history(&mut self) {
        if let Some(limit) = self.config.history_limit {
            let history = &mut self.state.trade_history;
            if history.len() > limit * 2 {
                let excess = history.len() - limit;
                history.drain(..excess);
            }
        }
    }

    pub fn retraining_triggers(&self) -> Vec<RetrainTrigger> {
        retraining_triggers(
            &self.config.retrain,
            self.state.current_drawdown,
            self.state.consecutive_losses,
            &self.state.trade_history,
        )
    }

    pub fn should_trigger_retraining(&self) -> bool {
        !self.retraining_triggers().is_empty()
    }

    /// Capital before the oldest retained trade, then capital after each one.
    pub fn capital_history(&self) -> Vec<f64> {
        let history = &self.state.trade_history;
        let start = history
            .first()
            .map(|t| t.capital_after - t.pnl)
            .unwrap_or(self.state.current_capital);
        std::iter::once(start)
            .chain(history.iter().map(|t| t.capital_after))
            .collect()
    }

    pub fn risk_metrics(&self) -> RiskMetrics {
        let state = &self.state;
        let total_return_pct = if state.initial_capital != 0.0 {
            (state.current_capital - state.initial_capital) / state.initial_capital * 100.0
        } else {
            0.0
        };
        RiskMetrics {
            initial_capital: state.initial_capital,
            current_capital: state.current_capital,
            peak_capital: state.peak_capital,
            total_return_pct,
            drawdown_pct: state.current_drawdown * 100.0,
            consecutive_losses: state.consecutive_losses,
            total_trades: state.total_trades,
            needs_retraining: self.should_trigger_retraining(),
        }
    }
}

impl Default for CapitalLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
