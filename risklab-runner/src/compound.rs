//! Compound replay of an existing trade log through the capital ledger.
//!
//! Each logged trade keeps its return but is re-sized by the ledger at the
//! time it happened, so capital compounds the way it would have under
//! Kelly sizing with drawdown and loss-streak dampening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use risklab_core::domain::StrategyKind;
use risklab_core::ledger::{CapitalLedger, LedgerConfig, RetrainTrigger, RiskMetrics};

use crate::data_loader::LoggedTrade;

/// Confidence used when the log has none for a trade.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Ledger settings for replay: 20% cap, 15% drawdown threshold, 100-trade
/// Kelly lookback.
pub fn replay_ledger_config(initial_capital: f64) -> LedgerConfig {
    LedgerConfig {
        initial_capital,
        max_position_pct: 0.20,
        mdd_threshold: 0.15,
        kelly_lookback: 100,
        ..LedgerConfig::default()
    }
}

/// One replayed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRow {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub strategy_kind: StrategyKind,
    pub original_pnl: f64,
    pub original_return_pct: f64,
    pub position_size: f64,
    pub new_pnl: f64,
    pub capital_after: f64,
    pub drawdown: f64,
    pub consecutive_losses: u32,
}

/// A replayed trade after which retraining was advised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTrigger {
    pub timestamp: DateTime<Utc>,
    /// 0-based index into the trade log.
    pub trade_index: usize,
    pub capital: f64,
    pub drawdown: f64,
    pub consecutive_losses: u32,
    pub triggers: Vec<RetrainTrigger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub rows: Vec<ReplayRow>,
    /// Every trade after which a trigger was active, not only the first.
    pub retrain_triggers: Vec<ReplayTrigger>,
    pub final_metrics: RiskMetrics,
    pub max_drawdown_pct: f64,
}

impl ReplayResult {
    pub fn final_capital(&self) -> f64 {
        self.final_metrics.current_capital
    }
}

/// Replay `trades` in order through a fresh ledger.
///
/// A non-finite `return_pct` contributes a zero pnl and a zero return.
pub fn replay_compound(trades: &[LoggedTrade], config: LedgerConfig) -> ReplayResult {
    let mut ledger = CapitalLedger::new(config);
    let mut rows = Vec::with_capacity(trades.len());
    let mut retrain_triggers = Vec::new();
    let mut max_drawdown = 0.0_f64;

    for (i, trade) in trades.iter().enumerate() {
        let confidence = trade
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE);
        let position_size = ledger.position_size(confidence);

        let return_pct = if trade.return_pct.is_finite() {
            trade.return_pct
        } else {
            0.0
        };
        let new_pnl = position_size * return_pct / 100.0;

        ledger.update(trade.timestamp, new_pnl, return_pct);
        let state = ledger.state();
        max_drawdown = max_drawdown.max(state.current_drawdown);

        rows.push(ReplayRow {
            timestamp: trade.timestamp,
            symbol: trade.symbol.clone(),
            strategy_kind: trade.strategy_kind,
            original_pnl: trade.pnl,
            original_return_pct: trade.return_pct,
            position_size,
            new_pnl,
            capital_after: state.current_capital,
            drawdown: state.current_drawdown,
            consecutive_losses: state.consecutive_losses,
        });

        let triggers = ledger.retraining_triggers();
        if !triggers.is_empty() {
            warn!(
                timestamp = %trade.timestamp,
                drawdown = state.current_drawdown,
                capital = state.current_capital,
                "retraining trigger during replay"
            );
            retrain_triggers.push(ReplayTrigger {
                timestamp: trade.timestamp,
                trade_index: i,
                capital: state.current_capital,
                drawdown: state.current_drawdown,
                consecutive_losses: state.consecutive_losses,
                triggers,
            });
        }
    }

    let final_metrics = ledger.risk_metrics();
    info!(
        trades = rows.len(),
        final_capital = final_metrics.current_capital,
        return_pct = final_metrics.total_return_pct,
        retrain_points = retrain_triggers.len(),
        "compound replay complete"
    );

    ReplayResult {
        rows,
        retrain_triggers,
        final_metrics,
        max_drawdown_pct: max_drawdown * 100.0,
    }
}
