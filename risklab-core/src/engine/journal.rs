//! Trade journal — what the engine did with every signal in a pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Direction, RiskTier, StrategyKind, StrategySignal, TradeOutcome};
use crate::gate::RejectReason;
use crate::ledger::{RetrainTrigger, SizingBreakdown};

/// An admitted, sized and simulated signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTrade {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub kind: StrategyKind,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub score: f64,
    pub confidence: f64,
    pub risk_tier: RiskTier,
    pub position_size: f64,
    pub sizing: SizingBreakdown,
    pub outcome: TradeOutcome,
    pub capital_after: f64,
}

impl ExecutedTrade {
    pub fn new(
        signal: &StrategySignal,
        sizing: SizingBreakdown,
        outcome: TradeOutcome,
        capital_after: f64,
    ) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            kind: signal.kind,
            direction: signal.direction(),
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            score: signal.score,
            confidence: signal.confidence,
            risk_tier: signal.risk_tier,
            position_size: sizing.position_size,
            sizing,
            outcome,
            capital_after,
        }
    }

    pub fn pnl(&self) -> f64 {
        self.outcome.pnl
    }
}

/// A signal the gate turned away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedSignal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub kind: StrategyKind,
    pub score: f64,
    pub confidence: f64,
    pub risk_tier: RiskTier,
    pub reason: RejectReason,
}

impl RejectedSignal {
    pub fn new(signal: &StrategySignal, reason: RejectReason) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            kind: signal.kind,
            score: signal.score,
            confidence: signal.confidence,
            risk_tier: signal.risk_tier,
            reason,
        }
    }
}

/// Retraining triggers that became active after a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainEvent {
    pub timestamp: DateTime<Utc>,
    /// 1-based index of the trade that tripped the triggers.
    pub trade_number: usize,
    pub capital: f64,
    pub triggers: Vec<RetrainTrigger>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeJournal {
    pub executed: Vec<ExecutedTrade>,
    pub rejected: Vec<RejectedSignal>,
    pub retrain_events: Vec<RetrainEvent>,
}

impl TradeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals seen: executed plus rejected.
    pub fn signal_count(&self) -> usize {
        self.executed.len() + self.rejected.len()
    }

    pub fn realized_pnls(&self) -> Vec<f64> {
        self.executed.iter().map(ExecutedTrade::pnl).collect()
    }

    pub fn acceptance_rate(&self) -> f64 {
        match self.signal_count() {
            0 => 0.0,
            n => self.executed.len() as f64 / n as f64,
        }
    }

    /// Rejection counts keyed by rule name.
    pub fn rejections_by_rule(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.rejected {
            *counts.entry(r.reason.rule().to_string()).or_insert(0) += 1;
        }
        counts
    }
}
