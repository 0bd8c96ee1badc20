//! Risk engine — the signal → gate → size → simulate → update → adapt loop.
//!
//! One engine owns one gate, one ledger and one simulator. Signals are
//! processed strictly in the order given; the engine never re-sorts them.
//! Each pass over a signal stream ends with a single `adapt` call carrying the
//! pnl of every trade executed in that pass.
//!
//! The engine holds no shared state, so independent engines can run on
//! separate threads.

pub mod journal;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RiskConfig;
use crate::domain::{MarketData, PriceBar, StrategySignal};
use crate::gate::{AdaptReport, AdaptiveGate, GateDecision, GateStats, SignalGate};
use crate::ledger::{CapitalLedger, LedgerConfig, LedgerState, RiskMetrics};
use crate::simulator::{OutcomeSimulator, SimulatorConfig};

pub use journal::{ExecutedTrade, RejectedSignal, RetrainEvent, TradeJournal};

/// What happened to one signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalResult {
    Executed(ExecutedTrade),
    Rejected(RejectedSignal),
}

impl SignalResult {
    pub fn is_executed(&self) -> bool {
        matches!(self, SignalResult::Executed(_))
    }
}

/// Everything a single pass over a signal stream produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassResult {
    pub journal: TradeJournal,
    /// `None` when the gate does not adapt.
    pub adaptation: Option<AdaptReport>,
    pub risk: RiskMetrics,
    pub final_state: LedgerState,
    /// Capital before the first trade, then after each trade.
    pub capital_curve: Vec<f64>,
    pub gate_stats: Option<GateStats>,
}

impl PassResult {
    pub fn signal_count(&self) -> usize {
        self.journal.signal_count()
    }

    pub fn should_trigger_retraining(&self) -> bool {
        self.risk.needs_retraining
    }
}

pub struct RiskEngine {
    gate: Box<dyn SignalGate>,
    ledger: CapitalLedger,
    simulator: OutcomeSimulator,
    journal: TradeJournal,
    retrain_active: bool,
}

impl RiskEngine {
    /// Engine with the adaptive gate.
    pub fn new(config: &RiskConfig) -> Self {
        Self::with_gate(
            Box::new(AdaptiveGate::new(&config.gate)),
            config.ledger.clone(),
            config.simulator.clone(),
        )
    }

    pub fn with_gate(
        gate: Box<dyn SignalGate>,
        ledger: LedgerConfig,
        simulator: SimulatorConfig,
    ) -> Self {
        Self {
            gate,
            ledger: CapitalLedger::new(ledger),
            simulator: OutcomeSimulator::new(simulator),
            journal: TradeJournal::new(),
            retrain_active: false,
        }
    }

    pub fn gate(&self) -> &dyn SignalGate {
        self.gate.as_ref()
    }

    pub fn ledger(&self) -> &CapitalLedger {
        &self.ledger
    }

    pub fn journal(&self) -> &TradeJournal {
        &self.journal
    }

    /// Fresh ledger at initial capital and an empty journal. The gate policy
    /// is kept.
    pub fn reset_ledger(&mut self) {
        self.ledger.reset();
        self.journal = TradeJournal::new();
        self.retrain_active = false;
    }

    /// Gate, size, simulate and book one signal.
    ///
    /// `bars` are the bars of the signal's symbol, sorted by time. An empty
    /// slice yields the neutral outcome.
    pub fn process_signal(&mut self, signal: &StrategySignal, bars: &[PriceBar]) -> SignalResult {
        let decision = self.gate.evaluate(signal);
        let reason = match decision {
            GateDecision::Rejected(reason) => reason,
            GateDecision::Accepted { .. } => {
                return SignalResult::Executed(self.execute(signal, bars));
            }
        };

        let rejected = RejectedSignal::new(signal, reason);
        self.journal.rejected.push(rejected.clone());
        SignalResult::Rejected(rejected)
    }

    fn execute(&mut self, signal: &StrategySignal, bars: &[PriceBar]) -> ExecutedTrade {
        let sizing = self.ledger.sizing(signal.confidence);
        let outcome = self.simulator.simulate(signal, sizing.position_size, bars);
        let capital_after = self
            .ledger
            .update(outcome.exit_timestamp, outcome.pnl, outcome.return_pct)
            .capital_after;

        let triggers = self.ledger.retraining_triggers();
        if !triggers.is_empty() && !self.retrain_active {
            let event = RetrainEvent {
                timestamp: outcome.exit_timestamp,
                trade_number: self.ledger.state().total_trades,
                capital: capital_after,
                triggers: triggers.clone(),
            };
            warn!(
                symbol = %signal.symbol,
                trade = event.trade_number,
                capital = capital_after,
                triggers = ?event.triggers,
                "retraining advised"
            );
            self.journal.retrain_events.push(event);
        }
        self.retrain_active = !triggers.is_empty();

        let trade = ExecutedTrade::new(signal, sizing, outcome, capital_after);
        self.journal.executed.push(trade.clone());
        trade
    }

    /// Run every signal through the loop, then adapt the gate once.
    ///
    /// Bars are looked up by symbol; a symbol missing from `market` is
    /// simulated against no bars.
    pub fn run_pass(&mut self, signals: &[StrategySignal], market: &MarketData) -> PassResult {
        for signal in signals {
            let bars = market
                .get(&signal.symbol)
                .map(|series| series.bars())
                .unwrap_or(&[]);
            self.process_signal(signal, bars);
        }
        self.finish_pass()
    }

    /// Adapt the gate from this pass's trades and package the results.
    pub fn finish_pass(&mut self) -> PassResult {
        let realized = self.journal.realized_pnls();
        let adaptation = self.gate.adapt(&realized);
        let risk = self.ledger.risk_metrics();

        info!(
            gate = self.gate.name(),
            signals = self.journal.signal_count(),
            executed = self.journal.executed.len(),
            rejected = self.journal.rejected.len(),
            capital = risk.current_capital,
            return_pct = risk.total_return_pct,
            drawdown_pct = risk.drawdown_pct,
            "pass complete"
        );

        PassResult {
            journal: std::mem::take(&mut self.journal),
            adaptation,
            risk,
            final_state: self.ledger.state().clone(),
            capital_curve: self.ledger.capital_history(),
            gate_stats: self.gate.policy().map(|p| p.stats()),
        }
    }
}
