//! Backtest runner — wires together data, the risk engine, and metrics.
//!
//! Entry points:
//! - `run_from_config()`: loads bars and signals from the paths in the run
//!   file, then runs. Used by the CLI.
//! - `run_universe()`: takes pre-loaded data. Runs every selected symbol as an
//!   independent engine, optionally on the rayon pool.
//! - `run_symbol()`: one symbol, `passes` passes over its signal stream.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, warn};

use risklab_core::config::ConfigError;
use risklab_core::domain::{MarketData, StrategySignal};
use risklab_core::engine::{ExecutedTrade, PassResult, RejectedSignal, RetrainEvent};
use risklab_core::fingerprint::RunFingerprint;
use risklab_core::gate::{AdaptReport, GateStats};
use risklab_core::ledger::RiskMetrics;
use risklab_core::RiskEngine;

use crate::config::{RunConfig, RunConfigError};
use crate::data_loader::{load_bars, load_signals, LoadError};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("risk config error: {0}")]
    Risk(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("no `run.{0}` path given")]
    MissingInput(&'static str),
    #[error("symbol '{0}' has neither bars nor signals")]
    SymbolNotFound(String),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Condensed view of one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    /// 1-based pass number.
    pub pass: usize,
    pub signals: usize,
    pub executed: usize,
    pub rejected: usize,
    /// Executed share of the signals seen in the pass.
    pub acceptance_rate: f64,
    pub rejections_by_rule: BTreeMap<String, usize>,
    pub retrain_events: usize,
    pub adaptation: Option<AdaptReport>,
    pub gate_stats: Option<GateStats>,
    pub risk: RiskMetrics,
    pub metrics: PerformanceMetrics,
}

impl PassSummary {
    fn from_pass(pass: usize, result: &PassResult) -> Self {
        Self {
            pass,
            signals: result.signal_count(),
            executed: result.journal.executed.len(),
            rejected: result.journal.rejected.len(),
            acceptance_rate: result.journal.acceptance_rate(),
            rejections_by_rule: result.journal.rejections_by_rule(),
            retrain_events: result.journal.retrain_events.len(),
            adaptation: result.adaptation.clone(),
            gate_stats: result.gate_stats.clone(),
            risk: result.risk.clone(),
            metrics: PerformanceMetrics::compute(&result.capital_curve, &result.journal.executed),
        }
    }
}

/// Result for one symbol: every pass summary plus the last pass in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub bar_count: usize,
    pub passes: Vec<PassSummary>,
    pub trades: Vec<ExecutedTrade>,
    pub rejected: Vec<RejectedSignal>,
    pub retrain_events: Vec<RetrainEvent>,
    pub capital_curve: Vec<f64>,
    pub metrics: PerformanceMetrics,
    pub risk: RiskMetrics,
}

impl SymbolReport {
    pub fn should_trigger_retraining(&self) -> bool {
        self.risk.needs_retraining
    }
}

/// Totals across symbols, taken from each symbol's last pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseSummary {
    pub symbols: usize,
    pub signals: usize,
    pub executed: usize,
    pub rejected: usize,
    pub total_pnl: f64,
    pub retraining_advised: Vec<String>,
}

/// Complete result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub config: RunConfig,
    pub summary: UniverseSummary,
    pub symbols: Vec<SymbolReport>,
}

impl BacktestReport {
    pub fn symbol(&self, symbol: &str) -> Option<&SymbolReport> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }
}

/// Load the run's inputs from disk and run every selected symbol.
pub fn run_from_config(config: &RunConfig) -> Result<BacktestReport, RunError> {
    let bars_path = config.run.bars.as_deref().ok_or(RunError::MissingInput("bars"))?;
    let signals_path = config
        .run
        .signals
        .as_deref()
        .ok_or(RunError::MissingInput("signals"))?;

    let loaded = load_bars(bars_path)?;
    let signals = load_signals(signals_path)?;
    run_universe(config, &loaded.market, &signals)
}

/// Run pre-loaded data. Each symbol gets its own engine; reports come back in
/// symbol order whether or not `run.parallel` is set.
pub fn run_universe(
    config: &RunConfig,
    market: &MarketData,
    signals: &[StrategySignal],
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let symbols = select_symbols(config, market, signals)?;
    let fingerprint = RunFingerprint::new(&config.risk, market, signals, config.run.seed)?;

    info!(
        run_id = %fingerprint.run_id,
        symbols = symbols.len(),
        signals = signals.len(),
        passes = config.run.passes,
        parallel = config.run.parallel,
        "starting run"
    );

    let run_one = |symbol: &String| {
        let stream: Vec<StrategySignal> = signals
            .iter()
            .filter(|s| &s.symbol == symbol)
            .cloned()
            .collect();
        run_symbol(config, symbol, &stream, market)
    };
    let reports: Vec<SymbolReport> = if config.run.parallel {
        symbols.par_iter().map(run_one).collect()
    } else {
        symbols.iter().map(run_one).collect()
    };

    let summary = summarize(&reports);
    for symbol in &summary.retraining_advised {
        warn!(symbol = %symbol, "retraining advised at end of run");
    }
    info!(
        executed = summary.executed,
        rejected = summary.rejected,
        total_pnl = summary.total_pnl,
        "run complete"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        config: config.clone(),
        summary,
        symbols: reports,
    })
}

/// Run one symbol's signal stream for `run.passes` passes.
///
/// The gate carries over between passes so its adaptation compounds; the
/// ledger starts fresh at initial capital each pass.
pub fn run_symbol(
    config: &RunConfig,
    symbol: &str,
    signals: &[StrategySignal],
    market: &MarketData,
) -> SymbolReport {
    let mut engine = RiskEngine::new(&config.risk);
    let passes = config.run.passes.max(1);
    let mut summaries = Vec::with_capacity(passes);
    let mut last = None;

    for pass in 1..=passes {
        if pass > 1 {
            engine.reset_ledger();
        }
        let result = engine.run_pass(signals, market);
        summaries.push(PassSummary::from_pass(pass, &result));
        last = Some(result);
    }

    let bar_count = market.get(symbol).map_or(0, |s| s.len());
    match last {
        Some(result) => {
            let metrics = PerformanceMetrics::compute(&result.capital_curve, &result.journal.executed);
            SymbolReport {
                symbol: symbol.to_string(),
                bar_count,
                passes: summaries,
                trades: result.journal.executed,
                rejected: result.journal.rejected,
                retrain_events: result.journal.retrain_events,
                capital_curve: result.capital_curve,
                metrics,
                risk: result.risk,
            }
        }
        // passes >= 1, kept total for an empty loop
        None => SymbolReport {
            symbol: symbol.to_string(),
            bar_count,
            passes: summaries,
            trades: Vec::new(),
            rejected: Vec::new(),
            retrain_events: Vec::new(),
            capital_curve: vec![config.risk.ledger.initial_capital],
            metrics: PerformanceMetrics::compute(&[], &[]),
            risk: engine.ledger().risk_metrics(),
        },
    }
}

/// Symbols to run: the configured filter, or every symbol that has signals.
fn select_symbols(
    config: &RunConfig,
    market: &MarketData,
    signals: &[StrategySignal],
) -> Result<Vec<String>, RunError> {
    let with_signals: BTreeSet<&str> = signals.iter().map(|s| s.symbol.as_str()).collect();

    if config.run.symbols.is_empty() {
        return Ok(with_signals.into_iter().map(str::to_string).collect());
    }

    let mut selected = BTreeSet::new();
    for symbol in &config.run.symbols {
        if !with_signals.contains(symbol.as_str()) && !market.contains(symbol) {
            return Err(RunError::SymbolNotFound(symbol.clone()));
        }
        selected.insert(symbol.clone());
    }
    Ok(selected.into_iter().collect())
}

fn summarize(reports: &[SymbolReport]) -> UniverseSummary {
    let mut summary = UniverseSummary {
        symbols: reports.len(),
        ..UniverseSummary::default()
    };
    for report in reports {
        summary.executed += report.trades.len();
        summary.rejected += report.rejected.len();
        summary.total_pnl += report.trades.iter().map(ExecutedTrade::pnl).sum::<f64>();
        if report.should_trigger_retraining() {
            summary.retraining_advised.push(report.symbol.clone());
        }
    }
    summary.signals = summary.executed + summary.rejected;
    summary
}
