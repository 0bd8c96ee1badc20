//! RiskLab Runner — run files, data loading, multi-symbol runs, metrics.
//!
//! This crate builds on `risklab-core` to provide:
//! - TOML run configuration over the reference backtest preset
//! - Bar, signal and trade-log loaders
//! - Deterministic synthetic bars
//! - Multi-symbol, multi-pass runs on the rayon pool
//! - Performance metrics and compound trade-log replay
//! - JSON / CSV artifact export

pub mod compound;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use compound::{replay_compound, replay_ledger_config, ReplayResult, ReplayRow, ReplayTrigger};
pub use config::{RunConfig, RunConfigError, RunSection};
pub use data_loader::{load_bars, load_signals, load_trade_log, LoadError, LoadedBars, LoggedTrade};
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_from_config, run_symbol, run_universe, BacktestReport, PassSummary, RunError,
    SymbolReport, UniverseSummary, SCHEMA_VERSION,
};
pub use synthetic::{generate_bars, SyntheticConfig};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<BacktestReport>();
        assert_sync::<BacktestReport>();
        assert_send::<SymbolReport>();
        assert_sync::<SymbolReport>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<SyntheticConfig>();
        assert_sync::<SyntheticConfig>();
    }

    #[test]
    fn replay_types_are_send_sync() {
        assert_send::<ReplayResult>();
        assert_sync::<ReplayResult>();
        assert_send::<LoggedTrade>();
        assert_sync::<LoggedTrade>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
