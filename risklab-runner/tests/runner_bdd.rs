//! BDD tests for the runner: files in, report and artifacts out.
//!
//! These tests verify:
//! - A run file drives loading, multi-symbol runs and export
//! - Parallel and serial execution produce identical symbol reports
//! - Multi-pass runs carry gate adaptation forward
//! - Compound replay of a trade log

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;

use risklab_core::domain::{PriceBar, RiskTier, StrategyKind, StrategySignal};
use risklab_runner::export::{export_bars_csv, save_artifacts};
use risklab_runner::{
    generate_bars, load_trade_log, replay_compound, replay_ledger_config, run_from_config,
    run_universe, RunConfig, SyntheticConfig,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn synth(symbol: &str, seed: u64) -> Vec<PriceBar> {
    let mut cfg = SyntheticConfig::new(symbol, 2_000, t0(), seed);
    cfg.volatility = 0.004;
    generate_bars(&cfg)
}

/// One signal every 25 bars, entered at the bar close with a 1% / 2% bracket.
fn signals_from(bars: &[PriceBar]) -> Vec<StrategySignal> {
    let kinds = [
        StrategyKind::Breakout,
        StrategyKind::Trend,
        StrategyKind::CounterTrend,
    ];
    bars.iter()
        .step_by(25)
        .enumerate()
        .map(|(i, bar)| {
            let kind = kinds[i % 3];
            let entry = bar.close;
            let (stop_loss, take_profit) = match kind {
                StrategyKind::Trend => (entry * 1.01, entry * 0.98),
                _ => (entry * 0.99, entry * 1.02),
            };
            StrategySignal {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                kind,
                entry_price: entry,
                stop_loss,
                take_profit,
                score: 70.0 + (i * 7 % 30) as f64,
                confidence: 0.3 + (i % 7) as f64 * 0.1,
                risk_tier: if i % 5 == 0 { RiskTier::High } else { RiskTier::Medium },
                features: BTreeMap::new(),
            }
        })
        .collect()
}

/// Interleave two streams by timestamp (stable for ties).
fn merge_streams(mut a: Vec<StrategySignal>, b: Vec<StrategySignal>) -> Vec<StrategySignal> {
    a.extend(b);
    a.sort_by_key(|s| s.timestamp);
    a
}

fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let btc = synth("BTCUSDT", 1);
    let eth = synth("ETHUSDT", 2);
    let signals = merge_streams(signals_from(&btc), signals_from(&eth));

    let bars_path = dir.join("bars.csv");
    let mut all = btc;
    all.extend(eth);
    fs::write(&bars_path, export_bars_csv(&all).unwrap()).unwrap();

    let signals_path = dir.join("signals.jsonl");
    let jsonl: Vec<String> = signals
        .iter()
        .map(|s| serde_json::to_string(s).unwrap())
        .collect();
    fs::write(&signals_path, jsonl.join("\n")).unwrap();

    (bars_path, signals_path)
}

#[test]
fn bdd_scenario_run_file_to_artifacts() {
    // GIVEN bars and signals on disk and a run file pointing at them
    let dir = tempfile::tempdir().unwrap();
    let (bars, signals) = write_inputs(dir.path());
    let run_file = dir.path().join("run.toml");
    fs::write(
        &run_file,
        format!(
            "[run]\nbars = {:?}\nsignals = {:?}\npasses = 2\n\n[gate]\ndynamic_threshold = true\n",
            bars.display().to_string(),
            signals.display().to_string()
        ),
    )
    .unwrap();

    // WHEN the run is executed
    let config = RunConfig::from_file(&run_file).expect("run file should parse");
    let report = run_from_config(&config).expect("run should succeed");

    // THEN both symbols are reported with two passes each
    assert_eq!(report.symbols.len(), 2);
    assert_eq!(report.symbols[0].symbol, "BTCUSDT");
    assert_eq!(report.fingerprint.symbols, vec!["BTCUSDT", "ETHUSDT"]);
    for symbol in &report.symbols {
        assert_eq!(symbol.passes.len(), 2);
        assert_eq!(symbol.capital_curve.len(), symbol.trades.len() + 1);
        assert_eq!(
            symbol.trades.len() + symbol.rejected.len(),
            symbol.passes[1].signals
        );
    }

    // AND the artifacts land on disk
    let out = save_artifacts(&report, dir.path()).expect("artifacts should save");
    let trades = fs::read_to_string(out.join("trades.csv")).unwrap();
    assert_eq!(trades.lines().count(), report.summary.executed + 1);
    let rejected = fs::read_to_string(out.join("rejected.csv")).unwrap();
    assert_eq!(rejected.lines().count(), report.summary.rejected + 1);
}

#[test]
fn bdd_scenario_parallel_matches_serial() {
    // GIVEN the same inputs
    let btc = synth("BTCUSDT", 11);
    let eth = synth("ETHUSDT", 12);
    let signals = merge_streams(signals_from(&btc), signals_from(&eth));
    let mut bars = btc;
    bars.extend(eth);
    let market = risklab_core::domain::MarketData::from_bars(bars);

    // WHEN run in parallel and serially
    let mut parallel = RunConfig::default();
    parallel.run.parallel = true;
    let mut serial = parallel.clone();
    serial.run.parallel = false;

    let a = run_universe(&parallel, &market, &signals).unwrap();
    let b = run_universe(&serial, &market, &signals).unwrap();

    // THEN per-symbol results are identical and in symbol order
    assert_eq!(a.symbols, b.symbols);
    assert_eq!(a.fingerprint.run_id, b.fingerprint.run_id);
}

#[test]
fn bdd_scenario_replay_trade_log() {
    // GIVEN a trade log with one missing confidence
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("trades.csv");
    let mut text = String::from("timestamp,symbol,strategy_kind,pnl,return_pct,confidence\n");
    for i in 0..30 {
        let ts = (t0() + Duration::hours(i)).to_rfc3339();
        let ret = if i % 4 == 0 { -1.5 } else { 1.0 };
        let conf = if i == 3 { String::new() } else { "0.8".to_string() };
        text.push_str(&format!("{ts},BTCUSDT,breakout,{},{ret},{conf}\n", ret * 10.0));
    }
    fs::write(&log, text).unwrap();

    // WHEN the log is replayed through a 10,000 ledger
    let trades = load_trade_log(&log).expect("trade log should load");
    let result = replay_compound(&trades, replay_ledger_config(10_000.0));

    // THEN every trade is re-sized and compounded
    assert_eq!(result.rows.len(), 30);
    assert_eq!(result.final_metrics.total_trades, 30);
    assert!(result.rows.iter().all(|r| r.position_size >= 100.0));
    assert!(result.final_capital() > 10_000.0);
    assert!(result.retrain_triggers.is_empty());
}
