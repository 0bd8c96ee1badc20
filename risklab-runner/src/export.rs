//! Artifact export: JSON report and CSV tapes.
//!
//! - **JSON**: the full `BacktestReport`, schema-versioned. Unknown versions
//!   are rejected on load.
//! - **CSV**: executed trades, rejected signals, capital curves, replay rows
//!   and synthetic bars.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use risklab_core::domain::PriceBar;

use crate::compound::ReplayResult;
use crate::runner::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Executed trades of every symbol's last pass, in symbol order.
///
/// Columns: symbol, timestamp, kind, direction, entry_price, stop_loss,
/// take_profit, score, confidence, risk_tier, kelly_fraction, mdd_adjustment,
/// loss_adjustment, position_size, exit_timestamp, exit_price, exit_reason,
/// duration_minutes, pnl, return_pct, capital_after
pub fn export_trades_csv(report: &BacktestReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "timestamp",
        "kind",
        "direction",
        "entry_price",
        "stop_loss",
        "take_profit",
        "score",
        "confidence",
        "risk_tier",
        "kelly_fraction",
        "mdd_adjustment",
        "loss_adjustment",
        "position_size",
        "exit_timestamp",
        "exit_price",
        "exit_reason",
        "duration_minutes",
        "pnl",
        "return_pct",
        "capital_after",
    ])?;

    for t in report.symbols.iter().flat_map(|s| &s.trades) {
        wtr.write_record([
            t.symbol.as_str(),
            &t.timestamp.to_rfc3339(),
            t.kind.as_str(),
            t.direction.as_str(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.stop_loss),
            &format!("{:.6}", t.take_profit),
            &format!("{:.2}", t.score),
            &format!("{:.4}", t.confidence),
            t.risk_tier.as_str(),
            &format!("{:.6}", t.sizing.kelly_fraction),
            &format!("{:.4}", t.sizing.mdd_adjustment),
            &format!("{:.4}", t.sizing.loss_adjustment),
            &format!("{:.2}", t.position_size),
            &t.outcome.exit_timestamp.to_rfc3339(),
            &format!("{:.6}", t.outcome.exit_price),
            t.outcome.exit_reason.as_str(),
            &format!("{:.1}", t.outcome.duration_minutes()),
            &format!("{:.2}", t.outcome.pnl),
            &format!("{:.4}", t.outcome.return_pct),
            &format!("{:.2}", t.capital_after),
        ])?;
    }

    finish(wtr)
}

/// Rejected signals of every symbol's last pass.
///
/// Columns: symbol, timestamp, kind, score, confidence, risk_tier, rule, reason
pub fn export_rejected_csv(report: &BacktestReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "timestamp",
        "kind",
        "score",
        "confidence",
        "risk_tier",
        "rule",
        "reason",
    ])?;

    for r in report.symbols.iter().flat_map(|s| &s.rejected) {
        wtr.write_record([
            r.symbol.as_str(),
            &r.timestamp.to_rfc3339(),
            r.kind.as_str(),
            &format!("{:.2}", r.score),
            &format!("{:.4}", r.confidence),
            r.risk_tier.as_str(),
            r.reason.rule(),
            &r.reason.to_string(),
        ])?;
    }

    finish(wtr)
}

/// Capital curves of every symbol as `symbol,trade_index,capital`.
pub fn export_capital_csv(report: &BacktestReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "trade_index", "capital"])?;
    for s in &report.symbols {
        for (i, capital) in s.capital_curve.iter().enumerate() {
            wtr.write_record([&s.symbol, &i.to_string(), &format!("{:.2}", capital)])?;
        }
    }
    finish(wtr)
}

/// Compound replay rows.
pub fn export_replay_csv(result: &ReplayResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in &result.rows {
        wtr.serialize(row).context("failed to write replay row")?;
    }
    finish(wtr)
}

/// Bars in the loader's CSV layout, so generated data can be fed back in.
pub fn export_bars_csv(bars: &[PriceBar]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "timestamp", "open", "high", "low", "close", "volume"])?;
    for b in bars {
        wtr.write_record([
            &b.symbol,
            &b.timestamp.to_rfc3339(),
            &format!("{:.6}", b.open),
            &format!("{:.6}", b.high),
            &format!("{:.6}", b.low),
            &format!("{:.6}", b.close),
            &format!("{:.4}", b.volume),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates `run_{run_id prefix}/` under `output_dir` containing:
/// - `report.json`: the full `BacktestReport`
/// - `trades.csv`: executed trades
/// - `rejected.csv`: rejected signals with the failing rule
/// - `capital.csv`: capital curves
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.fingerprint.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("run_{prefix}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("report.json"), &export_json(report)?)?;
    write(&run_dir.join("trades.csv"), &export_trades_csv(report)?)?;
    write(&run_dir.join("rejected.csv"), &export_rejected_csv(report)?)?;
    write(&run_dir.join("capital.csv"), &export_capital_csv(report)?)?;

    Ok(run_dir)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::runner::run_universe;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use risklab_core::domain::{MarketData, RiskTier, StrategyKind, StrategySignal};
    use std::collections::BTreeMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
    }

    fn sample_report() -> BacktestReport {
        let bars: Vec<PriceBar> = (1..=30)
            .map(|m| {
                let px = 100.0 + m as f64 * 0.3;
                PriceBar::new(t0() + Duration::minutes(m), "BTCUSDT", px, px + 0.4, px - 0.4, px, 5.0)
            })
            .collect();
        let signal = |minute: i64, score: f64| StrategySignal {
            symbol: "BTCUSDT".into(),
            timestamp: t0() + Duration::minutes(minute),
            kind: StrategyKind::Breakout,
            entry_price: 100.0,
            stop_loss: 98.0,
            take_profit: 104.0,
            score,
            confidence: 0.7,
            risk_tier: RiskTier::Low,
            features: BTreeMap::new(),
        };
        let signals = vec![signal(0, 92.0), signal(1, 60.0)];
        run_universe(&RunConfig::default(), &MarketData::from_bars(bars), &signals).unwrap()
    }

    #[test]
    fn json_roundtrip() {
        let report = sample_report();
        let json = export_json(&report).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.fingerprint, report.fingerprint);
        assert_eq!(back.symbols.len(), 1);
        assert_eq!(back.symbols[0].trades.len(), report.symbols[0].trades.len());
        assert_eq!(back.symbols[0].rejected, report.symbols[0].rejected);
    }

    #[test]
    fn future_schema_rejected() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn trades_and_rejections_csv() {
        let report = sample_report();
        let trades = export_trades_csv(&report).unwrap();
        let mut lines = trades.lines();
        assert!(lines.next().unwrap().starts_with("symbol,timestamp,kind,direction"));
        let row = lines.next().unwrap();
        assert!(row.contains("breakout"));
        assert!(row.contains("long"));

        let rejected = export_rejected_csv(&report).unwrap();
        assert!(rejected.contains("score_below_floor"));
        assert_eq!(rejected.lines().count(), 2);
    }

    #[test]
    fn save_artifacts_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&sample_report(), dir.path()).unwrap();
        for name in ["report.json", "trades.csv", "rejected.csv", "capital.csv"] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn bars_csv_reloads() {
        let bars = vec![PriceBar::new(t0(), "ETHUSDT", 10.0, 11.0, 9.5, 10.5, 2.0)];
        let csv = export_bars_csv(&bars).unwrap();
        let (back, rejected) = crate::data_loader::read_bars(csv.as_bytes()).unwrap();
        assert_eq!(rejected, 0);
        assert_eq!(back, bars);
    }
}
