//! Bar, signal and trade-log loading for the runner.
//!
//! All inputs are files produced elsewhere; nothing here fetches or generates
//! data. Formats:
//!
//! - bars: CSV `symbol,timestamp,open,high,low,close,volume` (RFC 3339 times)
//! - signals: JSON array, or JSONL when the extension is `.jsonl`/`.ndjson`
//! - trade log: CSV `timestamp,symbol,strategy_kind,pnl,return_pct[,confidence]`
//!
//! Signals must be in non-decreasing timestamp order; the engine processes
//! them as given, so an out-of-order file is rejected rather than sorted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use risklab_core::domain::{MarketData, PriceBar, StrategyKind, StrategySignal};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in {path} (line {line}): {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "signals in {path} are out of order: #{index} at {timestamp} precedes the previous signal at {previous}"
    )]
    UnorderedSignals {
        path: PathBuf,
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("{path} contains no usable rows")]
    Empty { path: PathBuf },
}

#[derive(Debug, Deserialize)]
struct BarRow {
    symbol: String,
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl From<BarRow> for PriceBar {
    fn from(row: BarRow) -> Self {
        PriceBar::new(
            row.timestamp,
            row.symbol,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
        )
    }
}

/// Bars plus a count of rows dropped by the sanity check.
#[derive(Debug)]
pub struct LoadedBars {
    pub market: MarketData,
    pub rejected_rows: usize,
}

/// Load a bars CSV. Rows failing the OHLC sanity check are dropped with a
/// warning; a file with no sane rows is an error.
pub fn load_bars(path: &Path) -> Result<LoadedBars, LoadError> {
    let file = open(path)?;
    let (bars, rejected_rows) = read_bars(file).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    if rejected_rows > 0 {
        warn!(path = %path.display(), rejected_rows, "dropped insane bars");
    }
    debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(LoadedBars {
        market: MarketData::from_bars(bars),
        rejected_rows,
    })
}

/// Parse bars from any CSV reader. Returns sane bars and the rejected count.
pub fn read_bars<R: Read>(reader: R) -> Result<(Vec<PriceBar>, usize), csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    let mut rejected = 0;
    for row in rdr.deserialize::<BarRow>() {
        let bar = PriceBar::from(row?);
        if bar.is_sane() {
            bars.push(bar);
        } else {
            rejected += 1;
        }
    }
    Ok((bars, rejected))
}

/// Load signals from a JSON array or a JSONL file.
pub fn load_signals(path: &Path) -> Result<Vec<StrategySignal>, LoadError> {
    let file = open(path)?;
    let jsonl = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl") | Some("ndjson")
    );

    let signals = if jsonl {
        read_signals_jsonl(BufReader::new(file), path)?
    } else {
        serde_json::from_reader(BufReader::new(file)).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        })?
    };

    check_order(&signals, path)?;
    debug!(path = %path.display(), signals = signals.len(), "loaded signals");
    Ok(signals)
}

fn read_signals_jsonl<R: BufRead>(reader: R, path: &Path) -> Result<Vec<StrategySignal>, LoadError> {
    let mut signals = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let signal = serde_json::from_str(&line).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        signals.push(signal);
    }
    Ok(signals)
}

/// Reject streams whose timestamps go backwards.
pub fn check_order(signals: &[StrategySignal], path: &Path) -> Result<(), LoadError> {
    for (i, pair) in signals.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(LoadError::UnorderedSignals {
                path: path.to_path_buf(),
                index: i + 1,
                timestamp: pair[1].timestamp,
                previous: pair[0].timestamp,
            });
        }
    }
    Ok(())
}

/// One row of an externally produced trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedTrade {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub strategy_kind: StrategyKind,
    pub pnl: f64,
    pub return_pct: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Load a trade log for compound replay, in file order.
pub fn load_trade_log(path: &Path) -> Result<Vec<LoggedTrade>, LoadError> {
    let file = open(path)?;
    read_trade_log(file).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_trade_log<R: Read>(reader: R) -> Result<Vec<LoggedTrade>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize().collect()
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BARS_CSV: &str = "\
symbol,timestamp,open,high,low,close,volume
BTCUSDT,2024-01-02T09:01:00Z,100.0,101.0,99.0,100.5,12.5
BTCUSDT,2024-01-02T09:00:00Z,99.0,100.5,98.5,100.0,10.0
ETHUSDT,2024-01-02T09:00:00Z,50.0,51.0,49.0,50.5,3.0
ETHUSDT,2024-01-02T09:01:00Z,50.5,49.0,51.0,50.0,3.0
";

    fn signal_json(ts: &str) -> String {
        format!(
            r#"{{"symbol":"BTCUSDT","timestamp":"{ts}","kind":"counter_trend","entry_price":100.0,"stop_loss":98.0,"take_profit":104.0,"score":91.0,"confidence":0.7,"risk_tier":"medium"}}"#
        )
    }

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn bars_are_grouped_sorted_and_sanity_checked() {
        let (_dir, path) = write_temp("bars.csv", BARS_CSV);
        let loaded = load_bars(&path).unwrap();
        // ETH 09:01 has high < low
        assert_eq!(loaded.rejected_rows, 1);
        assert_eq!(loaded.market.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
        let btc = loaded.market.get("BTCUSDT").unwrap();
        assert_eq!(btc.bars()[0].close, 100.0);
        assert_eq!(btc.bars()[1].volume, 12.5);
    }

    #[test]
    fn empty_bar_file_is_error() {
        let (_dir, path) = write_temp("bars.csv", "symbol,timestamp,open,high,low,close,volume\n");
        assert!(matches!(load_bars(&path), Err(LoadError::Empty { .. })));
    }

    #[test]
    fn malformed_bar_row_is_csv_error() {
        let (_dir, path) = write_temp(
            "bars.csv",
            "symbol,timestamp,open,high,low,close,volume\nX,not-a-time,1,1,1,1,1\n",
        );
        assert!(matches!(load_bars(&path), Err(LoadError::Csv { .. })));
    }

    #[test]
    fn signals_from_json_array() {
        let text = format!(
            "[{},{}]",
            signal_json("2024-01-02T09:00:00Z"),
            signal_json("2024-01-02T09:00:00Z")
        );
        let (_dir, path) = write_temp("signals.json", &text);
        let signals = load_signals(&path).unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].kind, StrategyKind::CounterTrend);
        assert!(signals[0].features.is_empty());
    }

    #[test]
    fn signals_from_jsonl_skip_blank_lines() {
        let text = format!(
            "{}\n\n{}\n",
            signal_json("2024-01-02T09:00:00Z"),
            signal_json("2024-01-02T09:05:00Z")
        );
        let (_dir, path) = write_temp("signals.jsonl", &text);
        assert_eq!(load_signals(&path).unwrap().len(), 2);
    }

    #[test]
    fn jsonl_error_reports_line() {
        let text = format!("{}\n{{oops\n", signal_json("2024-01-02T09:00:00Z"));
        let (_dir, path) = write_temp("signals.jsonl", &text);
        match load_signals(&path) {
            Err(LoadError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected JSON error, got {other:?}"),
        }
    }

    #[test]
    fn out_of_order_signals_rejected() {
        let text = format!(
            "{}\n{}\n",
            signal_json("2024-01-02T09:05:00Z"),
            signal_json("2024-01-02T09:00:00Z")
        );
        let (_dir, path) = write_temp("signals.jsonl", &text);
        match load_signals(&path) {
            Err(LoadError::UnorderedSignals { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected ordering error, got {other:?}"),
        }
    }

    #[test]
    fn trade_log_confidence_is_optional() {
        let text = "\
timestamp,symbol,strategy_kind,pnl,return_pct,confidence
2024-01-02T09:00:00Z,BTCUSDT,breakout,12.5,1.25,0.9
2024-01-02T10:00:00Z,BTCUSDT,trend,-4.0,0.4,
";
        let trades = read_trade_log(text.as_bytes()).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].confidence, Some(0.9));
        assert_eq!(trades[1].confidence, None);
        assert_eq!(trades[1].strategy_kind, StrategyKind::Trend);
    }

    #[test]
    fn trade_log_rows_serialize_back_to_snake_case() {
        let text = "\
timestamp,symbol,strategy_kind,pnl,return_pct,confidence
2024-01-02T09:00:00Z,BTCUSDT,counter_trend,12.5,1.25,
";
        let trades = read_trade_log(text.as_bytes()).unwrap();
        let json = serde_json::to_value(&trades[0]).unwrap();
        assert_eq!(json["strategy_kind"], "counter_trend");
        assert!(json["confidence"].is_null());
        let back: LoggedTrade = serde_json::from_value(json).unwrap();
        assert_eq!(back, trades[0]);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_signals(Path::new("/no/such/signals.json")),
            Err(LoadError::Io { .. })
        ));
    }
}
