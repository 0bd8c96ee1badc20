//! RiskLab CLI — run, replay, and synth commands.
//!
//! Commands:
//! - `run`: gate, size and simulate a signal file against bars
//! - `replay`: compound an existing trade log through the capital ledger
//! - `synth`: write deterministic random-walk bars as CSV
//!
//! Log level comes from `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use risklab_runner::export::{export_bars_csv, export_replay_csv, save_artifacts, write};
use risklab_runner::{
    generate_bars, load_trade_log, replay_compound, replay_ledger_config, run_from_config,
    BacktestReport, ReplayResult, RunConfig, SyntheticConfig,
};

#[derive(Parser)]
#[command(
    name = "risklab",
    about = "RiskLab CLI: adaptive signal gating and capital-aware backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a signal file through the gate, ledger and simulator.
    Run {
        /// Path to a TOML run file. Without it the reference preset is used.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bars CSV; overrides `run.bars`.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Signals JSON or JSONL; overrides `run.signals`.
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Number of passes; overrides `run.passes`.
        #[arg(long)]
        passes: Option<usize>,

        /// Output directory; overrides `run.output_dir`. Defaults to ./results.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay a trade log with Kelly sizing and compounding.
    Replay {
        /// Trade log CSV (timestamp,symbol,strategy_kind,pnl,return_pct[,confidence]).
        #[arg(long)]
        trades: PathBuf,

        #[arg(long, default_value_t = 10_000.0)]
        initial_capital: f64,

        /// Write the replayed rows as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate synthetic bars for offline runs.
    Synth {
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,

        /// Number of bars.
        #[arg(long, default_value_t = 10_000)]
        bars: usize,

        #[arg(long, default_value_t = 1)]
        step_minutes: i64,

        /// First bar time (RFC 3339). Defaults to 2024-01-01T00:00:00Z.
        #[arg(long)]
        start: Option<String>,

        #[arg(long, default_value_t = 0.002)]
        volatility: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bars,
            signals,
            passes,
            output_dir,
        } => run_cmd(config, bars, signals, passes, output_dir),
        Commands::Replay {
            trades,
            initial_capital,
            output,
        } => replay_cmd(trades, initial_capital, output),
        Commands::Synth {
            symbol,
            bars,
            step_minutes,
            start,
            volatility,
            seed,
            out,
        } => synth_cmd(symbol, bars, step_minutes, start, volatility, seed, out),
    }
}

fn run_cmd(
    config_path: Option<PathBuf>,
    bars: Option<PathBuf>,
    signals: Option<PathBuf>,
    passes: Option<usize>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => RunConfig::from_file(&path)?,
        None => RunConfig::default(),
    };
    if bars.is_some() {
        config.run.bars = bars;
    }
    if signals.is_some() {
        config.run.signals = signals;
    }
    if let Some(n) = passes {
        config.run.passes = n;
    }
    if output_dir.is_some() {
        config.run.output_dir = output_dir;
    }
    config.validate()?;

    let report = run_from_config(&config)?;
    print_summary(&report);

    let out = config
        .run
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("results"));
    let run_dir = save_artifacts(&report, &out)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn replay_cmd(trades: PathBuf, initial_capital: f64, output: Option<PathBuf>) -> Result<()> {
    let config = replay_ledger_config(initial_capital);
    config.validate()?;

    let log = load_trade_log(&trades)?;
    let result = replay_compound(&log, config);
    print_replay(&result, initial_capital);

    if let Some(path) = output {
        write(&path, &export_replay_csv(&result)?)?;
        println!("Replay rows saved to: {}", path.display());
    }
    Ok(())
}

fn synth_cmd(
    symbol: String,
    bars: usize,
    step_minutes: i64,
    start: Option<String>,
    volatility: f64,
    seed: u64,
    out: PathBuf,
) -> Result<()> {
    let start = match start {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .with_context(|| format!("invalid --start '{s}'"))?
            .with_timezone(&Utc),
        None => Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .context("invalid default start")?,
    };

    let mut config = SyntheticConfig::new(symbol, bars, start, seed);
    config.step_minutes = step_minutes;
    config.volatility = volatility;

    let generated = generate_bars(&config);
    write(&out, &export_bars_csv(&generated)?)?;
    println!("Wrote {} bars to {}", generated.len(), out.display());
    Ok(())
}

fn print_summary(report: &BacktestReport) {
    println!();
    println!("Run {}", report.fingerprint.run_id);
    println!(
        "Symbols: {}  Signals: {}  Executed: {}  Rejected: {}",
        report.summary.symbols, report.summary.signals, report.summary.executed, report.summary.rejected
    );
    println!();
    println!(
        "{:<10} {:>7} {:>7} {:>12} {:>9} {:>9} {:>8} {:>8}",
        "Symbol", "Trades", "Reject", "Capital", "Return", "MaxDD", "WinRate", "PF"
    );
    println!("{}", "-".repeat(78));
    for s in &report.symbols {
        println!(
            "{:<10} {:>7} {:>7} {:>12.2} {:>8.2}% {:>8.2}% {:>7.1}% {:>8.2}",
            s.symbol,
            s.trades.len(),
            s.rejected.len(),
            s.risk.current_capital,
            s.risk.total_return_pct,
            s.metrics.max_drawdown * 100.0,
            s.metrics.win_rate * 100.0,
            s.metrics.profit_factor,
        );
    }
    println!("{}", "-".repeat(78));
    println!("Total pnl: {:.2}", report.summary.total_pnl);
    if !report.summary.retraining_advised.is_empty() {
        println!(
            "Retraining advised: {}",
            report.summary.retraining_advised.join(", ")
        );
    }
    println!();
}

fn print_replay(result: &ReplayResult, initial_capital: f64) {
    let m = &result.final_metrics;
    println!();
    println!("Initial capital:  {:>14.2}", initial_capital);
    println!("Final capital:    {:>14.2}", m.current_capital);
    println!("Absolute return:  {:>14.2}", m.current_capital - initial_capital);
    println!("Total return:     {:>13.2}%", m.total_return_pct);
    println!("Max drawdown:     {:>13.2}%", result.max_drawdown_pct);
    println!("Trades:           {:>14}", m.total_trades);
    println!("Retrain points:   {:>14}", result.retrain_triggers.len());
    for t in result.retrain_triggers.iter().take(5) {
        println!(
            "  {} | drawdown {:.1}% | capital {:.2}",
            t.timestamp,
            t.drawdown * 100.0,
            t.capital
        );
    }
    println!();
}
