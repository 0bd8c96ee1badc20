//! RiskLab Core — adaptive signal gate, capital ledger, outcome simulator, engine.
//!
//! This crate contains the risk feedback loop:
//! - Domain types (signals, bars, outcomes, IDs)
//! - Adaptive signal gate with self-tuning thresholds
//! - Capital ledger: fractional Kelly sizing with drawdown and loss-streak dampening
//! - Deterministic stop-loss / take-profit outcome simulator
//! - Engine that runs signals through gate → size → simulate → update → adapt
//!
//! The core does no I/O; loading, export and parallel runs live in `risklab-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod gate;
pub mod ledger;
pub mod rng;
pub mod simulator;

pub use config::{ConfigError, RiskConfig};
pub use engine::{PassResult, RiskEngine, SignalResult};
