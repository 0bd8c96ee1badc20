//! Domain types for RiskLab

pub mod bar;
pub mod ids;
pub mod outcome;
pub mod series;
pub mod signal;

pub use bar::PriceBar;
pub use ids::{ConfigHash, DatasetHash, RunId};
pub use outcome::{ExitReason, TradeOutcome};
pub use series::{bars_after, BarSeries, MarketData};
pub use signal::{Direction, RiskTier, StrategyKind, StrategySignal};

/// Symbol type alias
pub type Symbol = String;
