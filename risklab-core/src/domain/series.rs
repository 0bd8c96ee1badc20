//! BarSeries — per-symbol bars ordered by time, with "strictly after" lookup.

use super::bar::PriceBar;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// The suffix of time-sorted `bars` with `timestamp > ts`.
pub fn bars_after(bars: &[PriceBar], ts: DateTime<Utc>) -> &[PriceBar] {
    let start = bars.partition_point(|b| b.timestamp <= ts);
    &bars[start..]
}

/// Bars for one symbol, sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<PriceBar>,
}

impl BarSeries {
    /// Build a series, sorting by timestamp. The sort is stable, so bars that
    /// share a timestamp keep their input order.
    pub fn new(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// All bars with `timestamp > ts`.
    pub fn after(&self, ts: DateTime<Utc>) -> &[PriceBar] {
        bars_after(&self.bars, ts)
    }

}

impl From<Vec<PriceBar>> for BarSeries {
    fn from(bars: Vec<PriceBar>) -> Self {
        Self::new(bars)
    }
}

/// Bars for every symbol in a run, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: HashMap<String, BarSeries>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a flat bar list by symbol.
    pub fn from_bars(bars: Vec<PriceBar>) -> Self {
        let mut grouped: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for bar in bars {
            grouped.entry(bar.symbol.clone()).or_default().push(bar);
        }
        Self {
            series: grouped
                .into_iter()
                .map(|(symbol, bars)| (symbol, BarSeries::new(bars)))
                .collect(),
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, series: BarSeries) {
        self.series.insert(symbol.into(), series);
    }

    pub fn get(&self, symbol: &str) -> Option<&BarSeries> {
        self.series.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    /// Symbols in sorted order.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn bar_count(&self) -> usize {
        self.series.values().map(BarSeries::len).sum()
    }
}
