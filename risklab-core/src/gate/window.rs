//! Rolling window of recently accepted scores.

use serde::{Deserialize, Serialize};

/// Recent accepted scores, used for the dynamic admission threshold.
///
/// The buffer grows to `2 * window` entries and is then cut back to the most
/// recent `window`, so the trim cost is paid once per `window` pushes.
/// Statistics always look at the trailing `window` entries only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWindow {
    scores: Vec<f64>,
    window: usize,
}

impl ScoreWindow {
    pub fn new(window: usize) -> Self {
        Self {
            scores: Vec::with_capacity(window * 2 + 1),
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of scores currently buffered (between 0 and `2 * window`).
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// True once at least `window` scores are buffered.
    pub fn is_full(&self) -> bool {
        self.scores.len() >= self.window
    }

    pub fn push(&mut self, score: f64) {
        self.scores.push(score);
        if self.scores.len() > self.window * 2 {
            let excess = self.scores.len() - self.window;
            self.scores.drain(..excess);
        }
    }

    /// The trailing `window` scores (fewer if not yet full).
    pub fn recent(&self) -> &[f64] {
        let start = self.scores.len().saturating_sub(self.window);
        &self.scores[start..]
    }

    pub fn mean(&self) -> Option<f64> {
        let recent = self.recent();
        if recent.is_empty() {
            return None;
        }
        Some(recent.iter().sum::<f64>() / recent.len() as f64)
    }

    /// Population standard deviation of the trailing window.
    pub fn std_dev(&self) -> Option<f64> {
        let recent = self.recent();
        let mean = self.mean()?;
        let var = recent.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / recent.len() as f64;
        Some(var.sqrt())
    }

    /// `mean + 0.5 * stddev` of the trailing window, once the window is full.
    pub fn dynamic_threshold(&self) -> Option<f64> {
        if !self.is_full() || self.window == 0 {
            return None;
        }
        Some(self.mean()? + 0.5 * self.std_dev()?)
    }
}
