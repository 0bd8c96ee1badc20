//! Fractional Kelly sizing from recent trade returns.

/// Inputs to [`kelly_fraction`], taken from the ledger config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KellyParams {
    /// Trailing trades considered.
    pub lookback: usize,
    /// Fewer recent trades than this returns `floor`.
    pub min_trades: usize,
    /// Returned whenever the estimate is not computable.
    pub floor: f64,
    /// Multiplier on the full Kelly fraction (0.25 = quarter Kelly).
    pub scale: f64,
    /// Upper clamp on the result.
    pub max_fraction: f64,
}

/// Fraction of capital to risk, in `[0, max_fraction]`.
///
/// `return_pcts` are percent returns, oldest first. Returns `params.floor`
/// when there are fewer than `min_trades` entries, when the trailing window
/// has no winners or no losers, or when the average loss is zero.
pub fn kelly_fraction(return_pcts: &[f64], params: &KellyParams) -> f64 {
    if return_pcts.len() < params.min_trades {
        return params.floor;
    }

    let start = return_pcts.len().saturating_sub(params.lookback);
    let returns: Vec<f64> = return_pcts[start..].iter().map(|r| r / 100.0).collect();

    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if wins.is_empty() || losses.is_empty() {
        return params.floor;
    }

    let win_prob = wins.len() as f64 / returns.len() as f64;
    let avg_win = wins.iter().sum::<f64>() / wins.len() as f64;
    let avg_loss = (losses.iter().sum::<f64>() / losses.len() as f64).abs();
    if avg_loss == 0.0 {
        return params.floor;
    }

    let b = avg_win / avg_loss;
    let full = (b * win_prob - (1.0 - win_prob)) / b;
    (full * params.scale).clamp(0.0, params.max_fraction)
}
