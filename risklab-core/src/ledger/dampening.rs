//! Size multipliers that shrink positions during drawdowns and losing streaks.

/// Drawdown span over which the mdd multiplier ramps from 1.0 down to 0.5.
pub const MDD_RAMP: f64 = 0.15;
const MDD_MAX_CUT: f64 = 0.5;

/// Loss streak length at which the loss multiplier starts cutting.
pub const LOSS_STREAK_START: u32 = 3;
const LOSS_STEP: f64 = 0.1;
const LOSS_MAX_CUT: f64 = 0.5;

/// Multiplier in `[0.5, 1.0]`.
///
/// 1.0 below `threshold`; falls linearly to 0.5 at `threshold + 0.15` and
/// stays there.
pub fn mdd_adjustment(drawdown: f64, threshold: f64) -> f64 {
    if drawdown < threshold {
        return 1.0;
    }
    let excess = ((drawdown - threshold) / MDD_RAMP).min(1.0);
    1.0 - MDD_MAX_CUT * excess
}

/// Multiplier in `[0.5, 1.0]`: 1.0 under three straight losses, then 0.1 less
/// per extra loss, floored at 0.5 from seven losses on.
pub fn consecutive_loss_adjustment(consecutive_losses: u32) -> f64 {
    if consecutive_losses < LOSS_STREAK_START {
        return 1.0;
    }
    let cut = (LOSS_STEP * f64::from(consecutive_losses - 2)).min(LOSS_MAX_CUT);
    1.0 - cut
}
