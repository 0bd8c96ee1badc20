//! Intrabar priority: resolve bars that touch both exit levels.
//!
//! A single OHLC bar cannot tell whether the high or the low came first. When
//! both the take-profit and the stop-loss lie inside a bar's range, the
//! priority decides which exit is assumed.

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrabarPriority {
    /// Optimistic: the take-profit is checked first.
    #[default]
    TakeProfitFirst,
    /// Conservative: the stop-loss is checked first.
    StopLossFirst,
}

impl IntrabarPriority {
    /// Exit reason for a bar given which levels it touched, or `None` when
    /// it touched neither.
    pub fn resolve(self, take_profit_hit: bool, stop_loss_hit: bool) -> Option<ExitReason> {
        match (self, take_profit_hit, stop_loss_hit) {
            (_, false, false) => None,
            (_, true, false) => Some(ExitReason::Profit),
            (_, false, true) => Some(ExitReason::StopLoss),
            (IntrabarPriority::TakeProfitFirst, true, true) => Some(ExitReason::Profit),
            (IntrabarPriority::StopLossFirst, true, true) => Some(ExitReason::StopLoss),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntrabarPriority::TakeProfitFirst => "take_profit_first",
            IntrabarPriority::StopLossFirst => "stop_loss_first",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_touch_is_unambiguous() {
        for p in [IntrabarPriority::TakeProfitFirst, IntrabarPriority::StopLossFirst] {
            assert_eq!(p.resolve(false, false), None);
            assert_eq!(p.resolve(true, false), Some(ExitReason::Profit));
            assert_eq!(p.resolve(false, true), Some(ExitReason::StopLoss));
        }
    }

    #[test]
    fn double_touch_follows_priority() {
        assert_eq!(
            IntrabarPriority::TakeProfitFirst.resolve(true, true),
            Some(ExitReason::Profit)
        );
        assert_eq!(
            IntrabarPriority::StopLossFirst.resolve(true, true),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn default_is_take_profit_first() {
        assert_eq!(IntrabarPriority::default(), IntrabarPriority::TakeProfitFirst);
    }
}
