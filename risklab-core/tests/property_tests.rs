//! Property tests for risk-loop invariants.
//!
//! Uses proptest to verify:
//! 1. Dampeners: both multipliers stay in [0.5, 1.0] and hit their anchors
//! 2. Kelly bounds: fraction in [0, max_position_pct], floor below 10 trades
//! 3. Size bounds: position size in [min_position, capital * max_position_pct]
//! 4. Ledger accounting: drawdown identity, monotone peak, streak rules
//! 5. Gate monotonicity: raising score or confidence never turns accept into reject
//! 6. Simulator: exits at a boundary or a bar close, pnl sign follows direction

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeMap;

use risklab_core::domain::{Direction, ExitReason, PriceBar, RiskTier, StrategyKind, StrategySignal};
use risklab_core::gate::{GateConfig, GatePolicy};
use risklab_core::ledger::{
    consecutive_loss_adjustment, kelly_fraction, mdd_adjustment, CapitalLedger, LedgerConfig,
};
use risklab_core::simulator::OutcomeSimulator;

// ── Strategies (proptest) ────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
}

fn arb_return_pct() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-15.0..-0.01_f64),
        (0.01..15.0_f64),
        Just(0.0),
    ]
}

fn arb_pnl() -> impl Strategy<Value = f64> {
    (-2_000.0..2_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_tier() -> impl Strategy<Value = RiskTier> {
    prop_oneof![
        Just(RiskTier::Low),
        Just(RiskTier::Medium),
        Just(RiskTier::High),
        Just(RiskTier::Extreme),
    ]
}

fn arb_kind() -> impl Strategy<Value = StrategyKind> {
    prop_oneof![
        Just(StrategyKind::Breakout),
        Just(StrategyKind::Trend),
        Just(StrategyKind::CounterTrend),
    ]
}

fn make_signal(kind: StrategyKind, score: f64, confidence: f64, tier: RiskTier) -> StrategySignal {
    let (stop_loss, take_profit) = match kind.direction() {
        Direction::Long => (98.0, 104.0),
        Direction::Short => (102.0, 96.0),
    };
    StrategySignal {
        symbol: "BTCUSDT".into(),
        timestamp: t0(),
        kind,
        entry_price: 100.0,
        stop_loss,
        take_profit,
        score,
        confidence,
        risk_tier: tier,
        features: BTreeMap::new(),
    }
}

/// Random walk of `n` bars, one minute apart, starting after `t0`.
fn arb_bars() -> impl Strategy<Value = Vec<PriceBar>> {
    prop::collection::vec((-1.5..1.5_f64, 0.0..1.5_f64, 0.0..1.5_f64), 0..80).prop_map(|steps| {
        let mut close = 100.0;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (step, up, down))| {
                let open = close;
                close = (close + step).max(1.0);
                let high = open.max(close) + up;
                let low = (open.min(close) - down).max(0.5);
                PriceBar::new(
                    t0() + Duration::minutes(i as i64 + 1),
                    "BTCUSDT",
                    open,
                    high,
                    low,
                    close,
                    1_000.0,
                )
            })
            .collect()
    })
}

// ── 1. Dampeners ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn mdd_adjustment_bounded(dd in 0.0..1.0_f64, threshold in 0.0..0.5_f64) {
        let adj = mdd_adjustment(dd, threshold);
        prop_assert!((0.5..=1.0).contains(&adj));
        if dd < threshold {
            prop_assert_eq!(adj, 1.0);
        }
        if dd >= threshold + 0.15 + 1e-9 {
            prop_assert!((adj - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn loss_adjustment_bounded(losses in 0u32..100) {
        let adj = consecutive_loss_adjustment(losses);
        prop_assert!((0.5..=1.0).contains(&adj));
        if losses < 3 {
            prop_assert_eq!(adj, 1.0);
        }
        if losses >= 7 {
            prop_assert!((adj - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn mdd_adjustment_non_increasing(a in 0.0..1.0_f64, b in 0.0..1.0_f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(mdd_adjustment(hi, 0.15) <= mdd_adjustment(lo, 0.15));
    }
}

// ── 2. Kelly bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn kelly_within_bounds(
        returns in prop::collection::vec(arb_return_pct(), 0..150),
        max_pct in 0.02..0.5_f64,
    ) {
        let config = LedgerConfig { max_position_pct: max_pct, ..LedgerConfig::default() };
        let f = kelly_fraction(&returns, &config.kelly_params());
        prop_assert!(f >= 0.0);
        prop_assert!(f <= max_pct);
        if returns.len() < 10 {
            prop_assert_eq!(f, 0.01);
        }
    }
}

// ── 3. Size bounds ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn position_size_within_bounds(
        pnls in prop::collection::vec((arb_pnl(), arb_return_pct()), 0..60),
        confidence in 0.0..1.0_f64,
    ) {
        let mut ledger = CapitalLedger::new(LedgerConfig {
            initial_capital: 50_000.0,
            ..LedgerConfig::default()
        });
        for (i, (pnl, ret)) in pnls.iter().enumerate() {
            ledger.update(t0() + Duration::minutes(i as i64), *pnl, *ret);
        }
        let capital = ledger.state().current_capital;
        let cap = capital * ledger.config().max_position_pct;
        prop_assume!(cap >= 100.0);

        let size = ledger.position_size(confidence);
        prop_assert!(size >= 100.0);
        prop_assert!(size <= cap + 1e-9);
    }
}

// ── 4. Ledger accounting ─────────────────────────────────────────────

proptest! {
    #[test]
    fn ledger_invariants_hold_after_every_update(
        pnls in prop::collection::vec(arb_pnl(), 1..100),
    ) {
        let mut ledger = CapitalLedger::default();
        let mut prev_peak = ledger.state().peak_capital;
        let mut expected_streak = 0u32;
        let mut expected_capital = 10_000.0;

        for (i, pnl) in pnls.iter().enumerate() {
            ledger.update(t0() + Duration::minutes(i as i64), *pnl, pnl / 100.0);
            let s = ledger.state();

            expected_capital += pnl;
            prop_assert!((s.current_capital - expected_capital).abs() < 1e-6);

            prop_assert!(s.peak_capital >= prev_peak);
            prev_peak = s.peak_capital;

            let expected_dd = ((s.peak_capital - s.current_capital) / s.peak_capital).max(0.0);
            prop_assert!((s.current_drawdown - expected_dd).abs() < 1e-12);

            expected_streak = if *pnl < 0.0 { expected_streak + 1 } else { 0 };
            prop_assert_eq!(s.consecutive_losses, expected_streak);
        }
        prop_assert_eq!(ledger.state().trade_history.len(), pnls.len());
        prop_assert_eq!(ledger.capital_history().len(), pnls.len() + 1);
    }
}

// ── 5. Gate monotonicity ─────────────────────────────────────────────

proptest! {
    /// For a fixed policy, a signal that passes keeps passing when its score
    /// or confidence goes up.
    #[test]
    fn gate_monotonic_in_score_and_confidence(
        score in 0.0..100.0_f64,
        confidence in 0.0..1.0_f64,
        bump_score in 0.0..20.0_f64,
        bump_conf in 0.0..0.5_f64,
        tier in arb_tier(),
        history in prop::collection::vec(60.0..100.0_f64, 0..40),
    ) {
        let mut policy = GatePolicy::from_config(&GateConfig::default());
        for s in history {
            policy.window.push(s);
        }
        let base = make_signal(StrategyKind::Breakout, score, confidence, tier);
        let better = make_signal(
            StrategyKind::Breakout,
            (score + bump_score).min(100.0),
            (confidence + bump_conf).min(1.0),
            tier,
        );
        if policy.check(&base).is_none() {
            prop_assert!(policy.check(&better).is_none());
        }
    }

    #[test]
    fn below_min_score_always_rejected(
        gap in 0.01..50.0_f64,
        confidence in 0.0..1.0_f64,
        tier in arb_tier(),
    ) {
        let mut policy = GatePolicy::from_config(&GateConfig::default());
        let decision = policy.should_execute(&make_signal(
            StrategyKind::Trend,
            80.0 - gap,
            confidence,
            tier,
        ));
        prop_assert!(decision.reason().starts_with("score below floor"));
        prop_assert!(policy.window.is_empty());
    }
}

// ── 6. Simulator ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn simulator_exit_is_consistent(
        kind in arb_kind(),
        bars in arb_bars(),
        size in 100.0..5_000.0_f64,
    ) {
        let signal = make_signal(kind, 90.0, 0.8, RiskTier::Low);
        let out = OutcomeSimulator::default().simulate(&signal, size, &bars);

        prop_assert!(out.exit_timestamp > signal.timestamp);
        prop_assert_eq!(out.duration_secs, (out.exit_timestamp - signal.timestamp).num_seconds());
        prop_assert_eq!(out.direction, kind.direction());

        match out.exit_reason {
            ExitReason::Profit => {
                prop_assert_eq!(out.exit_price, signal.take_profit);
            }
            ExitReason::StopLoss => {
                prop_assert_eq!(out.exit_price, signal.stop_loss);
            }
            ExitReason::Timeout => {
                if bars.is_empty() {
                    prop_assert_eq!(out.exit_price, signal.entry_price);
                    prop_assert_eq!(out.pnl, 0.0);
                } else {
                    let last = &bars[bars.len().min(60) - 1];
                    prop_assert_eq!(out.exit_price, last.close);
                }
            }
        }

        // return_pct is long-style; pnl flips for shorts
        let expected_ret = (out.exit_price - signal.entry_price) / signal.entry_price * 100.0;
        prop_assert!((out.return_pct - expected_ret).abs() < 1e-9);
        let signed = match kind.direction() {
            Direction::Long => expected_ret,
            Direction::Short => -expected_ret,
        };
        prop_assert!((out.pnl - signed / 100.0 * size).abs() < 1e-6);
    }
}
