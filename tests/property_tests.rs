//! Property tests for the signal, scaling, windowing and backtest invariants.

mod common;

use common::*;
use ndarray::Array2;
use proptest::prelude::*;
use std::collections::BTreeMap;
use vixtrigger::domain::backtest::evaluate;
use vixtrigger::domain::extremum::{Quote, SignalEngine};
use vixtrigger::domain::features::{FeatureBuilder, FeatureFrame};
use vixtrigger::domain::scaling::{MinMaxScaler, ScalingRange};
use vixtrigger::domain::signal::{Signal, is_new_high, is_new_low};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..100.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_window() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..30)
}

/// A valid bar built from four arbitrary prices.
fn arb_bar(day: u64) -> impl Strategy<Value = PriceBar> {
    (arb_price(), arb_price(), arb_price(), arb_price()).prop_map(move |(a, b, c, d)| {
        let high = a.max(b).max(c).max(d);
        let low = a.min(b).min(c).min(d);
        PriceBar::new(date(2021, 1, 1) + chrono::Days::new(day), b, high, low, c).unwrap()
    })
}

// ── Extremum comparisons ─────────────────────────────────────────────

proptest! {
    #[test]
    fn new_high_iff_strictly_above_max(window in arb_window(), candidate in arb_price()) {
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(is_new_high(candidate, &window), candidate > max);
        prop_assert!(!is_new_high(max, &window));
    }

    #[test]
    fn new_low_iff_strictly_below_min(window in arb_window(), candidate in arb_price()) {
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        prop_assert_eq!(is_new_low(candidate, &window), candidate < min);
        prop_assert!(!is_new_low(min, &window));
    }

    #[test]
    fn bad_value_anywhere_fails_closed(window in arb_window(), position in any::<prop::sample::Index>()) {
        let at = position.index(window.len());

        let mut numbers = window.clone();
        numbers[at] = f64::NAN;
        prop_assert!(!is_new_high(1e9, &numbers));
        prop_assert!(!is_new_low(-1e9, &numbers));

        let mut text: Vec<String> = window.iter().map(|v| v.to_string()).collect();
        text[at] = "n/a".to_string();
        prop_assert!(!is_new_high(1e9, &text));
        prop_assert!(!is_new_low(-1e9, &text));
    }

    #[test]
    fn buy_and_sell_never_both(
        window in prop::collection::vec(arb_bar(0), 3),
        today in arb_bar(10),
    ) {
        let engine = SignalEngine::new(3).unwrap();
        let eval = engine.evaluate(&window, &Quote::from_bar(&today)).unwrap();
        let buy = eval.below_open && eval.new_high;
        let sell = eval.above_open && eval.new_low;
        match eval.signal {
            Signal::Buy => prop_assert!(buy && !sell),
            Signal::Sell => prop_assert!(sell && !buy),
            Signal::None => prop_assert!(!(buy ^ sell)),
        }
    }
}

// ── Scaling and windows ──────────────────────────────────────────────

proptest! {
    #[test]
    fn target_scaler_round_trips(values in prop::collection::vec(arb_price(), 2..50)) {
        let scaler = MinMaxScaler::fit_values(&values, ScalingRange::default()).unwrap();
        for &v in &values {
            let back = scaler.inverse_value(scaler.transform_value(v).unwrap()).unwrap();
            prop_assert!((back - v).abs() < 1e-9);
        }
    }

    #[test]
    fn training_set_has_rows_minus_steps_examples(rows in 1usize..60, steps in 1usize..20) {
        let frame = FeatureFrame::new(
            (0..rows).map(|i| date(2022, 1, 1) + chrono::Days::new(i as u64)).collect(),
            vec!["a".into(), "b".into()],
            Array2::from_shape_fn((rows, 2), |(i, j)| (i * (j + 1)) as f64),
        )
        .unwrap();
        let builder = FeatureBuilder::new(steps, ScalingRange::default()).unwrap();

        match builder.build_training_set(&frame, 1, None) {
            Ok(set) => {
                prop_assert!(steps < rows);
                prop_assert_eq!(set.examples(), rows - steps);
                prop_assert_eq!(set.x.dim(), (rows - steps, steps, 2));
            }
            Err(_) => prop_assert!(steps >= rows),
        }
    }
}

// ── Backtest ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn delivery_order_does_not_change_the_report(
        signals in prop::collection::vec(any::<bool>(), 1..20),
        prices in prop::collection::vec(arb_price(), 20),
        seed in any::<u64>(),
    ) {
        let stream: Vec<_> = signals
            .iter()
            .enumerate()
            .map(|(i, &buy)| {
                let signal = if buy { Signal::Buy } else { Signal::Sell };
                (date(2021, 1, 1) + chrono::Days::new(i as u64), signal)
            })
            .collect();
        let closes: BTreeMap<String, f64> = stream
            .iter()
            .zip(&prices)
            .map(|((d, _), &p)| (d.format("%Y-%m-%d").to_string(), p))
            .collect();

        // Deterministic rotation and reversal stand in for an arbitrary shuffle.
        let mut shuffled = stream.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        if seed % 2 == 0 {
            shuffled.reverse();
        }

        let expected = evaluate(&stream, &closes);
        prop_assert_eq!(evaluate(&shuffled, &closes), expected.clone());
        prop_assert!(expected.rejected_sells.is_empty());
        for trade in &expected.trades {
            prop_assert!(trade.sell_date > trade.buy_date);
        }
    }
}
