//! Breakout signal type and the extremum comparison primitives.
//!
//! Window values are compared through [`PriceLike`]: anything that cannot produce a
//! finite number makes the comparison fail closed (`false`) instead of erroring.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    None,
}

impl Signal {
    pub fn is_trade(self) -> bool {
        !matches!(self, Signal::None)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => f.write_str("Buy"),
            Signal::Sell => f.write_str("Sell"),
            Signal::None => f.write_str("None"),
        }
    }
}

/// A value that may or may not be usable as a price in a comparison.
pub trait PriceLike {
    /// The value as a finite `f64`, or `None` when it is not numeric.
    fn comparable(&self) -> Option<f64>;
}

impl PriceLike for f64 {
    fn comparable(&self) -> Option<f64> {
        self.is_finite().then_some(*self)
    }
}

impl PriceLike for Option<f64> {
    fn comparable(&self) -> Option<f64> {
        self.and_then(|v| v.comparable())
    }
}

impl PriceLike for &str {
    fn comparable(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok().and_then(|v| v.comparable())
    }
}

impl PriceLike for String {
    fn comparable(&self) -> Option<f64> {
        self.as_str().comparable()
    }
}

/// True iff `candidate` is strictly greater than every value in `window_highs`.
pub fn is_new_high<C: PriceLike, W: PriceLike>(candidate: C, window_highs: &[W]) -> bool {
    let Some(candidate) = candidate.comparable() else {
        return false;
    };
    window_highs
        .iter()
        .all(|h| h.comparable().is_some_and(|h| candidate > h))
}

/// True iff `candidate` is strictly lower than every value in `window_lows`.
pub fn is_new_low<C: PriceLike, W: PriceLike>(candidate: C, window_lows: &[W]) -> bool {
    let Some(candidate) = candidate.comparable() else {
        return false;
    };
    window_lows
        .iter()
        .all(|l| l.comparable().is_some_and(|l| candidate < l))
}

pub fn is_above_open(current: f64, open: f64) -> bool {
    current > open
}

pub fn is_below_open(current: f64, open: f64) -> bool {
    current < open
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_high_strict() {
        let window = [20.0, 22.5, 21.0];
        assert!(is_new_high(22.6, &window));
        assert!(!is_new_high(22.5, &window));
        assert!(!is_new_high(10.0, &window));
    }

    #[test]
    fn new_low_strict() {
        let window = [20.0, 18.5, 21.0];
        assert!(is_new_low(18.4, &window));
        assert!(!is_new_low(18.5, &window));
        assert!(!is_new_low(30.0, &window));
    }

    #[test]
    fn empty_window_is_vacuously_extreme() {
        let window: [f64; 0] = [];
        assert!(is_new_high(1.0, &window));
        assert!(is_new_low(1.0, &window));
    }

    #[test]
    fn nan_in_window_fails_closed() {
        let window = [20.0, f64::NAN, 21.0];
        assert!(!is_new_high(100.0, &window));
        assert!(!is_new_low(1.0, &window));
    }

    #[test]
    fn string_window_parses_numbers() {
        let window = ["20.0", " 21.5 "];
        assert!(is_new_high(22.0, &window));
        assert!(is_new_low(19.0, &window));
    }

    #[test]
    fn non_numeric_string_fails_closed() {
        let window = ["20.0", "n/a", "21.5"];
        assert!(!is_new_high(99.0, &window));
        assert!(!is_new_low(1.0, &window));
    }

    #[test]
    fn missing_value_fails_closed() {
        let window = [Some(20.0), None];
        assert!(!is_new_high(99.0, &window));
    }

    #[test]
    fn non_numeric_candidate_fails_closed() {
        assert!(!is_new_high(f64::INFINITY, &[1.0]));
        assert!(!is_new_low("abc", &[1.0]));
    }

    #[test]
    fn open_comparisons_are_strict() {
        assert!(is_above_open(21.0, 20.0));
        assert!(!is_above_open(20.0, 20.0));
        assert!(is_below_open(19.0, 20.0));
        assert!(!is_below_open(20.0, 20.0));
    }

    #[test]
    fn signal_default_is_none() {
        assert_eq!(Signal::default(), Signal::None);
        assert!(!Signal::None.is_trade());
        assert!(Signal::Buy.is_trade());
    }
}
