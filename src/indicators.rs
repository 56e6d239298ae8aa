//! Technical-indicator helpers: pure functions over a close series.
//!
//! These are not part of the ladder state machine; the `signal` command
//! uses them for a quick read on recent momentum.

use rust_decimal::Decimal;

/// Exponential moving average. Returns one value per input from the
/// `period`-th element on, seeded with the simple average of the first
/// `period` values.
pub fn ema(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let period_dec = Decimal::from(period as u64);
    let k = Decimal::from(2u64) / (period_dec + Decimal::ONE);

    let seed: Decimal = values[..period].iter().copied().sum::<Decimal>() / period_dec;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);

    let mut prev = seed;
    for value in &values[period..] {
        prev = (*value - prev) * k + prev;
        out.push(prev);
    }
    out
}

/// Relative strength index with Wilder smoothing. Returns one value per
/// input from the `period + 1`-th element on.
pub fn rsi(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() <= period {
        return Vec::new();
    }

    let period_dec = Decimal::from(period as u64);
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for pair in values[..=period].windows(2) {
        let change = pair[1] - pair[0];
        if change >= Decimal::ZERO {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let mut avg_gain = gains / period_dec;
    let mut avg_loss = losses / period_dec;

    let mut out = Vec::with_capacity(values.len() - period);
    out.push(rsi_point(avg_gain, avg_loss));

    for pair in values[period..].windows(2) {
        let change = pair[1] - pair[0];
        let (gain, loss) = if change >= Decimal::ZERO {
            (change, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -change)
        };
        avg_gain = (avg_gain * (period_dec - Decimal::ONE) + gain) / period_dec;
        avg_loss = (avg_loss * (period_dec - Decimal::ONE) + loss) / period_dec;
        out.push(rsi_point(avg_gain, avg_loss));
    }
    out
}

fn rsi_point(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return Decimal::ONE_HUNDRED;
    }
    let rs = avg_gain / avg_loss;
    Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs)
}

/// Momentum read from an EMA 9/21 crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

/// Compare the latest short EMA (9) against the long EMA (21).
pub fn ema_crossover(closes: &[Decimal]) -> Signal {
    let short = ema(closes, 9);
    let long = ema(closes, 21);
    match (short.last(), long.last()) {
        (Some(s), Some(l)) if s > l => Signal::Buy,
        (Some(s), Some(l)) if s < l => Signal::Sell,
        _ => Signal::Hold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_ema_of_constant_series_is_constant() {
        let values = vec![dec!(5); 30];
        let out = ema(&values, 9);
        assert_eq!(out.len(), 22);
        assert!(out.iter().all(|v| *v == dec!(5)));
    }

    #[test]
    fn test_ema_needs_full_period() {
        assert!(ema(&series(&[1, 2, 3]), 9).is_empty());
        assert!(ema(&series(&[1, 2, 3]), 0).is_empty());
    }

    #[test]
    fn test_ema_tracks_trend() {
        let rising: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let out = ema(&rising, 9);
        assert!(out.windows(2).all(|w| w[1] > w[0]));
        // EMA lags the raw series on a rising trend.
        assert!(*out.last().unwrap() < dec!(30));
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        let out = rsi(&rising, 14);
        assert!(out.iter().all(|v| *v == Decimal::ONE_HUNDRED));

        let falling: Vec<Decimal> = (1..=30).rev().map(Decimal::from).collect();
        let out = rsi(&falling, 14);
        assert!(out.iter().all(|v| v.is_zero()));
    }

    #[test]
    fn test_rsi_balanced_series_is_midrange() {
        let values: Vec<Decimal> = (0..40)
            .map(|i| if i % 2 == 0 { dec!(10) } else { dec!(11) })
            .collect();
        let out = rsi(&values, 14);
        let last = *out.last().unwrap();
        assert!(last > dec!(40) && last < dec!(60));
    }

    #[test]
    fn test_crossover_signals() {
        let rising: Vec<Decimal> = (1..=40).map(Decimal::from).collect();
        assert_eq!(ema_crossover(&rising), Signal::Buy);

        let falling: Vec<Decimal> = (1..=40).rev().map(Decimal::from).collect();
        assert_eq!(ema_crossover(&falling), Signal::Sell);

        assert_eq!(ema_crossover(&series(&[1, 2, 3])), Signal::Hold);
    }
}
