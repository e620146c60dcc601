// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3: Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The output is aligned 1:1 with the input closes.  The first `period`
// positions have no value (the seed consumes `period` deltas, which need
// `period + 1` closes) and are returned as `None`, never as 0.
// =============================================================================

use serde::Serialize;

/// Zone of an RSI reading relative to the oversold / overbought thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

/// Compute the RSI series for `closes`, aligned index-for-index.
///
/// # Edge cases
/// - `period == 0` => every position is `None`
/// - `closes.len() < period + 1` => every position is `None`
/// - Average loss zero with gains => 100.0; no movement at all => 50.0.
/// - A non-finite result ends the defined run; later positions stay `None`.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    // --- Compute price deltas ------------------------------------------------
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    match rsi_from_averages(avg_gain, avg_loss) {
        Some(rsi) => result[period] = Some(rsi),
        None => return result,
    }

    // --- Wilder's smoothing for subsequent values ----------------------------
    // deltas[i - 1] is the change that lands on closes[i].
    for i in (period + 1)..closes.len() {
        let delta = deltas[i - 1];
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result[i] = Some(rsi),
            None => break,
        }
    }

    result
}

impl RsiZone {
    /// Zone of `value`. Comparisons are strict, matching the signal
    /// classifier: a reading exactly at a threshold is `Neutral`.
    pub fn of(value: f64, oversold: f64, overbought: f64) -> Self {
        if value > overbought {
            Self::Overbought
        } else if value < oversold {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // No movement at all: neutral.
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi.clamp(0.0, 100.0))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- calculate_rsi ---------------------------------------------------

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        let series = calculate_rsi(&[1.0, 2.0, 3.0], 0);
        assert_eq!(series, vec![None, None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14: nothing defined, but still aligned.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 14);
        assert!(series.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_warm_up_is_exactly_period_positions() {
        let closes: Vec<f64> = (0..30).map(|x| 100.0 + (x as f64).sin()).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 30);
        assert!(series[..14].iter().all(Option::is_none));
        assert!(series[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market() {
        let closes = vec![100.0; 30];
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.iter().flatten().count(), 16);
        for v in series.into_iter().flatten() {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn rsi_wilder_smoothing_hand_computed() {
        // period 2: deltas +1, -1, +1
        // seed: gain 0.5, loss 0.5 => 50 at index 2
        // next: gain (0.5 + 1) / 2 = 0.75, loss 0.5 / 2 = 0.25 => RS 3 => 75
        let series = calculate_rsi(&[1.0, 2.0, 1.0, 2.0], 2);
        assert_eq!(series[0], None);
        assert_eq!(series[1], None);
        assert!((series[2].unwrap() - 50.0).abs() < 1e-10);
        assert!((series[3].unwrap() - 75.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    // ---- RsiZone ---------------------------------------------------------

    #[test]
    fn zone_of_extremes() {
        assert_eq!(RsiZone::of(100.0, 30.0, 70.0), RsiZone::Overbought);
        assert_eq!(RsiZone::of(0.0, 30.0, 70.0), RsiZone::Oversold);
        assert_eq!(RsiZone::of(50.0, 30.0, 70.0), RsiZone::Neutral);
    }

    #[test]
    fn zone_thresholds_are_exclusive() {
        assert_eq!(RsiZone::of(70.0, 30.0, 70.0), RsiZone::Neutral);
        assert_eq!(RsiZone::of(30.0, 30.0, 70.0), RsiZone::Neutral);
        assert_eq!(RsiZone::of(70.000001, 30.0, 70.0), RsiZone::Overbought);
    }
}
