// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), all taken over the trailing `period` closes.
//
// σ is the population standard deviation (divide by `period`).  A window of
// identical closes collapses all three bands exactly onto the price, whatever
// its binary representation.
//
// The series form is aligned 1:1 with the input; the first `period - 1`
// positions lack a full window and are `None`.

use serde::Serialize;

/// Bollinger Bands for every position of a close series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl BollingerSeries {
    fn undefined(len: usize) -> Self {
        Self {
            upper: vec![None; len],
            middle: vec![None; len],
            lower: vec![None; len],
        }
    }
}

/// Mean and population standard deviation of `window`.
///
/// Deviations are taken from the first close, so a flat window yields exactly
/// `(close, 0.0)` and rounding in the sum never leaks into σ.
fn mean_and_std(window: &[f64]) -> (f64, f64) {
    let Some(&first) = window.first() else {
        return (f64::NAN, f64::NAN);
    };
    if window.iter().all(|&x| x == first) {
        return (first, 0.0);
    }

    let n = window.len() as f64;
    let shift = window.iter().map(|x| x - first).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|x| (x - first - shift).powi(2))
        .sum::<f64>()
        / n;
    (first + shift, variance.max(0.0).sqrt())
}

/// Calculate Bollinger Bands at every position of `closes`.
///
/// Position `i` is defined once `closes[i + 1 - period ..= i]` exists.
/// `period == 0` or fewer than `period` closes leave every position `None`.
pub fn calculate_bollinger_series(closes: &[f64], period: usize, num_std: f64) -> BollingerSeries {
    let mut series = BollingerSeries::undefined(closes.len());
    if period == 0 || closes.len() < period {
        return series;
    }

    for (offset, window) in closes.windows(period).enumerate() {
        let (middle, std_dev) = mean_and_std(window);
        let upper = middle + num_std * std_dev;
        let lower = middle - num_std * std_dev;

        if !(upper.is_finite() && lower.is_finite()) {
            continue;
        }

        let i = offset + period - 1;
        series.upper[i] = Some(upper);
        series.middle[i] = Some(middle);
        series.lower[i] = Some(lower);
    }

    series
}

/// Band spread as a percentage of the middle band: `(upper - lower) / middle * 100`.
///
/// `None` when the middle band is zero or the result is not finite.
pub fn band_width_pct(upper: f64, middle: f64, lower: f64) -> Option<f64> {
    if middle == 0.0 {
        return None;
    }
    let width = (upper - lower) / middle * 100.0;
    width.is_finite().then_some(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger_series(&closes, 20, 2.0);
        let (upper, middle, lower) = (
            bb.upper[19].unwrap(),
            bb.middle[19].unwrap(),
            bb.lower[19].unwrap(),
        );
        assert!(upper > middle);
        assert!(lower < middle);
        assert!(band_width_pct(upper, middle, lower).unwrap() > 0.0);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let closes = vec![1.0, 2.0, 3.0];
        let series = calculate_bollinger_series(&closes, 20, 2.0);
        assert_eq!(series.upper.len(), 3);
        assert!(series.upper.iter().all(Option::is_none));
    }

    #[test]
    fn width_of_flat_band_is_zero() {
        assert_eq!(band_width_pct(100.0, 100.0, 100.0), Some(0.0));
        assert_eq!(band_width_pct(1.0, 0.0, -1.0), None);
        assert_eq!(band_width_pct(110.0, 100.0, 90.0), Some(20.0));
    }

    #[test]
    fn series_uses_population_std() {
        // mean 2, population variance 2/3
        let series = calculate_bollinger_series(&[1.0, 2.0, 3.0], 3, 2.0);
        let expected_offset = 2.0 * (2.0_f64 / 3.0).sqrt();
        assert_eq!(series.middle[..2], [None, None]);
        assert!((series.middle[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((series.upper[2].unwrap() - (2.0 + expected_offset)).abs() < 1e-12);
        assert!((series.lower[2].unwrap() - (2.0 - expected_offset)).abs() < 1e-12);
    }

    #[test]
    fn series_warm_up_is_period_minus_one() {
        let closes: Vec<f64> = (0..30).map(|x| 50.0 + (x as f64 * 0.7).cos()).collect();
        let series = calculate_bollinger_series(&closes, 20, 2.0);
        assert!(series.upper[..19].iter().all(Option::is_none));
        assert!(series.lower[19..].iter().all(Option::is_some));
    }

    #[test]
    fn series_bands_are_ordered() {
        let closes: Vec<f64> = (0..60)
            .map(|x| 100.0 + (x as f64 * 0.3).sin() * 5.0 + x as f64 * 0.1)
            .collect();
        let series = calculate_bollinger_series(&closes, 20, 2.0);
        for i in 0..closes.len() {
            if let (Some(lo), Some(mid), Some(hi)) =
                (series.lower[i], series.middle[i], series.upper[i])
            {
                assert!(lo <= mid && mid <= hi, "bands out of order at {i}");
            }
        }
    }

    #[test]
    fn series_flat_collapses_to_price() {
        let series = calculate_bollinger_series(&[42.0; 25], 20, 2.0);
        for i in 19..25 {
            assert_eq!(series.upper[i], Some(42.0));
            assert_eq!(series.middle[i], Some(42.0));
            assert_eq!(series.lower[i], Some(42.0));
        }
    }

    #[test]
    fn flat_window_of_inexact_prices_collapses() {
        for price in [0.1, 0.7, 3.3, 1234.56] {
            for k in [0.5, 2.0] {
                let series = calculate_bollinger_series(&[price; 25], 20, k);
                for i in 19..25 {
                    assert_eq!(series.upper[i], Some(price), "upper {price} k={k}");
                    assert_eq!(series.middle[i], Some(price), "middle {price} k={k}");
                    assert_eq!(series.lower[i], Some(price), "lower {price} k={k}");
                }
            }
        }
    }

    #[test]
    fn shifted_mean_matches_plain_mean() {
        let window = [10.1, 10.3, 9.9, 10.0, 10.2];
        let (mean, std) = mean_and_std(&window);
        assert!((mean - 10.1).abs() < 1e-12);
        assert!((std - 0.02_f64.sqrt()).abs() < 1e-12);
    }
}
