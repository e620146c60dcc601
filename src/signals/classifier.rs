// =============================================================================
// Signal Classifier: RSI + Bollinger membership sets
// =============================================================================
//
// For each timestamp whose RSI and both bands are defined:
//
//   BUY  if rsi < oversold   OR close < lower band
//   SELL if rsi > overbought OR close > upper band
//
// Both comparisons are strict.  The two conditions are independent, so one
// timestamp can belong to BUY and SELL at once; the set keeps both.  Rows with
// any undefined indicator are not classified at all (`None`).
// =============================================================================

use serde::{Deserialize, Serialize};

/// Oversold / overbought RSI levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

/// A single signal membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Signal memberships of one timestamp: none, BUY, SELL, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSet {
    pub buy: bool,
    pub sell: bool,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        !self.buy && !self.sell
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::Buy => self.buy,
            SignalKind::Sell => self.sell,
        }
    }

    pub fn kinds(&self) -> Vec<SignalKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.buy {
            kinds.push(SignalKind::Buy);
        }
        if self.sell {
            kinds.push(SignalKind::Sell);
        }
        kinds
    }
}

/// Classify one row. Returns `None` if any indicator is undefined.
pub fn classify(
    close: f64,
    rsi: Option<f64>,
    band_low: Option<f64>,
    band_high: Option<f64>,
    thresholds: &SignalThresholds,
) -> Option<SignalSet> {
    let (rsi, low, high) = (rsi?, band_low?, band_high?);

    Some(SignalSet {
        buy: rsi < thresholds.oversold || close < low,
        sell: rsi > thresholds.overbought || close > high,
    })
}

/// Classify every row of aligned series.
///
/// All slices must have the same length as `closes`.
pub fn classify_series(
    closes: &[f64],
    rsi: &[Option<f64>],
    band_low: &[Option<f64>],
    band_high: &[Option<f64>],
    thresholds: &SignalThresholds,
) -> Vec<Option<SignalSet>> {
    debug_assert_eq!(closes.len(), rsi.len());
    debug_assert_eq!(closes.len(), band_low.len());
    debug_assert_eq!(closes.len(), band_high.len());

    closes
        .iter()
        .zip(rsi)
        .zip(band_low.iter().zip(band_high))
        .map(|((&close, &r), (&lo, &hi))| classify(close, r, lo, hi, thresholds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> SignalThresholds {
        SignalThresholds::default()
    }

    #[test]
    fn neutral_row_is_empty_set() {
        let set = classify(100.0, Some(50.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(set.is_empty());
        assert!(set.kinds().is_empty());
    }

    #[test]
    fn low_rsi_is_buy() {
        let set = classify(100.0, Some(29.9), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(set.buy);
        assert!(!set.sell);
    }

    #[test]
    fn close_below_lower_band_is_buy() {
        let set = classify(94.0, Some(50.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert_eq!(set.kinds(), vec![SignalKind::Buy]);
    }

    #[test]
    fn high_rsi_or_close_above_upper_band_is_sell() {
        assert!(classify(100.0, Some(70.1), Some(95.0), Some(105.0), &t()).unwrap().sell);
        assert!(classify(106.0, Some(50.0), Some(95.0), Some(105.0), &t()).unwrap().sell);
    }

    #[test]
    fn boundaries_are_exclusive() {
        let at_high = classify(105.0, Some(50.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(!at_high.sell);
        let at_low = classify(95.0, Some(50.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(!at_low.buy);
        let at_70 = classify(100.0, Some(70.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(!at_70.sell);
        let at_30 = classify(100.0, Some(30.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(!at_30.buy);
    }

    #[test]
    fn row_can_be_buy_and_sell() {
        // Oversold RSI while price breaks above the upper band.
        let set = classify(110.0, Some(20.0), Some(95.0), Some(105.0), &t()).unwrap();
        assert!(set.contains(SignalKind::Buy));
        assert!(set.contains(SignalKind::Sell));
        assert_eq!(set.kinds(), vec![SignalKind::Buy, SignalKind::Sell]);
    }

    #[test]
    fn undefined_indicator_is_not_classified() {
        assert!(classify(100.0, None, Some(95.0), Some(105.0), &t()).is_none());
        assert!(classify(100.0, Some(10.0), None, Some(105.0), &t()).is_none());
        assert!(classify(100.0, Some(90.0), Some(95.0), None, &t()).is_none());
    }

    #[test]
    fn custom_thresholds_apply() {
        let tight = SignalThresholds {
            oversold: 45.0,
            overbought: 55.0,
        };
        let set = classify(100.0, Some(44.0), Some(95.0), Some(105.0), &tight).unwrap();
        assert!(set.buy);
    }

    #[test]
    fn classify_series_keeps_alignment() {
        let closes = [100.0, 100.0, 94.0];
        let rsi = [None, Some(50.0), Some(50.0)];
        let low = [Some(95.0), Some(95.0), Some(95.0)];
        let high = [Some(105.0), Some(105.0), Some(105.0)];
        let out = classify_series(&closes, &rsi, &low, &high, &t());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(SignalSet::default()));
        assert_eq!(out[2], Some(SignalSet { buy: true, sell: false }));
    }
}
