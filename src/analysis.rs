// =============================================================================
// Analysis Engine: price series in, chart-ready indicators and signals out
// =============================================================================
//
// Pipeline (pure, synchronous, no hidden state):
//   1. Extract adjusted closes from the bars
//   2. RSI series (Wilder)
//   3. Bollinger series (SMA ± k·σ)
//   4. Per-row signal membership
//
// Recomputing the same bars with the same params always yields an identical
// snapshot apart from `computed_at`.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::indicators::bollinger::calculate_bollinger_series;
use crate::indicators::rsi::calculate_rsi;
use crate::runtime_config::IndicatorParams;
use crate::signals::{classify_series, SignalKind, SignalSet, SignalThresholds};
use crate::types::{adjusted_closes, PriceBar};

// =============================================================================
// Output types
// =============================================================================

/// Derived series aligned 1:1 with the price bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub rsi: Vec<Option<f64>>,
    pub band_high: Vec<Option<f64>>,
    pub band_mid: Vec<Option<f64>>,
    pub band_low: Vec<Option<f64>>,
}

/// A point to draw a BUY or SELL marker at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalMarker {
    pub date: NaiveDate,
    pub price: f64,
}

/// Everything one refresh cycle computes for the symbol.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSnapshot {
    pub symbol: String,
    pub params: IndicatorParams,
    pub bars: Vec<PriceBar>,
    pub indicators: IndicatorSeries,
    /// `None` for warm-up rows that lack a defined indicator.
    pub signals: Vec<Option<SignalSet>>,
    pub computed_at: DateTime<Utc>,
}

impl AnalysisSnapshot {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Dates and prices of every row in the `kind` membership set.
    pub fn markers(&self, kind: SignalKind) -> Vec<SignalMarker> {
        self.bars
            .iter()
            .zip(&self.signals)
            .filter(|(_, set)| set.map(|s| s.contains(kind)).unwrap_or(false))
            .map(|(bar, _)| SignalMarker {
                date: bar.date,
                price: bar.adjusted_close,
            })
            .collect()
    }

    pub fn buy_markers(&self) -> Vec<SignalMarker> {
        self.markers(SignalKind::Buy)
    }

    pub fn sell_markers(&self) -> Vec<SignalMarker> {
        self.markers(SignalKind::Sell)
    }

    /// Signal set of the most recent bar, if it was classified.
    pub fn latest_signal(&self) -> Option<(NaiveDate, SignalSet)> {
        let bar = self.bars.last()?;
        let set = (*self.signals.last()?)?;
        Some((bar.date, set))
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct AnalysisEngine;

impl AnalysisEngine {
    /// Compute indicators and signals for `bars`.
    ///
    /// An empty or too-short series is not an error: every output series
    /// simply has the input's length with undefined positions as `None`.
    pub fn compute(symbol: &str, bars: Vec<PriceBar>, params: &IndicatorParams) -> AnalysisSnapshot {
        // ── 1. Closes ────────────────────────────────────────────────────
        let closes = adjusted_closes(&bars);

        // ── 2. Momentum ──────────────────────────────────────────────────
        let rsi = calculate_rsi(&closes, params.rsi_window);

        // ── 3. Volatility bands ──────────────────────────────────────────
        let bands = calculate_bollinger_series(&closes, params.bb_window, params.bb_k);

        // ── 4. Signals ───────────────────────────────────────────────────
        let thresholds = SignalThresholds {
            oversold: params.oversold,
            overbought: params.overbought,
        };
        let signals = classify_series(&closes, &rsi, &bands.lower, &bands.upper, &thresholds);

        debug!(
            symbol,
            rows = bars.len(),
            buys = signals.iter().flatten().filter(|s| s.buy).count(),
            sells = signals.iter().flatten().filter(|s| s.sell).count(),
            neutral = signals.iter().flatten().filter(|s| s.is_empty()).count(),
            "analysis computed"
        );

        AnalysisSnapshot {
            symbol: symbol.to_string(),
            params: *params,
            bars,
            indicators: IndicatorSeries {
                rsi,
                band_high: bands.upper,
                band_mid: bands.middle,
                band_low: bands.lower,
            },
            signals,
            computed_at: Utc::now(),
        }
    }
}
