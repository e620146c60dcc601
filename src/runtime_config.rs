// =============================================================================
// Runtime Configuration: JSON file + environment overrides
// =============================================================================
//
// The symbol and date range are mandatory.  Indicator parameters, signal
// thresholds, and the refresh interval carry `#[serde(default)]` values so a
// minimal file only needs the three required keys:
//
//   { "symbol": "AAPL", "start_date": "2020-01-01", "end_date": "2020-12-31" }
//
// `validate()` must pass before the first refresh cycle is scheduled.
// =============================================================================

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_rsi_window() -> usize {
    14
}

fn default_bb_window() -> usize {
    20
}

fn default_bb_k() -> f64 {
    2.0
}

fn default_refresh_interval_seconds() -> u64 {
    60
}

fn default_oversold() -> f64 {
    30.0
}

fn default_overbought() -> f64 {
    70.0
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Parameters consumed by the indicator and signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_window: usize,
    pub bb_window: usize,
    pub bb_k: f64,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_window: default_rsi_window(),
            bb_window: default_bb_window(),
            bb_k: default_bb_k(),
            oversold: default_oversold(),
            overbought: default_overbought(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Ticker symbol to analyse, e.g. "AAPL".
    pub symbol: String,

    /// First day of the fetched window (inclusive).
    pub start_date: NaiveDate,

    /// Last day of the fetched window (exclusive, as the provider treats it).
    pub end_date: NaiveDate,

    // --- Indicator parameters ------------------------------------------------

    /// RSI lookback window. Must be >= 1.
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    /// Bollinger lookback window. Must be >= 2.
    #[serde(default = "default_bb_window")]
    pub bb_window: usize,

    /// Bollinger standard-deviation multiplier. Must be > 0.
    #[serde(default = "default_bb_k")]
    pub bb_k: f64,

    // --- Signal thresholds ---------------------------------------------------

    /// RSI strictly below this marks a BUY.
    #[serde(default = "default_oversold")]
    pub oversold: f64,

    /// RSI strictly above this marks a SELL.
    #[serde(default = "default_overbought")]
    pub overbought: f64,

    // --- Scheduling ----------------------------------------------------------

    /// Seconds between refresh ticks. Must be >= 1.
    #[serde(default = "default_refresh_interval_seconds")]
    pub refresh_interval_seconds: u64,
}

impl RuntimeConfig {
    /// Build a config for `symbol` over `[start_date, end_date)` with every
    /// optional parameter at its default.
    #[cfg(test)]
    pub fn new(symbol: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let params = IndicatorParams::default();
        Self {
            symbol: symbol.into(),
            start_date,
            end_date,
            rsi_window: params.rsi_window,
            bb_window: params.bb_window,
            bb_k: params.bb_k,
            oversold: params.oversold,
            overbought: params.overbought,
            refresh_interval_seconds: default_refresh_interval_seconds(),
        }
    }

    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            start = %config.start_date,
            end = %config.end_date,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Check every range constraint, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::DateRange {
                start: self.start_date.to_string(),
                end: self.end_date.to_string(),
            });
        }
        if self.rsi_window < 1 {
            return Err(ConfigError::WindowTooSmall {
                name: "rsi_window",
                min: 1,
                value: self.rsi_window,
            });
        }
        if self.bb_window < 2 {
            return Err(ConfigError::WindowTooSmall {
                name: "bb_window",
                min: 2,
                value: self.bb_window,
            });
        }
        if !(self.bb_k.is_finite() && self.bb_k > 0.0) {
            return Err(ConfigError::InvalidMultiplier(self.bb_k));
        }
        if self.refresh_interval_seconds < 1 {
            return Err(ConfigError::InvalidInterval);
        }
        let thresholds_ok = self.oversold >= 0.0
            && self.overbought <= 100.0
            && self.oversold < self.overbought;
        if !thresholds_ok {
            return Err(ConfigError::InvalidThresholds {
                oversold: self.oversold,
                overbought: self.overbought,
            });
        }
        Ok(())
    }

    /// Indicator-engine view of this config.
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            rsi_window: self.rsi_window,
            bb_window: self.bb_window,
            bb_k: self.bb_k,
            oversold: self.oversold,
            overbought: self.overbought,
        }
    }
}
