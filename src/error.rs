// =============================================================================
// Error Types
// =============================================================================
//
// ConfigError is fatal and surfaces at startup before any refresh cycle runs.
// FetchError is recoverable: the cycle is marked failed, the error is logged,
// and the last good analysis stays published until the next tick.
// =============================================================================

use thiserror::Error;

/// Invalid or unreadable runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("start_date {start} must be before end_date {end}")]
    DateRange { start: String, end: String },

    #[error("{name} must be >= {min}, got {value}")]
    WindowTooSmall {
        name: &'static str,
        min: usize,
        value: usize,
    },

    #[error("bb_k must be a positive finite number, got {0}")]
    InvalidMultiplier(f64),

    #[error("refresh_interval_seconds must be >= 1")]
    InvalidInterval,

    #[error("thresholds must satisfy 0 <= oversold < overbought <= 100, got {oversold} / {overbought}")]
    InvalidThresholds { oversold: f64, overbought: f64 },
}

/// Failure to obtain a price series from the data provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to data provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("data provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("data provider error [{code}]: {description}")]
    Provider { code: String, description: String },

    #[error("no price data returned for {symbol}")]
    Empty { symbol: String },

    #[error("invalid data provider base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
