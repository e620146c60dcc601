// =============================================================================
// Shared Types
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of price data for the configured symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    /// Close adjusted for splits and dividends.
    pub adjusted_close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, adjusted_close: f64) -> Self {
        Self {
            date,
            adjusted_close,
        }
    }
}

/// Extract the adjusted closes of `bars` (oldest-first).
pub fn adjusted_closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.adjusted_close).collect()
}

/// Phase of the refresh state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Computing,
    Ready,
    Failed,
}

impl Default for RefreshPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl RefreshPhase {
    /// Whether the state machine may move from `self` to `next`.
    pub fn can_transition_to(self, next: RefreshPhase) -> bool {
        use RefreshPhase::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Ready, Fetching)
                | (Failed, Fetching)
                | (Fetching, Computing)
                | (Fetching, Failed)
                | (Computing, Ready)
        )
    }
}

impl std::fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Fetching => write!(f, "FETCHING"),
            Self::Computing => write!(f, "COMPUTING"),
            Self::Ready => write!(f, "READY"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}
