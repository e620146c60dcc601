// =============================================================================
// Signals Module
// =============================================================================
//
// Per-timestamp BUY / SELL membership derived from RSI and Bollinger Bands.

pub mod classifier;

pub use classifier::{classify_series, SignalKind, SignalSet, SignalThresholds};
