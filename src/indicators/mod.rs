// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators feeding the signal
// classifier.  Series functions return one `Option<f64>` per input close so
// warm-up positions can never be mistaken for real readings.

pub mod bollinger;
pub mod rsi;
