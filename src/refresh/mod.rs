// =============================================================================
// Refresh Module
// =============================================================================
//
// Periodic fetch → compute → publish.  `cycle` holds the state machine,
// `scheduler` drives it from a timer.

pub mod cycle;
pub mod scheduler;

pub use cycle::{CycleObserver, RefreshContext};
pub use scheduler::RefreshScheduler;
