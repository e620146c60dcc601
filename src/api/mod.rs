// =============================================================================
// Dashboard API: REST + WebSocket feed
// =============================================================================

pub mod rest;
pub mod ws;

pub use rest::router;
