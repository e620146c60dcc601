// =============================================================================
// Central Application State: Signal Dashboard
// =============================================================================
//
// The single source of truth for everything the dashboard shows.  The refresh
// loop publishes into it through `CycleObserver`; the REST API and WebSocket
// feed read unified snapshots out of it.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for the published dashboard state and error log.
//   - Analysis results are shared as `Arc<AnalysisSnapshot>`, so publishing
//     a new one is a pointer swap and readers never see a half-written value.
// =============================================================================

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::analysis::{AnalysisSnapshot, SignalMarker};
use crate::error::FetchError;
use crate::indicators::bollinger::band_width_pct;
use crate::indicators::rsi::RsiZone;
use crate::refresh::CycleObserver;
use crate::runtime_config::{IndicatorParams, RuntimeConfig};
use crate::signals::{SignalKind, SignalSet};
use crate::types::RefreshPhase;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Phase the refresh cycle was in when the error happened.
    pub phase: RefreshPhase,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// Dashboard State
// =============================================================================

/// What the refresh loop has published so far.
#[derive(Debug, Default)]
pub struct DashboardState {
    pub phase: RefreshPhase,
    /// Last successful analysis. Survives failed cycles.
    pub analysis: Option<Arc<AnalysisSnapshot>>,
    pub last_error: Option<String>,
    pub completed_cycles: u64,
    pub failed_cycles: u64,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_refresh_at: Option<DateTime<Utc>>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// published change. The WebSocket feed uses this to detect changes and
    /// push updates.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    /// Number of currently connected WebSocket clients.
    pub ws_clients: AtomicUsize,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: RuntimeConfig,

    // ── Published refresh output ────────────────────────────────────────
    pub dashboard: RwLock<DashboardState>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            ws_clients: AtomicUsize::new(0),
            runtime_config: config,
            dashboard: RwLock::new(DashboardState::default()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call this after every
    /// published mutation so WebSocket clients pick up fresh data.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. Oldest entries are evicted beyond
    /// [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, message: String, phase: RefreshPhase) {
        let record = ErrorRecord {
            message,
            phase,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Readers ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> RefreshPhase {
        self.dashboard.read().phase
    }

    /// The most recently published analysis, if any cycle has succeeded.
    pub fn latest_analysis(&self) -> Option<Arc<AnalysisSnapshot>> {
        self.dashboard.read().analysis.clone()
    }

    // ── Snapshot Builders ───────────────────────────────────────────────

    /// Build the chart payload for the latest analysis, or `None` before the
    /// first successful refresh.
    pub fn build_chart(&self) -> Option<ChartPayload> {
        self.latest_analysis()
            .map(|analysis| ChartPayload::from_analysis(&analysis))
    }

    /// Build a complete, serialisable snapshot of the dashboard state.
    ///
    /// This is the payload of `GET /api/v1/state` and of every WebSocket push.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let now = Utc::now();
        let config = &self.runtime_config;
        let version = self.current_state_version();

        // ── Refresh status ──────────────────────────────────────────
        let (refresh, analysis) = {
            let dash = self.dashboard.read();
            let refresh = RefreshStatus {
                phase: dash.phase,
                last_attempt_at: dash.last_attempt_at.map(|t| t.to_rfc3339()),
                last_refresh_at: dash.last_refresh_at.map(|t| t.to_rfc3339()),
                last_error: dash.last_error.clone(),
                completed_cycles: dash.completed_cycles,
                failed_cycles: dash.failed_cycles,
                interval_seconds: config.refresh_interval_seconds,
            };
            (refresh, dash.analysis.clone())
        };

        // ── Latest row ──────────────────────────────────────────────
        let latest = analysis.as_deref().and_then(LatestReading::from_analysis);

        // ── Errors ──────────────────────────────────────────────────
        let recent_errors = self.recent_errors.read().clone();

        StateSnapshot {
            state_version: version,
            server_time: now.timestamp_millis(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            ws_sequence_number: self.ws_sequence_number.load(Ordering::Relaxed),
            ws_clients: self.ws_clients.load(Ordering::Relaxed),
            symbol: config.symbol.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            params: config.indicator_params(),
            refresh,
            latest,
            chart: analysis.as_deref().map(ChartPayload::from_analysis),
            recent_errors,
        }
    }
}

// ── Refresh loop → dashboard ────────────────────────────────────────────

impl CycleObserver for AppState {
    fn on_phase(&self, phase: RefreshPhase) {
        {
            let mut dash = self.dashboard.write();
            dash.phase = phase;
            if phase == RefreshPhase::Fetching {
                dash.last_attempt_at = Some(Utc::now());
            }
        }
        self.increment_version();
    }

    fn on_analysis(&self, analysis: Arc<AnalysisSnapshot>) {
        {
            let mut dash = self.dashboard.write();
            dash.last_refresh_at = Some(analysis.computed_at);
            dash.analysis = Some(analysis);
            dash.last_error = None;
            dash.completed_cycles += 1;
        }
        self.increment_version();
    }

    fn on_fetch_error(&self, error: &FetchError) {
        let message = error.to_string();
        let phase = {
            let mut dash = self.dashboard.write();
            dash.last_error = Some(message.clone());
            dash.failed_cycles += 1;
            dash.phase
        };
        self.push_error(message, phase);
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Full dashboard state snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_seconds: u64,
    pub ws_sequence_number: u64,
    pub ws_clients: usize,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub params: IndicatorParams,
    pub refresh: RefreshStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<LatestReading>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartPayload>,

    pub recent_errors: Vec<ErrorRecord>,
}

/// Refresh loop status banner.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub phase: RefreshPhase,
    pub last_attempt_at: Option<String>,
    pub last_refresh_at: Option<String>,
    pub last_error: Option<String>,
    pub completed_cycles: u64,
    pub failed_cycles: u64,
    pub interval_seconds: u64,
}

/// Indicator readings of the most recent bar.
#[derive(Debug, Clone, Serialize)]
pub struct LatestReading {
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub band_high: Option<f64>,
    pub band_mid: Option<f64>,
    pub band_low: Option<f64>,
    /// Band spread as a percentage of the middle band.
    pub band_width_pct: Option<f64>,
    /// Memberships of the last bar; empty when unclassified or neutral.
    pub signals: Vec<SignalKind>,
}

impl LatestReading {
    fn from_analysis(analysis: &AnalysisSnapshot) -> Option<Self> {
        if analysis.is_empty() {
            return None;
        }
        let last = analysis.len() - 1;
        let bar = analysis.bars[last];
        let ind = &analysis.indicators;
        let params = &analysis.params;

        let rsi = ind.rsi[last];
        let rsi_zone = rsi.map(|v| RsiZone::of(v, params.oversold, params.overbought));
        let (band_high, band_mid, band_low) =
            (ind.band_high[last], ind.band_mid[last], ind.band_low[last]);
        let band_width_pct = match (band_high, band_mid, band_low) {
            (Some(hi), Some(mid), Some(lo)) => band_width_pct(hi, mid, lo),
            _ => None,
        };
        let signals = analysis
            .latest_signal()
            .map(|(_, set)| set.kinds())
            .unwrap_or_default();

        Some(Self {
            date: bar.date,
            close: bar.adjusted_close,
            rsi,
            rsi_zone,
            band_high,
            band_mid,
            band_low,
            band_width_pct,
            signals,
        })
    }
}

/// Column-oriented chart data: one price pane with bands and markers, one
/// RSI pane.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub symbol: String,
    pub computed_at: String,
    pub params: IndicatorParams,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub rsi: Vec<Option<f64>>,
    pub band_high: Vec<Option<f64>>,
    pub band_mid: Vec<Option<f64>>,
    pub band_low: Vec<Option<f64>>,
    pub signals: Vec<Option<SignalSet>>,
    pub buy_markers: Vec<SignalMarker>,
    pub sell_markers: Vec<SignalMarker>,
}

impl ChartPayload {
    pub fn from_analysis(analysis: &AnalysisSnapshot) -> Self {
        Self {
            symbol: analysis.symbol.clone(),
            computed_at: analysis.computed_at.to_rfc3339(),
            params: analysis.params,
            dates: analysis.bars.iter().map(|b| b.date).collect(),
            close: analysis.bars.iter().map(|b| b.adjusted_close).collect(),
            rsi: analysis.indicators.rsi.clone(),
            band_high: analysis.indicators.band_high.clone(),
            band_mid: analysis.indicators.band_mid.clone(),
            band_low: analysis.indicators.band_low.clone(),
            signals: analysis.signals.clone(),
            buy_markers: analysis.buy_markers(),
            sell_markers: analysis.sell_markers(),
        }
    }
}
