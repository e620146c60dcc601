// =============================================================================
// Refresh Cycle: explicit fetch → compute → publish state machine
// =============================================================================
//
//   IDLE ──► FETCHING ──► COMPUTING ──► READY ──(tick)──► FETCHING …
//                 │
//                 └──► FAILED ──(tick)──► FETCHING …
//
// Entry actions:
//   FETCHING: invoke the price source for the context's symbol and range.
//   COMPUTING: run the analysis engine; cannot fail.
//   READY: publish the new snapshot, replacing the previous one.
//   FAILED: record and log the error; the last good snapshot is kept.
//
// An empty price series is a fetch failure and never enters COMPUTING.
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::analysis::{AnalysisEngine, AnalysisSnapshot};
use crate::error::FetchError;
use crate::market_data::PriceSource;
use crate::runtime_config::{IndicatorParams, RuntimeConfig};
use crate::types::RefreshPhase;

/// Immutable inputs of every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshContext {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub params: IndicatorParams,
}

impl RefreshContext {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            params: config.indicator_params(),
        }
    }
}

/// Receives every state change of a [`RefreshCycle`].
pub trait CycleObserver: Send + Sync {
    /// Called after each accepted phase transition.
    fn on_phase(&self, phase: RefreshPhase);

    /// Called with the fresh snapshot right before the cycle enters READY.
    fn on_analysis(&self, analysis: Arc<AnalysisSnapshot>);

    /// Called when a fetch fails, right before the cycle enters FAILED.
    fn on_fetch_error(&self, error: &FetchError);
}

/// State carried from one cycle to the next.
#[derive(Debug, Default)]
pub struct RefreshCycle {
    phase: RefreshPhase,
    last_good: Option<Arc<AnalysisSnapshot>>,
    last_error: Option<String>,
    completed_cycles: u64,
    failed_cycles: u64,
}

impl RefreshCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RefreshPhase {
        self.phase
    }

    /// Most recent successful analysis, kept across failed cycles.
    pub fn last_good(&self) -> Option<&Arc<AnalysisSnapshot>> {
        self.last_good.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub fn failed_cycles(&self) -> u64 {
        self.failed_cycles
    }

    fn transition(&mut self, next: RefreshPhase, observer: &dyn CycleObserver) -> bool {
        if !self.phase.can_transition_to(next) {
            error!(from = %self.phase, to = %next, "rejected refresh phase transition");
            return false;
        }
        debug!(from = %self.phase, to = %next, "refresh phase transition");
        self.phase = next;
        observer.on_phase(next);
        true
    }

    /// Run one full cycle and return the phase it settled in
    /// (READY or FAILED).
    pub async fn run_once<S>(
        &mut self,
        ctx: &RefreshContext,
        source: &S,
        observer: &dyn CycleObserver,
    ) -> RefreshPhase
    where
        S: PriceSource + ?Sized,
    {
        if !self.transition(RefreshPhase::Fetching, observer) {
            return self.phase;
        }

        let fetched = source
            .fetch_daily(&ctx.symbol, ctx.start_date, ctx.end_date)
            .await
            .and_then(|bars| {
                if bars.is_empty() {
                    Err(FetchError::Empty {
                        symbol: ctx.symbol.clone(),
                    })
                } else {
                    Ok(bars)
                }
            });

        let bars = match fetched {
            Ok(bars) => bars,
            Err(e) => {
                self.failed_cycles += 1;
                self.last_error = Some(e.to_string());
                warn!(
                    symbol = %ctx.symbol,
                    error = %e,
                    retained = self.last_good.is_some(),
                    "refresh failed; keeping last good analysis"
                );
                observer.on_fetch_error(&e);
                self.transition(RefreshPhase::Failed, observer);
                return self.phase;
            }
        };

        self.transition(RefreshPhase::Computing, observer);
        let analysis = Arc::new(AnalysisEngine::compute(&ctx.symbol, bars, &ctx.params));

        self.completed_cycles += 1;
        self.last_error = None;
        self.last_good = Some(analysis.clone());

        info!(
            symbol = %ctx.symbol,
            rows = analysis.len(),
            buys = analysis.buy_markers().len(),
            sells = analysis.sell_markers().len(),
            cycle = self.completed_cycles,
            "refresh complete"
        );

        observer.on_analysis(analysis);
        self.transition(RefreshPhase::Ready, observer);
        self.phase
    }
}
