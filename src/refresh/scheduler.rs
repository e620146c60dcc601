// =============================================================================
// Refresh Scheduler: one task, one cycle at a time
// =============================================================================
//
// The first tick fires immediately, then every `interval`.  Ticks that elapse
// while a cycle is still running collapse into one late tick, after which the
// schedule realigns to the interval grid (`MissedTickBehavior::Skip`).  Cycles
// never overlap and never pile up.  Shutdown is only observed between cycles:
// an in-flight fetch is allowed to finish.
// =============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::market_data::PriceSource;
use crate::refresh::cycle::{CycleObserver, RefreshContext, RefreshCycle};

pub struct RefreshScheduler {
    ctx: RefreshContext,
    source: Arc<dyn PriceSource>,
    observer: Arc<dyn CycleObserver>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        ctx: RefreshContext,
        source: Arc<dyn PriceSource>,
        observer: Arc<dyn CycleObserver>,
        interval: Duration,
    ) -> Self {
        Self {
            ctx,
            source,
            observer,
            interval,
        }
    }

    /// Run cycles until `shutdown` resolves. Returns the final cycle state.
    pub async fn run_until<F>(self, shutdown: F) -> RefreshCycle
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut cycle = RefreshCycle::new();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            symbol = %self.ctx.symbol,
            interval_secs = self.interval.as_secs(),
            "refresh scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let phase = cycle
                .run_once(&self.ctx, self.source.as_ref(), self.observer.as_ref())
                .await;
            debug!(phase = %phase, "refresh cycle settled");
        }

        info!(
            completed = cycle.completed_cycles(),
            failed = cycle.failed_cycles(),
            "refresh scheduler stopped"
        );
        cycle
    }
}
