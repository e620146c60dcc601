// =============================================================================
// Market Data: daily price series for one symbol
// =============================================================================

pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::FetchError;
use crate::types::PriceBar;

pub use yahoo::YahooFinanceClient;

/// A provider of historical daily bars.
///
/// Implementations must return bars in strictly increasing date order with no
/// duplicate dates; [`normalize_bars`] does this for raw provider rows.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch daily bars for `symbol` over `[start, end)`.
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError>;
}

/// Sort by date, keep the last row for a repeated date, and drop rows whose
/// adjusted close is not a finite number.
pub fn normalize_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.retain(|b| b.adjusted_close.is_finite());
    // Stable sort keeps provider order among equal dates.
    bars.sort_by_key(|b| b.date);

    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}
