// =============================================================================
// Yahoo Finance Chart API Client: daily adjusted closes
// =============================================================================
//
// GET {base}/v8/finance/chart/{symbol}
//       ?period1=<start 00:00 UTC>&period2=<end 00:00 UTC>
//       &interval=1d&includeAdjustedClose=true
//
// The symbol is one percent-encoded path segment, appended after any path
// prefix the base URL carries.  `period2` is exclusive.  The adjusted close is read from
// `indicators.adjclose[0].adjclose`; rows without one fall back to the raw
// close, and rows with neither are skipped.  Provider error objects are
// reported even when the HTTP status is an error.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::FetchError;
use crate::market_data::{normalize_bars, PriceSource};
use crate::types::PriceBar;

/// Public chart API host.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// The chart endpoint rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Longest error body excerpt kept in a `FetchError::Status`.
const MAX_ERROR_BODY: usize = 200;

// -----------------------------------------------------------------------------
// Wire format
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    /// Absent when the range holds no trading days.
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC, in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

// -----------------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------------

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooFinanceClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooFinanceClient {
    /// Client against the public Yahoo host.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against an arbitrary host (mock servers, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| FetchError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidBaseUrl {
                url: raw,
                reason: "URL cannot carry a path".to_string(),
            });
        }
        debug!(base_url = %base_url, "YahooFinanceClient initialised");

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

/// Unix seconds of `date` at 00:00 UTC.
fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Decode a chart response body into (unsorted) bars.
fn parse_chart_response(body: &str) -> Result<Vec<PriceBar>, FetchError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if let Some(err) = envelope.chart.error {
        return Err(FetchError::Provider {
            code: err.code,
            description: err.description,
        });
    }

    let Some(data) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let offset = data.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let closes = data.indicators.quote.first().map(|q| q.close.as_slice()).unwrap_or(&[]);
    let adjusted = data
        .indicators
        .adjclose
        .first()
        .map(|a| a.adjclose.as_slice())
        .unwrap_or(&[]);

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let price = adjusted
            .get(i)
            .copied()
            .flatten()
            .or_else(|| closes.get(i).copied().flatten());

        let Some(price) = price else {
            continue;
        };

        // Exchange-local calendar day of the session.
        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()) else {
            warn!(timestamp = ts, "skipping bar with out-of-range timestamp");
            continue;
        };

        bars.push(PriceBar::new(date, price));
    }

    Ok(bars)
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    #[instrument(skip(self), name = "yahoo::fetch_daily")]
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let period1 = day_start_timestamp(start).to_string();
        let period2 = day_start_timestamp(end).to_string();

        let resp = self
            .client
            .get(self.chart_url(symbol)?)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("includeAdjustedClose", "true"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        let parsed = parse_chart_response(&body);
        if !status.is_success() {
            // A provider error object explains the failure better than the status.
            if let Err(provider @ FetchError::Provider { .. }) = parsed {
                return Err(provider);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let bars = normalize_bars(parsed?);
        if bars.is_empty() {
            return Err(FetchError::Empty {
                symbol: symbol.to_string(),
            });
        }

        info!(
            symbol,
            rows = bars.len(),
            first = %bars[0].date,
            last = %bars[bars.len() - 1].date,
            "price data fetched"
        );

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn chart_body() -> serde_json::Value {
        // 2024-01-02/03/04 14:30 UTC, New York session opens.
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {
                        "quote": [{ "close": [185.64, 184.25, null] }],
                        "adjclose": [{ "adjclose": [184.73, null, 181.18] }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn parses_adjclose_with_close_fallback() {
        let bars = parse_chart_response(&chart_body().to_string()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0], PriceBar::new(d("2024-01-02"), 184.73));
        // adjclose missing => raw close
        assert_eq!(bars[1], PriceBar::new(d("2024-01-03"), 184.25));
        assert_eq!(bars[2], PriceBar::new(d("2024-01-04"), 181.18));
    }

    #[test]
    fn parse_skips_rows_without_any_price() {
        let body = serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": [1704205800, 1704292200],
                    "indicators": { "quote": [{ "close": [null, 10.0] }], "adjclose": [] }
                }],
                "error": null
            }
        });
        let bars = parse_chart_response(&body.to_string()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].adjusted_close, 10.0);
    }

    #[test]
    fn parse_range_without_trading_days_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}],"adjclose":[{}]}}],"error":null}"#;
        assert!(parse_chart_response(body).unwrap().is_empty());
    }

    #[test]
    fn parse_provider_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_response(body).unwrap_err();
        assert!(matches!(err, FetchError::Provider { ref code, .. } if code == "Not Found"));
    }

    #[test]
    fn parse_garbage_is_decode_error() {
        assert!(matches!(
            parse_chart_response("<html>"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn symbol_is_encoded_as_one_segment() {
        let client = YahooFinanceClient::with_base_url("http://localhost:9000").unwrap();

        let url = client.chart_url("BRK/B").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB");
        assert_eq!(url.query(), None);

        let url = client.chart_url("A?x#y").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/A%3Fx%23y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        assert_eq!(client.chart_url("AAPL").unwrap().path(), "/v8/finance/chart/AAPL");
    }

    #[test]
    fn base_path_prefix_is_kept() {
        for base in ["http://localhost/yahoo", "http://localhost/yahoo/"] {
            let client = YahooFinanceClient::with_base_url(base).unwrap();
            assert_eq!(
                client.chart_url("MSFT").unwrap().path(),
                "/yahoo/v8/finance/chart/MSFT",
                "base {base}"
            );
        }
    }

    #[test]
    fn unusable_base_url_is_rejected() {
        for base in ["not a url", "mailto:ops@example.com"] {
            match YahooFinanceClient::with_base_url(base) {
                Err(FetchError::InvalidBaseUrl { url, .. }) => assert_eq!(url, base),
                Err(other) => panic!("unexpected error for {base}: {other}"),
                Ok(_) => panic!("{base} accepted"),
            }
        }
    }

    #[test]
    fn day_start_is_midnight_utc() {
        assert_eq!(day_start_timestamp(d("2020-01-01")), 1_577_836_800);
    }

    #[tokio::test]
    async fn fetch_daily_returns_ordered_bars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("interval", "1d"))
            .and(query_param("period1", "1704067200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let client = YahooFinanceClient::with_base_url(server.uri()).unwrap();
        let bars = client
            .fetch_daily("AAPL", d("2024-01-01"), d("2024-01-05"))
            .await
            .unwrap();

        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn fetch_daily_surfaces_provider_error_on_404() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "delisted" } }
        });
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(body))
            .mount(&server)
            .await;

        let client = YahooFinanceClient::with_base_url(server.uri()).unwrap();
        let err = client
            .fetch_daily("NOPE", d("2024-01-01"), d("2024-01-05"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Provider { .. }));
    }

    #[tokio::test]
    async fn fetch_daily_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = YahooFinanceClient::with_base_url(server.uri()).unwrap();
        let err = client
            .fetch_daily("AAPL", d("2024-01-01"), d("2024-01-05"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn fetch_daily_empty_range_is_error() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "chart": { "result": [{ "indicators": { "quote": [{}] } }], "error": null }
        });
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = YahooFinanceClient::with_base_url(server.uri()).unwrap();
        let err = client
            .fetch_daily("AAPL", d("2024-01-06"), d("2024-01-07"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Empty { .. }));
    }
}
