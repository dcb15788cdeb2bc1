//! Historical price bars from the Alpaca market data API.
//!
//! Bars come back in pages (`next_page_token`); the client walks every
//! page for the requested day, then normalizes the result into the
//! ordered, deduplicated series the simulator consumes. Gaps in the
//! series are tolerated.

use crate::error::DataError;
use crate::models::Candle;
use crate::retry::RetryPolicy;
use crate::series;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Deserialize;

const BAR_TIMEFRAME: &str = "2Min";
const PAGE_LIMIT: &str = "10000";
const MAX_PAGES: usize = 20;

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Ordered candles for `ticker` on `day`. An empty vector is a valid
    /// answer (halted or unlisted ticker); it simulates to NO_DATA.
    async fn day_candles(&self, ticker: &str, day: NaiveDate) -> Result<Vec<Candle>, DataError>;
}

pub struct AlpacaDataClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
    retry: RetryPolicy,
}

impl AlpacaDataClient {
    pub fn new(
        http: Client,
        base_url: &str,
        key_id: &str,
        secret_key: &str,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(key_id).context("invalid Alpaca API key")?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            HeaderValue::from_str(secret_key).context("invalid Alpaca API secret")?,
        );
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            retry,
        })
    }

    /// Most recent trade price for a symbol; used for live position sizing.
    pub async fn latest_trade_price(&self, ticker: &str) -> Result<f64, DataError> {
        let context = format!("latest trade for {}", ticker);
        let payload: LatestTradeResponse = self
            .retry
            .run(&context, || async {
                let url = format!("{}/v2/stocks/{}/trades/latest", self.base_url, ticker);
                let response = self
                    .http
                    .get(&url)
                    .headers(self.headers.clone())
                    .send()
                    .await
                    .with_context(|| format!("GET {} failed", url))?
                    .error_for_status()
                    .with_context(|| format!("GET {} returned error", url))?;
                response
                    .json::<LatestTradeResponse>()
                    .await
                    .context("failed to parse latest trade response")
            })
            .await?;

        let price = payload.trade.map(|trade| trade.p).unwrap_or(0.0);
        if price <= 0.0 {
            return Err(DataError::malformed_series(
                ticker,
                "latest trade carried no usable price",
            ));
        }
        Ok(price)
    }

    async fn fetch_bar_page(
        &self,
        ticker: &str,
        start: &str,
        end: &str,
        page_token: Option<&str>,
    ) -> anyhow::Result<BarsResponse> {
        let url = format!("{}/v2/stocks/{}/bars", self.base_url, ticker);
        let mut query = vec![
            ("timeframe", BAR_TIMEFRAME),
            ("start", start),
            ("end", end),
            ("limit", PAGE_LIMIT),
            ("adjustment", "raw"),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token));
        }

        let response = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .query(&query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error", url))?;
        response
            .json::<BarsResponse>()
            .await
            .context("failed to parse Alpaca bars response")
    }
}

#[async_trait]
impl CandleSource for AlpacaDataClient {
    async fn day_candles(&self, ticker: &str, day: NaiveDate) -> Result<Vec<Candle>, DataError> {
        let (start, end) = day_bounds(day);
        let start_param = start.to_rfc3339();
        let end_param = end.to_rfc3339();

        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let context = format!("Alpaca bars for {} on {}", ticker, day);
            let token = page_token.clone();
            let page = self
                .retry
                .run(&context, || {
                    self.fetch_bar_page(ticker, &start_param, &end_param, token.as_deref())
                })
                .await?;

            bars.extend(page.bars.unwrap_or_default().into_iter().map(Candle::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let normalized = series::normalize_bars(bars);
        Ok(series::restrict_to_day(&normalized, day))
    }
}

/// UTC window covering the whole calendar day.
fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    let end = start + chrono::Duration::days(1) - chrono::Duration::seconds(1);
    (start, end)
}

#[derive(Debug, Deserialize)]
struct LatestTradeResponse {
    #[serde(default)]
    trade: Option<LatestTrade>,
}

#[derive(Debug, Deserialize)]
struct LatestTrade {
    p: f64,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: i64,
}

impl From<AlpacaBar> for Candle {
    fn from(bar: AlpacaBar) -> Self {
        Candle {
            start: bar.t,
            open: bar.o,
            high: bar.h,
            low: bar.l,
            close: bar.c,
            volume: bar.v,
        }
    }
}
