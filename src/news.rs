//! Company news retrieval (Finnhub `company-news` endpoint).
//!
//! One request per ticker-day, paced with a fixed inter-request delay so a
//! full universe scan stays inside the free-tier rate limit. Transient
//! failures retry per `RetryPolicy`; exhaustion surfaces as
//! `DataError::UpstreamUnavailable` and the caller degrades that ticker to
//! a no-news skip.

use crate::error::DataError;
use crate::retry::RetryPolicy;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

const REQUEST_DELAY: Duration = Duration::from_millis(1000);

/// One news article, already reduced to the fields sentiment scoring needs.
#[derive(Debug, Clone)]
pub struct NewsArticle {
    pub published: DateTime<Utc>,
    pub headline: String,
    pub summary: String,
    pub source: String,
}

impl NewsArticle {
    /// Text fed to the sentiment scorer: headline and summary together.
    pub fn scoring_text(&self) -> String {
        let mut text = self.headline.clone();
        if !self.summary.is_empty() {
            text.push_str(". ");
            text.push_str(&self.summary);
        }
        text
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Articles for `ticker` published on `day`, most recent first. An
    /// empty vector means "no news", which screening treats as no signal.
    async fn daily_articles(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Vec<NewsArticle>, DataError>;
}

pub struct FinnhubClient {
    http: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl FinnhubClient {
    pub fn new(http: Client, base_url: &str, token: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry,
        }
    }

    async fn fetch_company_news(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<FinnhubArticle>> {
        let url = format!("{}/api/v1/company-news", self.base_url);
        let day_param = day.format("%Y-%m-%d").to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("symbol", ticker),
                ("from", day_param.as_str()),
                ("to", day_param.as_str()),
                ("token", self.token.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("GET {} for {} failed", url, ticker))?
            .error_for_status()
            .with_context(|| format!("GET {} for {} returned error", url, ticker))?;
        response
            .json::<Vec<FinnhubArticle>>()
            .await
            .context("failed to parse Finnhub company-news response")
    }
}

#[async_trait]
impl NewsSource for FinnhubClient {
    async fn daily_articles(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Vec<NewsArticle>, DataError> {
        sleep(REQUEST_DELAY).await;
        let context = format!("Finnhub news for {}", ticker);
        let raw = self
            .retry
            .run(&context, || self.fetch_company_news(ticker, day))
            .await?;
        Ok(shape_articles(raw, day))
    }
}

/// Converts raw entries to articles on the requested day, most recent
/// first. Entries without a headline or with an unparseable timestamp are
/// dropped.
fn shape_articles(raw: Vec<FinnhubArticle>, day: NaiveDate) -> Vec<NewsArticle> {
    let mut articles: Vec<NewsArticle> = raw
        .into_iter()
        .filter_map(|entry| {
            let published = Utc.timestamp_opt(entry.datetime?, 0).single()?;
            let headline = entry.headline?.trim().to_string();
            if headline.is_empty() {
                return None;
            }
            Some(NewsArticle {
                published,
                headline,
                summary: entry.summary.unwrap_or_default().trim().to_string(),
                source: entry.source.unwrap_or_default(),
            })
        })
        .filter(|article| article.published.date_naive() == day)
        .collect();

    articles.sort_by(|a, b| b.published.cmp(&a.published));
    articles
}

#[derive(Debug, Deserialize)]
struct FinnhubArticle {
    #[serde(default)]
    datetime: Option<i64>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    source: Option<String>,
}
