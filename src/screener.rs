//! News-sentiment screening over a ticker universe.
//!
//! One news request per ticker, strictly sequential in universe order, so
//! the output order is the universe order (stable filter) and repeated
//! runs over the same inputs produce identical results. Tickers with zero
//! scored articles never qualify, whatever the bounds say.

use crate::config::SentimentBounds;
use crate::models::SentimentScore;
use crate::news::NewsSource;
use crate::sentiment;
use chrono::NaiveDate;
use log::{debug, info, warn};

/// Scores every universe ticker for `day` and keeps those whose compound
/// score falls inside `bounds`. Upstream failures skip the ticker and the
/// screen continues.
pub async fn screen(
    news: &dyn NewsSource,
    universe: &[String],
    day: NaiveDate,
    bounds: &SentimentBounds,
) -> Vec<SentimentScore> {
    let mut qualifiers = Vec::new();

    for ticker in universe {
        let articles = match news.daily_articles(ticker, day).await {
            Ok(articles) => articles,
            Err(err) => {
                warn!("Skipping {} on {}: {}", ticker, day, err);
                continue;
            }
        };

        let texts: Vec<String> = articles
            .iter()
            .map(|article| article.scoring_text())
            .collect();
        let Some(compound) = sentiment::score_texts(&texts) else {
            debug!("{} has no news on {}; no signal", ticker, day);
            continue;
        };

        let article_count = texts.len().min(sentiment::MAX_ARTICLES);
        if bounds.contains(compound) {
            debug!(
                "{} qualifies on {} (compound {:.4} from {} article(s))",
                ticker, day, compound, article_count
            );
            qualifiers.push(SentimentScore {
                ticker: ticker.clone(),
                day,
                compound,
                article_count,
            });
        } else {
            debug!(
                "{} outside sentiment bounds on {} (compound {:.4})",
                ticker, day, compound
            );
        }
    }

    info!(
        "Screened {} ticker(s) on {}: {} qualified",
        universe.len(),
        day,
        qualifiers.len()
    );
    qualifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::news::NewsArticle;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    struct FakeNews {
        headlines: HashMap<String, Vec<&'static str>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl NewsSource for FakeNews {
        async fn daily_articles(
            &self,
            ticker: &str,
            day: NaiveDate,
        ) -> Result<Vec<NewsArticle>, DataError> {
            if self.failing.iter().any(|t| t == ticker) {
                return Err(DataError::UpstreamUnavailable {
                    attempts: 3,
                    message: format!("news feed down for {}", ticker),
                });
            }
            let headlines = self.headlines.get(ticker).cloned().unwrap_or_default();
            Ok(headlines
                .into_iter()
                .map(|headline| NewsArticle {
                    published: Utc
                        .from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap()),
                    headline: headline.to_string(),
                    summary: String::new(),
                    source: "test".to_string(),
                })
                .collect())
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 5).unwrap()
    }

    #[tokio::test]
    async fn preserves_universe_order_and_filters_bounds() {
        let mut headlines = HashMap::new();
        headlines.insert("AAA".to_string(), vec!["profit surge and strong growth"]);
        headlines.insert("BBB".to_string(), vec!["bankruptcy fears and fraud probe"]);
        headlines.insert("CCC".to_string(), vec!["solid gains and upbeat outlook"]);
        let news = FakeNews {
            headlines,
            failing: Vec::new(),
        };
        let universe = vec!["CCC".to_string(), "AAA".to_string(), "BBB".to_string()];

        let bounds = SentimentBounds { min: 0.0, max: 1.0 };
        let qualifiers = screen(&news, &universe, day(), &bounds).await;

        let tickers: Vec<&str> = qualifiers.iter().map(|q| q.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["CCC", "AAA"]);
        assert!(qualifiers.iter().all(|q| q.article_count == 1));
    }

    #[tokio::test]
    async fn zero_article_tickers_never_qualify() {
        let news = FakeNews {
            headlines: HashMap::new(),
            failing: Vec::new(),
        };
        let universe = vec!["AAA".to_string()];

        // Bounds that would admit a neutral 0.0 score.
        let bounds = SentimentBounds {
            min: -1.0,
            max: 1.0,
        };
        let qualifiers = screen(&news, &universe, day(), &bounds).await;
        assert!(qualifiers.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_skips_only_that_ticker() {
        let mut headlines = HashMap::new();
        headlines.insert("AAA".to_string(), vec!["strong profit growth"]);
        headlines.insert("BBB".to_string(), vec!["record gains"]);
        let news = FakeNews {
            headlines,
            failing: vec!["AAA".to_string()],
        };
        let universe = vec!["AAA".to_string(), "BBB".to_string()];

        let bounds = SentimentBounds { min: 0.0, max: 1.0 };
        let qualifiers = screen(&news, &universe, day(), &bounds).await;
        assert_eq!(qualifiers.len(), 1);
        assert_eq!(qualifiers[0].ticker, "BBB");
    }
}
