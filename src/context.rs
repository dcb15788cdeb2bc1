//! Per-run application context: one shared HTTP client, the environment
//! credentials and the retry policy, constructed once in `main` and
//! passed down. No process-wide mutable state.

use crate::alpaca::BrokerClient;
use crate::config::Credentials;
use crate::market_data::AlpacaDataClient;
use crate::news::FinnhubClient;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppContext {
    http: Client,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl AppContext {
    pub fn initialize() -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            credentials: Credentials::from_env(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn news_client(&self) -> Result<FinnhubClient> {
        let token = self.credentials.finnhub_key()?;
        Ok(FinnhubClient::new(
            self.http.clone(),
            &self.credentials.finnhub_url,
            token,
            self.retry,
        ))
    }

    pub fn candle_client(&self) -> Result<AlpacaDataClient> {
        let (key, secret) = self.credentials.alpaca_keys()?;
        AlpacaDataClient::new(
            self.http.clone(),
            &self.credentials.alpaca_data_url,
            key,
            secret,
            self.retry,
        )
    }

    pub fn broker_client(&self) -> Result<BrokerClient> {
        let (key, secret) = self.credentials.alpaca_keys()?;
        BrokerClient::new(
            self.http.clone(),
            &self.credentials.alpaca_trading_url,
            key,
            secret,
        )
    }
}
