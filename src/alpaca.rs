//! Alpaca trading API client: account state, bracket order submission and
//! the liquidate-everything escape hatch. Paper endpoint by default.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use uuid::Uuid;

pub struct BrokerClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
}

/// The account fields position sizing and status reporting need.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub status: String,
    pub buying_power: f64,
    pub cash: f64,
    pub equity: f64,
}

/// A fully-specified bracket submission: market entry plus TP limit and
/// SL stop legs. Prices must already be rounded to pennies.
#[derive(Debug, Clone)]
pub struct BracketOrder {
    pub ticker: String,
    pub quantity: i64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: String,
    pub status: String,
}

impl BrokerClient {
    pub fn new(http: Client, base_url: &str, key_id: &str, secret_key: &str) -> Result<Self> {
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
        })
    }

    pub async fn account(&self) -> Result<AccountSnapshot> {
        let url = format!("{}/v2/account", self.base_url);
        let account: AlpacaAccount = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error", url))?
            .json()
            .await
            .context("failed to parse Alpaca account response")?;

        Ok(AccountSnapshot {
            status: account.status.unwrap_or_else(|| "unknown".to_string()),
            buying_power: account.buying_power.unwrap_or(0.0),
            cash: account.cash.unwrap_or(0.0),
            equity: account.equity.unwrap_or(0.0),
        })
    }

    /// Submits one bracket order. The client order id is a fresh UUID so
    /// retried submissions are distinguishable on the broker side.
    pub async fn place_bracket_order(&self, order: &BracketOrder) -> Result<OrderAck> {
        order.validate()?;

        let client_order_id = Uuid::new_v4().to_string();
        let body = json!({
            "symbol": order.ticker,
            "qty": order.quantity.to_string(),
            "side": "buy",
            "type": "market",
            "time_in_force": "day",
            "order_class": "bracket",
            "client_order_id": client_order_id,
            "take_profit": { "limit_price": format!("{:.2}", order.take_profit) },
            "stop_loss": { "stop_price": format!("{:.2}", order.stop_loss) },
        });

        let url = format!("{}/v2/orders", self.base_url);
        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        if response.status() == StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Bracket order for {} rejected (insufficient buying power?): {}",
                order.ticker,
                detail
            ));
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("POST {} returned error", url))?;

        let ack: AlpacaOrderAck = response
            .json()
            .await
            .context("failed to parse Alpaca order response")?;
        info!(
            "Bracket order accepted for {} x{} (id {})",
            order.ticker,
            order.quantity,
            ack.id.as_deref().unwrap_or("?")
        );
        Ok(OrderAck {
            order_id: ack.id.unwrap_or_default(),
            client_order_id,
            status: ack.status.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// Closes every open position and cancels the associated orders.
    /// Returns the symbols the broker reported acting on.
    pub async fn close_all_positions(&self) -> Result<Vec<String>> {
        let url = format!("{}/v2/positions", self.base_url);
        let response = self
            .http
            .delete(&url)
            .headers(self.headers.clone())
            .query(&[("cancel_orders", "true")])
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;

        // 207 means some closes failed; report what went through and warn.
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::MULTI_STATUS {
            response
                .error_for_status()
                .with_context(|| format!("DELETE {} returned error", url))?;
            return Ok(Vec::new());
        }

        let entries: Vec<PositionCloseEntry> = response
            .json()
            .await
            .context("failed to parse position close response")?;
        let mut closed = Vec::new();
        for entry in entries {
            let Some(symbol) = entry.symbol else {
                continue;
            };
            if entry.status.map(|code| code < 300).unwrap_or(true) {
                closed.push(symbol);
            } else {
                warn!("Broker failed to close position in {}", symbol);
            }
        }
        Ok(closed)
    }
}

impl BracketOrder {
    pub fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(anyhow!(
                "Order quantity for {} must be > 0 (value: {})",
                self.ticker,
                self.quantity
            ));
        }
        if self.take_profit <= 0.0 || self.stop_loss <= 0.0 {
            return Err(anyhow!(
                "Order levels for {} must be > 0 (tp {}, sl {})",
                self.ticker,
                self.take_profit,
                self.stop_loss
            ));
        }
        if self.take_profit <= self.stop_loss {
            return Err(anyhow!(
                "Take-profit ({}) must be above stop-loss ({}) for {}",
                self.take_profit,
                self.stop_loss,
                self.ticker
            ));
        }
        Ok(())
    }
}

/// Alpaca rejects sub-penny limit/stop prices on most symbols.
pub fn round_to_penny(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_f64_opt")]
    buying_power: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_opt")]
    cash: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_opt")]
    equity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrderAck {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionCloseEntry {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

/// Alpaca serializes most numeric account fields as strings.
fn deserialize_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct F64OptVisitor;

    impl<'de> Visitor<'de> for F64OptVisitor {
        type Value = Option<f64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or string")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.trim().parse::<f64>().ok())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.trim().parse::<f64>().ok())
        }
    }

    deserializer.deserialize_any(F64OptVisitor)
}
