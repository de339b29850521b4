//! Alpha Vantage Market Data Source
//!
//! Wraps the TIME_SERIES_DAILY endpoint. One HTTP call per fetch, no retry
//! middleware: failures surface immediately and the caller decides.

use crate::domain::errors::IngestError;
use crate::domain::market::DailyBar;
use crate::domain::ports::MarketDataSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct AlphaVantageSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageSource {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// The daily endpoint answers errors as 200s with a marker field, so all
/// three markers are modelled alongside the payload.
#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, RawBar>>,
}

fn parse_price(field: &str, value: &str, date: &NaiveDate) -> Result<Decimal, IngestError> {
    Decimal::from_str(value).map_err(|e| IngestError::MalformedResponse {
        reason: format!("unparseable {} \"{}\" on {}: {}", field, value, date, e),
    })
}

#[async_trait]
impl MarketDataSource for AlphaVantageSource {
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, IngestError> {
        let url = format!("{}/query", self.base_url);
        info!("AlphaVantageSource: requesting daily series for {}", symbol);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("datatype", "json"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IngestError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(IngestError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        let body: DailyResponse =
            response
                .json()
                .await
                .map_err(|e| IngestError::MalformedResponse {
                    reason: format!("undecodable body: {}", e),
                })?;

        if let Some(message) = body.error_message {
            // The API answers this for unknown symbols.
            return Err(IngestError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: message,
            });
        }
        if let Some(message) = body.note.or(body.information) {
            // Quota / rate-limit marker.
            return Err(IngestError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: message,
            });
        }

        let series = body.series.ok_or_else(|| IngestError::MalformedResponse {
            reason: "response carries neither a daily series nor an error marker".to_string(),
        })?;

        // BTreeMap of ISO dates iterates oldest-first already.
        let mut bars = Vec::new();
        for (date_str, raw) in &series {
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
                IngestError::MalformedResponse {
                    reason: format!("unparseable date \"{}\": {}", date_str, e),
                }
            })?;
            if date < start || date > end {
                continue;
            }
            bars.push(DailyBar {
                date,
                open: parse_price("open", &raw.open, &date)?,
                high: parse_price("high", &raw.high, &date)?,
                low: parse_price("low", &raw.low, &date)?,
                close: parse_price("close", &raw.close, &date)?,
                volume: parse_price("volume", &raw.volume, &date)?,
            });
        }

        debug!(
            "AlphaVantageSource: {} of {} bars within {}..{} for {}",
            bars.len(),
            series.len(),
            start,
            end,
            symbol
        );
        Ok(bars)
    }
}
