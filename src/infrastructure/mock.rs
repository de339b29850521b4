//! Deterministic offline market-data source, for tests and mock mode.

use crate::domain::errors::IngestError;
use crate::domain::market::DailyBar;
use crate::domain::ports::MarketDataSource;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Synthetic weekday bars: a slow trend plus a deterministic oscillation.
/// Same inputs always produce the same bars.
pub fn synthetic_bars(start: NaiveDate, end: NaiveDate, base_price: f64) -> Vec<DailyBar> {
    let mut bars = Vec::new();
    let mut date = start;
    let mut i = 0u32;
    while date <= end {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let t = i as f64;
            let close = base_price * (1.0 + 0.0004 * t) + (t * 0.31).sin() * base_price * 0.01;
            let open = close - (t * 0.17).sin() * 0.4;
            let spread = 0.6 + (t * 0.11).cos().abs();
            let close_d = Decimal::from_f64(close).unwrap_or(dec!(1));
            let open_d = Decimal::from_f64(open).unwrap_or(close_d);
            bars.push(DailyBar {
                date,
                open: open_d,
                high: Decimal::from_f64(close.max(open) + spread).unwrap_or(close_d),
                low: Decimal::from_f64(close.min(open) - spread).unwrap_or(close_d),
                close: close_d,
                volume: Decimal::from(1_000_000 + (i as i64 % 7) * 50_000),
            });
            i += 1;
        }
        date += chrono::Duration::days(1);
    }
    bars
}

/// Serves canned series per symbol; anything unregistered is unavailable,
/// mirroring how the real API answers unknown tickers.
#[derive(Default)]
pub struct MockMarketDataSource {
    series: HashMap<String, Vec<DailyBar>>,
}

impl MockMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, bars: Vec<DailyBar>) -> Self {
        self.series.insert(symbol.into(), bars);
        self
    }

    /// A source pre-filled with one synthetic symbol.
    pub fn with_synthetic(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        let symbol = symbol.into();
        Self::new().with_series(symbol.clone(), synthetic_bars(start, end, 180.0))
    }
}

#[async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, IngestError> {
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| IngestError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "unknown symbol".to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }
}
