//! Ingestion: one external fetch per request, validated into a `PriceSeries`.
//!
//! No retries happen here; every failure is surfaced to the caller, which
//! decides whether to refetch or show a message.

use crate::domain::errors::IngestError;
use crate::domain::market::{DailyBar, PriceSeries};
use crate::domain::ports::{MarketDataSource, SeriesStore};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

pub struct IngestionService {
    source: Arc<dyn MarketDataSource>,
    store: Option<Arc<dyn SeriesStore>>,
    max_gap_days: i64,
}

impl IngestionService {
    pub fn new(source: Arc<dyn MarketDataSource>, max_gap_days: i64) -> Self {
        Self {
            source,
            store: None,
            max_gap_days,
        }
    }

    /// Attaches a read-through/write-through series cache.
    pub fn with_store(mut self, store: Arc<dyn SeriesStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fetches and validates daily bars for `[start, end]`.
    pub async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, IngestError> {
        if let Some(series) = self.load_cached(symbol, start, end) {
            return Ok(series);
        }

        info!("IngestionService: fetching {} daily bars {}..{}", symbol, start, end);
        let bars = self.source.fetch_daily_series(symbol, start, end).await?;
        if bars.is_empty() {
            return Err(IngestError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no bars returned for {}..{}", start, end),
            });
        }

        let series = PriceSeries::new(symbol, bars, self.max_gap_days)?;
        info!(
            "IngestionService: validated {} bars for {}",
            series.len(),
            symbol
        );

        if let Some(store) = &self.store
            && let Err(e) = store.save(&series)
        {
            warn!("IngestionService: failed to cache series for {}: {}", symbol, e);
        }

        Ok(series)
    }

    /// Uses the cache only when it fully covers the requested range.
    fn load_cached(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries> {
        let store = self.store.as_ref()?;
        let bars = match store.load(symbol) {
            Ok(bars) => bars?,
            Err(e) => {
                warn!("IngestionService: series cache read failed for {}: {}", symbol, e);
                return None;
            }
        };

        let first = bars.first()?.date;
        let last = bars.last()?.date;
        if first > start || last < end {
            return None;
        }

        let in_range: Vec<DailyBar> = bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        match PriceSeries::new(symbol, in_range, self.max_gap_days) {
            Ok(series) if !series.is_empty() => {
                info!(
                    "IngestionService: using {} cached bars for {}",
                    series.len(),
                    symbol
                );
                Some(series)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("IngestionService: cached series for {} invalid: {}", symbol, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{MockMarketDataSource, synthetic_bars};

    fn dates() -> (NaiveDate, NaiveDate) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (start, start + chrono::Duration::days(90))
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_data_unavailable() {
        let (start, end) = dates();
        let source = MockMarketDataSource::new();
        let service = IngestionService::new(Arc::new(source), 7);

        let err = service.fetch("ZZZZ", start, end).await.unwrap_err();
        assert!(matches!(err, IngestError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_validates_into_series() {
        let (start, end) = dates();
        let source =
            MockMarketDataSource::new().with_series("AAPL", synthetic_bars(start, end, 185.0));
        let service = IngestionService::new(Arc::new(source), 7);

        let series = service.fetch("AAPL", start, end).await.unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert!(series.len() > 50);
    }

    #[tokio::test]
    async fn test_unsorted_bars_are_malformed() {
        let (start, end) = dates();
        let mut bars = synthetic_bars(start, end, 185.0);
        bars.swap(0, 1);
        let source = MockMarketDataSource::new().with_series("AAPL", bars);
        let service = IngestionService::new(Arc::new(source), 7);

        let err = service.fetch("AAPL", start, end).await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_empty_range_is_data_unavailable() {
        let (start, end) = dates();
        let source = MockMarketDataSource::new().with_series("AAPL", vec![]);
        let service = IngestionService::new(Arc::new(source), 7);

        let err = service.fetch("AAPL", start, end).await.unwrap_err();
        assert!(matches!(err, IngestError::DataUnavailable { .. }));
    }
}
