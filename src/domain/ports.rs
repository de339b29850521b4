use crate::domain::errors::IngestError;
use crate::domain::market::{DailyBar, PriceSeries};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// External market-data collaborator. Implementations wrap one HTTP API call
/// per fetch; retry policy is the caller's decision, never the source's.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Raw daily bars for `[start, end]`, oldest first. Validation into a
    /// `PriceSeries` happens in the ingestion service, not here.
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, IngestError>;
}

/// On-disk cache of raw fetched series, one entry per symbol.
pub trait SeriesStore: Send + Sync {
    fn load(&self, symbol: &str) -> Result<Option<Vec<DailyBar>>>;
    fn save(&self, series: &PriceSeries) -> Result<()>;
}
