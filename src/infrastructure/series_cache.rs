//! CSV-backed series cache, one `<SYMBOL>_daily.csv` per symbol.

use crate::domain::market::{DailyBar, PriceSeries};
use crate::domain::ports::SeriesStore;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

pub struct CsvSeriesStore {
    dir: PathBuf,
}

impl CsvSeriesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_daily.csv", symbol))
    }
}

impl SeriesStore for CsvSeriesStore {
    fn load(&self, symbol: &str) -> Result<Option<Vec<DailyBar>>> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("cannot open series cache {}", path.display()))?;
        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let bar: DailyBar = record
                .with_context(|| format!("bad record in {}", path.display()))?;
            bars.push(bar);
        }
        debug!(
            "CsvSeriesStore: read {} bars for {} from {}",
            bars.len(),
            symbol,
            path.display()
        );
        Ok(Some(bars))
    }

    fn save(&self, series: &PriceSeries) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create cache dir {}", self.dir.display()))?;
        let path = self.path_for(series.symbol());
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("cannot write series cache {}", path.display()))?;
        for bar in series.bars() {
            writer.serialize(bar)?;
        }
        writer.flush()?;
        debug!(
            "CsvSeriesStore: wrote {} bars for {} to {}",
            series.len(),
            series.symbol(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::synthetic_bars;
    use chrono::NaiveDate;

    #[test]
    fn test_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvSeriesStore::new(tmp.path());

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = start + chrono::Duration::days(40);
        let series =
            PriceSeries::new("AAPL", synthetic_bars(start, end, 150.0), 7).unwrap();

        store.save(&series).unwrap();
        let loaded = store.load("AAPL").unwrap().unwrap();
        assert_eq!(loaded, series.bars());
    }

    #[test]
    fn test_missing_symbol_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvSeriesStore::new(tmp.path());
        assert!(store.load("MSFT").unwrap().is_none());
    }
}
