use crate::domain::features::IndicatorSpec;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where daily bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Mock,
    AlphaVantage,
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(SourceMode::Mock),
            "alphavantage" | "alpha_vantage" => Ok(SourceMode::AlphaVantage),
            _ => anyhow::bail!(
                "Invalid SOURCE_MODE: {}. Must be 'mock' or 'alphavantage'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_mode: SourceMode,
    pub alpha_vantage_api_key: String,
    pub alpha_vantage_base_url: String,
    pub models_dir: String,
    /// When set, fetched series are cached as CSV under this directory.
    pub series_cache_dir: Option<String>,
    pub history_days: u32,
    /// Largest tolerated calendar gap between consecutive bars.
    pub max_gap_days: i64,
    pub alert_threshold_pct: f64,
    // Indicator windows
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub volatility_period: usize,
    pub zscore_period: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let source_mode_str = env::var("SOURCE_MODE").unwrap_or_else(|_| "mock".to_string());
        let source_mode = SourceMode::from_str(&source_mode_str)?;

        let alpha_vantage_api_key = env::var("ALPHA_VANTAGE_API_KEY").unwrap_or_default();
        let alpha_vantage_base_url = env::var("ALPHA_VANTAGE_BASE_URL")
            .unwrap_or_else(|_| "https://www.alphavantage.co".to_string());

        let models_dir = env::var("MODELS_DIR").unwrap_or_else(|_| "models".to_string());
        let series_cache_dir = env::var("SERIES_CACHE_DIR").ok();

        let history_days = env::var("HISTORY_DAYS")
            .unwrap_or_else(|_| "180".to_string())
            .parse::<u32>()
            .context("Failed to parse HISTORY_DAYS")?;

        let max_gap_days = env::var("MAX_GAP_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i64>()
            .context("Failed to parse MAX_GAP_DAYS")?;

        let alert_threshold_pct = env::var("ALERT_THRESHOLD_PCT")
            .unwrap_or_else(|_| "0.5".to_string())
            .parse::<f64>()
            .context("Failed to parse ALERT_THRESHOLD_PCT")?;

        let parse_period = |key: &str, default: &str| -> Result<usize> {
            env::var(key)
                .unwrap_or_else(|_| default.to_string())
                .parse::<usize>()
                .with_context(|| format!("Failed to parse {}", key))
        };

        Ok(Self {
            source_mode,
            alpha_vantage_api_key,
            alpha_vantage_base_url,
            models_dir,
            series_cache_dir,
            history_days,
            max_gap_days,
            alert_threshold_pct,
            sma_fast_period: parse_period("SMA_FAST_PERIOD", "20")?,
            sma_slow_period: parse_period("SMA_SLOW_PERIOD", "50")?,
            rsi_period: parse_period("RSI_PERIOD", "14")?,
            macd_fast_period: parse_period("MACD_FAST_PERIOD", "12")?,
            macd_slow_period: parse_period("MACD_SLOW_PERIOD", "26")?,
            macd_signal_period: parse_period("MACD_SIGNAL_PERIOD", "9")?,
            volatility_period: parse_period("VOLATILITY_PERIOD", "20")?,
            zscore_period: parse_period("ZSCORE_PERIOD", "50")?,
        })
    }

    /// The full indicator set the pipeline computes, matching the feature
    /// lists the default artifacts are trained with.
    pub fn indicator_set(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Sma {
                window: self.sma_fast_period,
            },
            IndicatorSpec::Sma {
                window: self.sma_slow_period,
            },
            IndicatorSpec::Rsi {
                window: self.rsi_period,
            },
            IndicatorSpec::Macd {
                fast: self.macd_fast_period,
                slow: self.macd_slow_period,
                signal: self.macd_signal_period,
            },
            IndicatorSpec::LogReturn,
            IndicatorSpec::PctReturn,
            IndicatorSpec::Volatility {
                window: self.volatility_period,
            },
            IndicatorSpec::PriceZscore {
                window: self.zscore_period,
            },
        ]
    }
}
