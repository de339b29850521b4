use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::sync::Arc;
use stockseer::application::alerts::{AlertGate, AlertSignal};
use stockseer::application::features::FeatureProcessor;
use stockseer::application::ingestion::IngestionService;
use stockseer::application::model_bank::ModelBank;
use stockseer::application::pipeline::PredictionPipeline;
use stockseer::config::{Config, SourceMode};
use stockseer::domain::ports::MarketDataSource;
use stockseer::domain::prediction::PredictionResult;
use stockseer::infrastructure::alpha_vantage::AlphaVantageSource;
use stockseer::infrastructure::mock::MockMarketDataSource;
use stockseer::infrastructure::series_cache::CsvSeriesStore;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stockseer", version, about = "Stock prediction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one prediction pass for a symbol: ingest daily bars, compute the
    /// indicator features, query the per-symbol model bank, and print the
    /// aggregated result.
    Predict {
        /// Ticker symbol to predict, e.g. AAPL
        #[arg(short, long)]
        symbol: String,

        /// Calendar days of history to fetch (defaults to HISTORY_DAYS)
        #[arg(short, long)]
        days: Option<u32>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    prediction: &'a PredictionResult,
    last_close: f64,
    alert: Option<&'a AlertSignal>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let Commands::Predict {
        symbol,
        days,
        format,
    } = cli.command;

    let symbol = symbol.to_uppercase();
    let days = days.unwrap_or(config.history_days);
    let end = Utc::now().date_naive();
    let start = end - Duration::days(i64::from(days));
    info!("Predicting {} over {}..{}", symbol, start, end);

    let source: Arc<dyn MarketDataSource> = match config.source_mode {
        SourceMode::Mock => Arc::new(MockMarketDataSource::with_synthetic(&symbol, start, end)),
        SourceMode::AlphaVantage => {
            if config.alpha_vantage_api_key.is_empty() {
                anyhow::bail!("ALPHA_VANTAGE_API_KEY is required for SOURCE_MODE=alphavantage");
            }
            Arc::new(AlphaVantageSource::new(
                config.alpha_vantage_api_key.clone(),
                config.alpha_vantage_base_url.clone(),
            )?)
        }
    };

    let mut ingestion = IngestionService::new(source, config.max_gap_days);
    if let Some(dir) = &config.series_cache_dir {
        ingestion = ingestion.with_store(Arc::new(CsvSeriesStore::new(dir)));
    }

    let processor = FeatureProcessor::new(config.indicator_set())
        .map_err(|e| anyhow::anyhow!("invalid indicator configuration: {}", e))?;
    let bank = Arc::new(ModelBank::new(&config.models_dir));
    let alert_gate = AlertGate::new(config.alert_threshold_pct);

    let pipeline = PredictionPipeline::new(ingestion, processor, bank, alert_gate);
    let outcome = pipeline
        .run(&symbol, start, end)
        .await
        .with_context(|| format!("prediction failed for {}", symbol))?;

    match format {
        OutputFormat::Json => {
            let report = JsonReport {
                prediction: &outcome.result,
                last_close: outcome.last_close,
                alert: outcome.alert.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let r = &outcome.result;
            println!("Symbol:      {}", r.symbol);
            println!("As of:       {}", r.as_of);
            println!("Last close:  {:.2}", outcome.last_close);
            println!("Next close:  {:.2}", r.price_target);
            println!("Trend:       {}", r.trend_label);
            println!("Regime:      {}", r.volatility_regime);
            println!("Confidence:  {:.2}", r.confidence);
            match &outcome.alert {
                Some(alert) => println!(
                    "Alert:       target deviates {:+.2}% from last close (id {})",
                    alert.deviation_pct,
                    &alert.prediction_id[..12]
                ),
                None => println!("Alert:       none"),
            }
        }
    }

    Ok(())
}
