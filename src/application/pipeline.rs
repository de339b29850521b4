//! The prediction pipeline: one stateless pass per request.
//!
//! ingestion -> feature processing -> three predicts -> aggregation.
//! The three predict calls run on blocking threads and join; each reads its
//! own immutable artifact, so no locking is involved. The only cross-call
//! state is the bank's append-only artifact cache.

use crate::application::aggregator::aggregate;
use crate::application::alerts::{AlertGate, AlertSignal};
use crate::application::features::FeatureProcessor;
use crate::application::ingestion::IngestionService;
use crate::application::model_bank::{ModelArtifact, ModelBank};
use crate::domain::errors::{FeatureError, PipelineError};
use crate::domain::features::FeatureVector;
use crate::domain::prediction::{ModelKind, ModelOutput, PredictionResult};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Everything one invocation produces.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub result: PredictionResult,
    pub alert: Option<AlertSignal>,
    /// Close of the newest ingested bar, the alert baseline.
    pub last_close: f64,
}

pub struct PredictionPipeline {
    ingestion: IngestionService,
    processor: FeatureProcessor,
    bank: Arc<ModelBank>,
    alert_gate: AlertGate,
}

impl PredictionPipeline {
    pub fn new(
        ingestion: IngestionService,
        processor: FeatureProcessor,
        bank: Arc<ModelBank>,
        alert_gate: AlertGate,
    ) -> Self {
        Self {
            ingestion,
            processor,
            bank,
            alert_gate,
        }
    }

    /// Runs one full inference pass for a symbol over `[start, end]`.
    pub async fn run(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PipelineOutcome, PipelineError> {
        let series = self.ingestion.fetch(symbol, start, end).await?;
        let vectors = self.processor.compute(&series)?;
        let latest = vectors
            .last()
            .cloned()
            .ok_or(FeatureError::InsufficientHistory {
                indicator: "<any>".to_string(),
                required: self.processor.min_history(),
                actual: series.len(),
            })?;

        let regression = self.bank.load(symbol, ModelKind::Regression)?;
        let classification = self.bank.load(symbol, ModelKind::Classification)?;
        let clustering = self.bank.load(symbol, ModelKind::Clustering)?;

        let reg_task = spawn_predict(regression, latest.clone());
        let cls_task = spawn_predict(classification, latest.clone());
        let clu_task = spawn_predict(clustering, latest.clone());
        let (reg_out, cls_out, clu_out) = tokio::try_join!(reg_task, cls_task, clu_task)
            .map_err(|e| PipelineError::Task {
                reason: e.to_string(),
            })?;

        let price_target = match reg_out? {
            ModelOutput::Price(p) => Some(p),
            _ => None,
        };
        let trend = match cls_out? {
            ModelOutput::Trend(t) => Some(t),
            _ => None,
        };
        let regime = match clu_out? {
            ModelOutput::Regime(r) => Some(r),
            _ => None,
        };

        let result = aggregate(symbol, latest.date(), price_target, trend, regime)?;
        let last_close = series
            .last()
            .and_then(|b| b.close.to_f64())
            .unwrap_or(0.0);
        let alert = self.alert_gate.evaluate(&result, last_close);

        info!(
            "Pipeline: {} as of {} -> target {:.2}, trend {}, regime {}, confidence {:.2}",
            result.symbol,
            result.as_of,
            result.price_target,
            result.trend_label,
            result.volatility_regime,
            result.confidence
        );
        Ok(PipelineOutcome {
            result,
            alert,
            last_close,
        })
    }
}

/// One predict call on a blocking thread. The vector is narrowed to the
/// artifact's trained feature list first; predict still enforces set-exact
/// equality and reports anything missing.
fn spawn_predict(
    artifact: Arc<ModelArtifact>,
    vector: FeatureVector,
) -> JoinHandle<Result<ModelOutput, crate::domain::errors::ModelError>> {
    tokio::task::spawn_blocking(move || {
        let projected = vector.project(artifact.features());
        artifact.predict(&projected)
    })
}
