//! End-to-end pipeline flow: mock market data, on-disk artifacts, one
//! inference pass per symbol.

use chrono::NaiveDate;
use smartcore::cluster::kmeans::{KMeans, KMeansParameters};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::path::Path;
use std::sync::Arc;
use stockseer::application::alerts::AlertGate;
use stockseer::application::features::FeatureProcessor;
use stockseer::application::ingestion::IngestionService;
use stockseer::application::model_bank::{
    ArtifactFile, Clusterer, Estimator, ModelBank,
};
use stockseer::application::pipeline::PredictionPipeline;
use stockseer::domain::errors::{FeatureError, IngestError, ModelError, PipelineError};
use stockseer::domain::features::IndicatorSpec;
use stockseer::domain::prediction::VolatilityRegime;
use stockseer::infrastructure::mock::MockMarketDataSource;

const FEATURES: [&str; 2] = ["sma_5", "rsi"];

fn training_data() -> (DenseMatrix<f64>, Vec<f64>, Vec<u32>) {
    // Plausible (sma, rsi) rows around the synthetic series level.
    let rows: Vec<Vec<f64>> = (0..30)
        .map(|i| {
            let a = i as f64;
            vec![170.0 + a, 20.0 + (a * 11.0) % 60.0]
        })
        .collect();
    let x = DenseMatrix::from_2d_vec(&rows).unwrap();
    let y_reg: Vec<f64> = (0..30).map(|i| 171.0 + i as f64).collect();
    let y_cls: Vec<u32> = (0..30).map(|i| (i % 3) as u32).collect();
    (x, y_reg, y_cls)
}

fn feature_list() -> Vec<String> {
    FEATURES.iter().map(|s| s.to_string()).collect()
}

fn write_full_bank(models_dir: &Path, symbol: &str) {
    let dir = models_dir.join(symbol);
    std::fs::create_dir_all(&dir).unwrap();
    let (x, y_reg, y_cls) = training_data();

    let regressor = RandomForestRegressor::fit(&x, &y_reg, Default::default()).unwrap();
    ArtifactFile {
        version: "v1".to_string(),
        features: feature_list(),
        trained_from: NaiveDate::from_ymd_opt(2023, 1, 2),
        trained_through: NaiveDate::from_ymd_opt(2024, 1, 2),
        validation_accuracy: None,
        regime_table: None,
        estimator: Estimator::Regression(Box::new(regressor)),
    }
    .write_to(&dir.join("regression_v1.json"))
    .unwrap();

    let classifier = RandomForestClassifier::fit(&x, &y_cls, Default::default()).unwrap();
    ArtifactFile {
        version: "v1".to_string(),
        features: feature_list(),
        trained_from: None,
        trained_through: None,
        validation_accuracy: Some(0.58),
        regime_table: None,
        estimator: Estimator::Classification(Box::new(classifier)),
    }
    .write_to(&dir.join("classification_v1.json"))
    .unwrap();

    let clusterer: Clusterer = KMeans::fit(&x, KMeansParameters::default().with_k(3)).unwrap();
    ArtifactFile {
        version: "v1".to_string(),
        features: feature_list(),
        trained_from: None,
        trained_through: None,
        validation_accuracy: None,
        regime_table: Some(vec![
            VolatilityRegime::Low,
            VolatilityRegime::Medium,
            VolatilityRegime::High,
        ]),
        estimator: Estimator::Clustering(Box::new(clusterer)),
    }
    .write_to(&dir.join("clustering_v1.json"))
    .unwrap();
}

fn test_specs() -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::Sma { window: 5 },
        IndicatorSpec::Rsi { window: 5 },
    ]
}

fn build_pipeline(models_dir: &Path, symbol: &str, start: NaiveDate, end: NaiveDate) -> PredictionPipeline {
    let source = Arc::new(MockMarketDataSource::with_synthetic(symbol, start, end));
    let ingestion = IngestionService::new(source, 7);
    let processor = FeatureProcessor::new(test_specs()).unwrap();
    let bank = Arc::new(ModelBank::new(models_dir));
    PredictionPipeline::new(ingestion, processor, bank, AlertGate::new(0.5))
}

fn range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
    )
}

#[tokio::test]
async fn test_full_pass_produces_complete_result() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_bank(tmp.path(), "AAPL");
    let (start, end) = range();
    let pipeline = build_pipeline(tmp.path(), "AAPL", start, end);

    let outcome = pipeline.run("AAPL", start, end).await.unwrap();
    let result = &outcome.result;

    assert_eq!(result.symbol, "AAPL");
    assert!(result.as_of > start && result.as_of <= end);
    assert!(result.price_target.is_finite());
    assert!((0.0..=1.0).contains(&result.confidence));
    assert!(outcome.last_close > 0.0);
}

#[tokio::test]
async fn test_repeat_run_is_deterministic_and_alert_deduped() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_bank(tmp.path(), "AAPL");
    let (start, end) = range();
    let pipeline = build_pipeline(tmp.path(), "AAPL", start, end);

    let first = pipeline.run("AAPL", start, end).await.unwrap();
    let second = pipeline.run("AAPL", start, end).await.unwrap();

    assert_eq!(first.result, second.result);
    // The same prediction never alerts twice within one gate.
    if first.alert.is_some() {
        assert!(second.alert.is_none());
    }
}

#[tokio::test]
async fn test_unknown_symbol_is_data_unavailable() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_bank(tmp.path(), "AAPL");
    let (start, end) = range();
    let pipeline = build_pipeline(tmp.path(), "AAPL", start, end);

    let err = pipeline.run("MSFT", start, end).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Ingest(IngestError::DataUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_missing_artifact_aborts_whole_pass() {
    let tmp = tempfile::tempdir().unwrap();
    // Only the regression artifact exists; the pass must not produce a
    // partial result.
    let dir = tmp.path().join("AAPL");
    std::fs::create_dir_all(&dir).unwrap();
    let (x, y_reg, _) = training_data();
    let regressor = RandomForestRegressor::fit(&x, &y_reg, Default::default()).unwrap();
    ArtifactFile {
        version: "v1".to_string(),
        features: feature_list(),
        trained_from: None,
        trained_through: None,
        validation_accuracy: None,
        regime_table: None,
        estimator: Estimator::Regression(Box::new(regressor)),
    }
    .write_to(&dir.join("regression_v1.json"))
    .unwrap();

    let (start, end) = range();
    let pipeline = build_pipeline(tmp.path(), "AAPL", start, end);

    let err = pipeline.run("AAPL", start, end).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Model(ModelError::ArtifactMissing { .. })
    ));
}

#[tokio::test]
async fn test_short_history_is_insufficient() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_bank(tmp.path(), "AAPL");
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
    let pipeline = build_pipeline(tmp.path(), "AAPL", start, end);

    let err = pipeline.run("AAPL", start, end).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Feature(FeatureError::InsufficientHistory { .. })
    ));
}

#[tokio::test]
async fn test_feature_mismatch_when_artifacts_expect_other_features() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_bank(tmp.path(), "AAPL");
    let (start, end) = range();

    // The processor emits sma_10, never sma_5, so every artifact is missing
    // an input even after projection.
    let source = Arc::new(MockMarketDataSource::with_synthetic("AAPL", start, end));
    let ingestion = IngestionService::new(source, 7);
    let processor = FeatureProcessor::new(vec![
        IndicatorSpec::Sma { window: 10 },
        IndicatorSpec::Rsi { window: 5 },
    ])
    .unwrap();
    let bank = Arc::new(ModelBank::new(tmp.path()));
    let pipeline = PredictionPipeline::new(ingestion, processor, bank, AlertGate::new(0.5));

    let err = pipeline.run("AAPL", start, end).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Model(ModelError::FeatureMismatch { .. })
    ));
}
