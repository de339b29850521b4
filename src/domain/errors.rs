use thiserror::Error;

/// Errors surfaced by data ingestion (external market-data call + validation).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("malformed market-data response: {reason}")]
    MalformedResponse { reason: String },
}

/// Errors surfaced by feature processing.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("insufficient history for {indicator}: need {required} bars, have {actual}")]
    InsufficientHistory {
        indicator: String,
        required: usize,
        actual: usize,
    },

    #[error("invalid indicator {name}: {reason}")]
    InvalidIndicator { name: String, reason: String },
}

/// Errors surfaced by the model bank (artifact loading and inference).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("artifact missing for {kind} model under {dir}")]
    ArtifactMissing { kind: String, dir: String },

    #[error("artifact corrupt at {path}: {reason}")]
    ArtifactCorrupt { path: String, reason: String },

    #[error("feature mismatch: missing [{}], unexpected [{}]", missing.join(", "), unexpected.join(", "))]
    FeatureMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("inference failed: {reason}")]
    Inference { reason: String },
}

/// Errors surfaced by the prediction aggregator.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("incomplete inputs: missing [{}]", missing.join(", "))]
    IncompleteInputs { missing: Vec<&'static str> },
}

/// Umbrella error for one pipeline invocation. Each invocation fails
/// independently; cached artifacts are never touched by a failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("prediction task failed: {reason}")]
    Task { reason: String },
}
