pub mod aggregator;
pub mod alerts;
pub mod features;
pub mod ingestion;
pub mod model_bank;
pub mod pipeline;
pub mod statistics;
