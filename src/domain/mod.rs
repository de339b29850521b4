// Market data domain
pub mod market;

// Indicator / feature vector domain
pub mod features;

// Prediction outputs and model kinds
pub mod prediction;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
