pub mod indicator;
pub mod vector;

pub use indicator::IndicatorSpec;
pub use vector::FeatureVector;
