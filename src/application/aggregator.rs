//! Prediction aggregation: three typed model outputs in, one
//! `PredictionResult` out. Pure and stateless; never a partial result.

use crate::domain::errors::AggregationError;
use crate::domain::prediction::{PredictionResult, RegimeOutput, TrendOutput};
use chrono::NaiveDate;

/// Fallback used when neither probabilities nor a recorded validation
/// accuracy are available.
const MIDPOINT_CONFIDENCE: f64 = 0.5;

/// Combines the three sub-results for one feature vector.
///
/// Policy: price target from the regressor, trend from the classifier,
/// volatility regime from the clusterer's training-time table. Fails with
/// `IncompleteInputs` when any sub-result is absent.
pub fn aggregate(
    symbol: &str,
    as_of: NaiveDate,
    price_target: Option<f64>,
    trend: Option<TrendOutput>,
    regime: Option<RegimeOutput>,
) -> Result<PredictionResult, AggregationError> {
    match (price_target, trend, regime) {
        (Some(price_target), Some(trend), Some(regime)) => Ok(PredictionResult {
            symbol: symbol.to_string(),
            as_of,
            price_target,
            trend_label: trend.label,
            volatility_regime: regime.regime,
            confidence: confidence_for(&trend),
        }),
        (price_target, trend, regime) => {
            let mut missing = Vec::new();
            if price_target.is_none() {
                missing.push("regression");
            }
            if trend.is_none() {
                missing.push("classification");
            }
            if regime.is_none() {
                missing.push("clustering");
            }
            Err(AggregationError::IncompleteInputs { missing })
        }
    }
}

/// Confidence heuristic, in training-supplied order of preference:
/// probability margin (top-1 minus top-2), then the artifact's recorded
/// validation accuracy, then the fixed midpoint.
fn confidence_for(trend: &TrendOutput) -> f64 {
    if let Some(probabilities) = &trend.probabilities
        && probabilities.len() >= 2
    {
        let mut sorted = probabilities.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        return (sorted[0] - sorted[1]).clamp(0.0, 1.0);
    }
    if let Some(accuracy) = trend.validation_accuracy {
        return accuracy.clamp(0.0, 1.0);
    }
    MIDPOINT_CONFIDENCE
}
