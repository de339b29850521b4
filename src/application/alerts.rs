//! Alert gating: decides whether a prediction deviates enough from the last
//! observed close to be worth notifying about, and deduplicates repeats.
//! Delivery (Discord webhook, UI toast) is an external collaborator.

use crate::domain::prediction::PredictionResult;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// A significant prediction, ready for an external notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSignal {
    pub symbol: String,
    /// Stable id of this (symbol, date, price) prediction, for dedupe across
    /// processes as well.
    pub prediction_id: String,
    pub price_target: f64,
    pub last_close: f64,
    /// Signed deviation of the target from the last close, in percent.
    pub deviation_pct: f64,
}

/// Stable hash id so the same prediction never alerts twice.
pub fn prediction_id(result: &PredictionResult) -> String {
    let unique = format!(
        "{}_{}_{:.2}",
        result.symbol, result.as_of, result.price_target
    );
    hex::encode(Sha256::digest(unique.as_bytes()))
}

/// Threshold + dedupe gate. Remembers the last alerted prediction id per
/// symbol; interior mutability so one gate serves concurrent pipeline calls.
pub struct AlertGate {
    threshold_pct: f64,
    sent: Mutex<HashMap<String, String>>,
}

impl AlertGate {
    pub fn new(threshold_pct: f64) -> Self {
        Self {
            threshold_pct,
            sent: Mutex::new(HashMap::new()),
        }
    }

    /// Fires when the target deviates from the last close by at least the
    /// configured percentage and this prediction has not fired before.
    pub fn evaluate(&self, result: &PredictionResult, last_close: f64) -> Option<AlertSignal> {
        if last_close <= 0.0 {
            return None;
        }
        let deviation_pct = (result.price_target - last_close) / last_close * 100.0;
        if deviation_pct.abs() < self.threshold_pct {
            debug!(
                "AlertGate: {} deviation {:.3}% below threshold {:.3}%",
                result.symbol, deviation_pct, self.threshold_pct
            );
            return None;
        }

        let id = prediction_id(result);
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        if sent.get(&result.symbol) == Some(&id) {
            debug!("AlertGate: suppressing duplicate alert for {}", result.symbol);
            return None;
        }
        sent.insert(result.symbol.clone(), id.clone());

        info!(
            "AlertGate: {} target {:.2} deviates {:.2}% from close {:.2}",
            result.symbol, result.price_target, deviation_pct, last_close
        );
        Some(AlertSignal {
            symbol: result.symbol.clone(),
            prediction_id: id,
            price_target: result.price_target,
            last_close,
            deviation_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::{TrendLabel, VolatilityRegime};

    fn result(price_target: f64) -> PredictionResult {
        PredictionResult {
            symbol: "AAPL".to_string(),
            as_of: "2024-03-01".parse().unwrap(),
            price_target,
            trend_label: TrendLabel::Up,
            volatility_regime: VolatilityRegime::Low,
            confidence: 0.6,
        }
    }

    #[test]
    fn test_below_threshold_is_silent() {
        let gate = AlertGate::new(0.5);
        assert!(gate.evaluate(&result(100.2), 100.0).is_none());
    }

    #[test]
    fn test_fires_above_threshold() {
        let gate = AlertGate::new(0.5);
        let alert = gate.evaluate(&result(101.0), 100.0).unwrap();
        assert!((alert.deviation_pct - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fires_on_negative_deviation() {
        let gate = AlertGate::new(0.5);
        let alert = gate.evaluate(&result(98.0), 100.0).unwrap();
        assert!(alert.deviation_pct < 0.0);
    }

    #[test]
    fn test_duplicate_is_suppressed() {
        let gate = AlertGate::new(0.5);
        assert!(gate.evaluate(&result(101.0), 100.0).is_some());
        assert!(gate.evaluate(&result(101.0), 100.0).is_none());
    }

    #[test]
    fn test_new_prediction_fires_again() {
        let gate = AlertGate::new(0.5);
        assert!(gate.evaluate(&result(101.0), 100.0).is_some());
        assert!(gate.evaluate(&result(102.0), 100.0).is_some());
    }

    #[test]
    fn test_zero_close_never_fires() {
        let gate = AlertGate::new(0.5);
        assert!(gate.evaluate(&result(101.0), 0.0).is_none());
    }

    #[test]
    fn test_prediction_id_is_stable() {
        assert_eq!(prediction_id(&result(101.0)), prediction_id(&result(101.0)));
        assert_ne!(prediction_id(&result(101.0)), prediction_id(&result(102.0)));
    }
}
