use crate::domain::errors::FeatureError;
use serde::{Deserialize, Serialize};

/// Named technical-indicator definition.
///
/// Output names MUST match exactly the feature lists the models were trained
/// with. Any rename here is a breaking change for persisted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "indicator", rename_all = "snake_case")]
pub enum IndicatorSpec {
    /// Simple moving average of closes over `window` bars.
    Sma { window: usize },
    /// Relative strength index over `window` deltas.
    Rsi { window: usize },
    /// MACD line and signal line. Emits two features.
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// One-bar log return, ln(c_t / c_{t-1}).
    LogReturn,
    /// One-bar percentage return.
    PctReturn,
    /// Rolling standard deviation of log returns over `window` bars.
    Volatility { window: usize },
    /// Z-score of the close within a rolling `window`.
    PriceZscore { window: usize },
}

impl IndicatorSpec {
    /// Feature names this spec contributes to a vector.
    pub fn output_names(&self) -> Vec<String> {
        match self {
            IndicatorSpec::Sma { window } => vec![format!("sma_{}", window)],
            IndicatorSpec::Rsi { .. } => vec!["rsi".to_string()],
            IndicatorSpec::Macd { .. } => {
                vec!["macd".to_string(), "macd_signal".to_string()]
            }
            IndicatorSpec::LogReturn => vec!["log_return".to_string()],
            IndicatorSpec::PctReturn => vec!["pct_return".to_string()],
            IndicatorSpec::Volatility { window } => vec![format!("volatility_{}", window)],
            IndicatorSpec::PriceZscore { .. } => vec!["price_zscore".to_string()],
        }
    }

    /// Primary name used in error reporting.
    pub fn name(&self) -> String {
        self.output_names().remove(0)
    }

    /// Minimum number of bars a series must contain before this indicator
    /// produces its first trustworthy value. Bars before that point are
    /// dropped from the feature sequence, never zero-filled.
    pub fn min_history(&self) -> usize {
        match self {
            IndicatorSpec::Sma { window } => *window,
            // RSI needs `window` deltas, so window + 1 bars.
            IndicatorSpec::Rsi { window } => *window + 1,
            // EWM emits values from the first bar; hold back until the slow
            // EMA and the signal line have both seen a full period.
            IndicatorSpec::Macd { slow, signal, .. } => *slow + *signal - 1,
            IndicatorSpec::LogReturn | IndicatorSpec::PctReturn => 2,
            IndicatorSpec::Volatility { window } => *window + 1,
            IndicatorSpec::PriceZscore { window } => *window,
        }
    }

    /// Rejects degenerate window configuration before any series is touched.
    pub fn validate(&self) -> Result<(), FeatureError> {
        let fail = |reason: &str| {
            Err(FeatureError::InvalidIndicator {
                name: self.name(),
                reason: reason.to_string(),
            })
        };

        match self {
            IndicatorSpec::Sma { window }
            | IndicatorSpec::Rsi { window }
            | IndicatorSpec::Volatility { window }
            | IndicatorSpec::PriceZscore { window } => {
                if *window == 0 {
                    return fail("window must be positive");
                }
            }
            IndicatorSpec::Macd { fast, slow, signal } => {
                if *fast == 0 || *slow == 0 || *signal == 0 {
                    return fail("all periods must be positive");
                }
                if fast >= slow {
                    return fail("fast period must be shorter than slow period");
                }
            }
            IndicatorSpec::LogReturn | IndicatorSpec::PctReturn => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_follow_window() {
        assert_eq!(IndicatorSpec::Sma { window: 20 }.output_names(), ["sma_20"]);
        assert_eq!(
            IndicatorSpec::Volatility { window: 20 }.output_names(),
            ["volatility_20"]
        );
    }

    #[test]
    fn test_macd_emits_two_features() {
        let names = IndicatorSpec::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        }
        .output_names();
        assert_eq!(names, ["macd", "macd_signal"]);
    }

    #[test]
    fn test_min_history() {
        assert_eq!(IndicatorSpec::Sma { window: 20 }.min_history(), 20);
        assert_eq!(IndicatorSpec::Rsi { window: 14 }.min_history(), 15);
        assert_eq!(IndicatorSpec::LogReturn.min_history(), 2);
        assert_eq!(
            IndicatorSpec::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .min_history(),
            34
        );
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        assert!(IndicatorSpec::Sma { window: 0 }.validate().is_err());
        assert!(IndicatorSpec::Sma { window: 1 }.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_macd() {
        let spec = IndicatorSpec::Macd {
            fast: 26,
            slow: 12,
            signal: 9,
        };
        assert!(spec.validate().is_err());
    }
}
