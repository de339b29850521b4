//! Feature processing: turns a validated `PriceSeries` into the sequence of
//! `FeatureVector`s eligible for inference.
//!
//! No lookahead: the vector at bar `i` is computed from bars `0..=i` only.
//! Bars that lack the full trailing window of the largest requested indicator
//! are dropped, not zero-filled. Identical (series, indicator set) inputs
//! always produce bit-identical output: indicator state is rebuilt from
//! scratch on every call.

use crate::application::statistics;
use crate::domain::errors::FeatureError;
use crate::domain::features::{FeatureVector, IndicatorSpec};
use crate::domain::market::PriceSeries;
use ta::Next;
use ta::indicators::{
    MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};
use tracing::debug;

#[derive(Debug)]
pub struct FeatureProcessor {
    specs: Vec<IndicatorSpec>,
}

impl FeatureProcessor {
    pub fn new(specs: Vec<IndicatorSpec>) -> Result<Self, FeatureError> {
        if specs.is_empty() {
            return Err(FeatureError::InvalidIndicator {
                name: "<none>".to_string(),
                reason: "at least one indicator is required".to_string(),
            });
        }
        let mut seen = std::collections::BTreeSet::new();
        for spec in &specs {
            spec.validate()?;
            for name in spec.output_names() {
                // Duplicate names would silently collapse into one vector key.
                if !seen.insert(name.clone()) {
                    return Err(FeatureError::InvalidIndicator {
                        name,
                        reason: "duplicate feature name in indicator set".to_string(),
                    });
                }
            }
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    /// Largest warm-up any configured indicator needs.
    pub fn min_history(&self) -> usize {
        self.specs
            .iter()
            .map(|s| s.min_history())
            .max()
            .unwrap_or(0)
    }

    /// All feature names the configured set emits, in spec order.
    pub fn feature_names(&self) -> Vec<String> {
        self.specs.iter().flat_map(|s| s.output_names()).collect()
    }

    /// One `FeatureVector` per eligible bar, oldest first.
    pub fn compute(&self, series: &PriceSeries) -> Result<Vec<FeatureVector>, FeatureError> {
        let len = series.len();
        for spec in &self.specs {
            if len < spec.min_history() {
                return Err(FeatureError::InsufficientHistory {
                    indicator: spec.name(),
                    required: spec.min_history(),
                    actual: len,
                });
            }
        }

        let closes = series.closes_f64();
        let dates = series.dates();

        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
        for spec in &self.specs {
            for (name, column) in self.compute_columns(spec, &closes)? {
                columns.push((name, column));
            }
        }

        // First index where every configured indicator has a full window.
        let start = self.min_history() - 1;
        let mut vectors = Vec::with_capacity(len - start);
        for i in start..len {
            let mut vector = FeatureVector::new(dates[i]);
            for (name, column) in &columns {
                vector.insert(name.clone(), column[i]);
            }
            vectors.push(vector);
        }

        debug!(
            "FeatureProcessor: {} bars -> {} vectors ({} features each)",
            len,
            vectors.len(),
            columns.len()
        );
        Ok(vectors)
    }

    /// Full-length column(s) for one spec. Positions before the spec's own
    /// warm-up hold placeholder values; the shared eligibility cutoff in
    /// `compute` guarantees they are never emitted.
    fn compute_columns(
        &self,
        spec: &IndicatorSpec,
        closes: &[f64],
    ) -> Result<Vec<(String, Vec<f64>)>, FeatureError> {
        let invalid = |e: &dyn std::fmt::Debug| FeatureError::InvalidIndicator {
            name: spec.name(),
            reason: format!("{:?}", e),
        };

        match *spec {
            IndicatorSpec::Sma { window } => {
                let mut sma = SimpleMovingAverage::new(window).map_err(|e| invalid(&e))?;
                let column = closes.iter().map(|&c| sma.next(c)).collect();
                Ok(vec![(spec.name(), column)])
            }
            IndicatorSpec::Rsi { window } => {
                let mut rsi = RelativeStrengthIndex::new(window).map_err(|e| invalid(&e))?;
                let column = closes.iter().map(|&c| rsi.next(c)).collect();
                Ok(vec![(spec.name(), column)])
            }
            IndicatorSpec::Macd { fast, slow, signal } => {
                let mut macd = MovingAverageConvergenceDivergence::new(fast, slow, signal)
                    .map_err(|e| invalid(&e))?;
                let mut line = Vec::with_capacity(closes.len());
                let mut signal_line = Vec::with_capacity(closes.len());
                for &c in closes {
                    let out = macd.next(c);
                    line.push(out.macd);
                    signal_line.push(out.signal);
                }
                Ok(vec![
                    ("macd".to_string(), line),
                    ("macd_signal".to_string(), signal_line),
                ])
            }
            IndicatorSpec::LogReturn => {
                let mut column = vec![f64::NAN];
                column.extend(statistics::log_returns(closes));
                Ok(vec![(spec.name(), column)])
            }
            IndicatorSpec::PctReturn => {
                let mut column = vec![f64::NAN];
                column.extend(statistics::pct_returns(closes));
                Ok(vec![(spec.name(), column)])
            }
            IndicatorSpec::Volatility { window } => {
                // returns[j] belongs to bar j + 1
                let returns = statistics::log_returns(closes);
                let column = (0..closes.len())
                    .map(|i| {
                        if i == 0 {
                            f64::NAN
                        } else {
                            statistics::trailing_std(&returns, window, i - 1)
                                .unwrap_or(f64::NAN)
                        }
                    })
                    .collect();
                Ok(vec![(spec.name(), column)])
            }
            IndicatorSpec::PriceZscore { window } => {
                let column = (0..closes.len())
                    .map(|i| statistics::trailing_zscore(closes, window, i).unwrap_or(f64::NAN))
                    .collect();
                Ok(vec![(spec.name(), column)])
            }
        }
    }
}
