use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three estimator families the bank serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Regression,
    Classification,
    Clustering,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Regression => "regression",
            ModelKind::Classification => "classification",
            ModelKind::Clustering => "clustering",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Next-session direction predicted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Up,
    Down,
    Flat,
}

impl TrendLabel {
    /// Class-id table fixed at training time: 0 = down, 1 = up, 2 = flat.
    pub fn from_class_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(TrendLabel::Down),
            1 => Some(TrendLabel::Up),
            2 => Some(TrendLabel::Flat),
            _ => None,
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendLabel::Up => write!(f, "UP"),
            TrendLabel::Down => write!(f, "DOWN"),
            TrendLabel::Flat => write!(f, "FLAT"),
        }
    }
}

/// Discrete volatility category produced by clustering. Ordinal: Low < Medium
/// < High. The cluster-id-to-regime table is established at training time and
/// shipped inside the clustering artifact, never inferred at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityRegime {
    Low,
    Medium,
    High,
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityRegime::Low => write!(f, "Low"),
            VolatilityRegime::Medium => write!(f, "Medium"),
            VolatilityRegime::High => write!(f, "High"),
        }
    }
}

/// Classifier output: the label plus whatever confidence material the
/// artifact can supply (class probabilities if the estimator exposes them,
/// otherwise the validation accuracy recorded at training time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendOutput {
    pub label: TrendLabel,
    pub probabilities: Option<Vec<f64>>,
    pub validation_accuracy: Option<f64>,
}

/// Clusterer output: raw cluster id and its regime per the artifact's table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeOutput {
    pub cluster_id: u32,
    pub regime: VolatilityRegime,
}

/// Typed output of one predict call, tagged by the artifact's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelOutput {
    Price(f64),
    Trend(TrendOutput),
    Regime(RegimeOutput),
}

/// The one user-facing result of a pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    /// Bar date the feature vector was computed at; the prediction refers to
    /// the following session.
    pub as_of: NaiveDate,
    pub price_target: f64,
    pub trend_label: TrendLabel,
    pub volatility_regime: VolatilityRegime,
    /// Heuristic confidence in [0, 1].
    pub confidence: f64,
}
