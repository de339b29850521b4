//! Model bank: read-and-infer access to the serialized estimators.
//!
//! Artifacts are JSON files named `{kind}_v{N}.json` under
//! `<root>/<symbol>/`; the bank resolves the highest version per kind, loads
//! it once, and serves it for the process lifetime. There is no training
//! in-process and no reload without explicit invalidation.

use crate::domain::errors::ModelError;
use crate::domain::features::FeatureVector;
use crate::domain::prediction::{
    ModelKind, ModelOutput, RegimeOutput, TrendLabel, TrendOutput, VolatilityRegime,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smartcore::cluster::kmeans::KMeans;
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub type Regressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type Classifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;
pub type Clusterer = KMeans<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Serialized estimator, tagged by kind.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum Estimator {
    Regression(Box<Regressor>),
    Classification(Box<Classifier>),
    Clustering(Box<Clusterer>),
}

impl Estimator {
    pub fn kind(&self) -> ModelKind {
        match self {
            Estimator::Regression(_) => ModelKind::Regression,
            Estimator::Classification(_) => ModelKind::Classification,
            Estimator::Clustering(_) => ModelKind::Clustering,
        }
    }
}

/// On-disk artifact layout: training metadata envelope + the estimator.
#[derive(Serialize, Deserialize)]
pub struct ArtifactFile {
    pub version: String,
    /// Exact trained feature list; order defines the input-matrix columns.
    pub features: Vec<String>,
    #[serde(default)]
    pub trained_from: Option<NaiveDate>,
    #[serde(default)]
    pub trained_through: Option<NaiveDate>,
    /// Accuracy recorded by the training run (classification only).
    #[serde(default)]
    pub validation_accuracy: Option<f64>,
    /// Cluster-id -> regime table fixed at training time (clustering only).
    #[serde(default)]
    pub regime_table: Option<Vec<VolatilityRegime>>,
    pub estimator: Estimator,
}

impl ArtifactFile {
    /// Writes the artifact as pretty JSON. Used by training export tooling
    /// and tests; the bank itself never writes.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        let file = File::create(path)
            .with_context(|| format!("cannot create artifact file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .context("cannot serialize artifact")?;
        Ok(())
    }
}

/// A loaded, immutable estimator plus its training metadata.
pub struct ModelArtifact {
    kind: ModelKind,
    version: String,
    features: Vec<String>,
    trained_from: Option<NaiveDate>,
    trained_through: Option<NaiveDate>,
    validation_accuracy: Option<f64>,
    regime_table: Option<Vec<VolatilityRegime>>,
    estimator: Estimator,
    path: String,
}

// The smartcore estimators carry no Debug impl, so only the metadata is shown.
impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("features", &self.features)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ModelArtifact {
    pub fn load(kind: ModelKind, path: &Path) -> Result<Self, ModelError> {
        let corrupt = |reason: String| ModelError::ArtifactCorrupt {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| corrupt(format!("cannot open: {}", e)))?;
        let raw: ArtifactFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| corrupt(format!("cannot deserialize: {}", e)))?;

        if raw.estimator.kind() != kind {
            return Err(corrupt(format!(
                "declares {} estimator, expected {}",
                raw.estimator.kind(),
                kind
            )));
        }
        if raw.features.is_empty() {
            return Err(corrupt("empty trained feature list".to_string()));
        }
        let unique: BTreeSet<&String> = raw.features.iter().collect();
        if unique.len() != raw.features.len() {
            return Err(corrupt("duplicate names in trained feature list".to_string()));
        }
        if kind == ModelKind::Clustering
            && raw.regime_table.as_ref().is_none_or(|t| t.is_empty())
        {
            return Err(corrupt(
                "clustering artifact must ship a cluster-to-regime table".to_string(),
            ));
        }

        Ok(Self {
            kind,
            version: raw.version,
            features: raw.features,
            trained_from: raw.trained_from,
            trained_through: raw.trained_through,
            validation_accuracy: raw.validation_accuracy,
            regime_table: raw.regime_table,
            estimator: raw.estimator,
            path: path.display().to_string(),
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn trained_window(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.trained_from, self.trained_through)
    }

    /// Runs the estimator on one feature vector.
    ///
    /// The vector's key set must equal the trained feature list exactly
    /// (order-independent); the stored feature order defines column layout.
    /// Repeated calls with identical inputs return identical output.
    pub fn predict(&self, vector: &FeatureVector) -> Result<ModelOutput, ModelError> {
        self.check_features(vector)?;

        let row: Vec<f64> = self
            .features
            .iter()
            .map(|name| vector.value(name).unwrap_or(f64::NAN))
            .collect();
        let matrix = DenseMatrix::from_2d_vec(&vec![row]).map_err(|e| ModelError::Inference {
            reason: format!("matrix creation failed: {}", e),
        })?;

        let inference = |e: smartcore::error::Failed| ModelError::Inference {
            reason: e.to_string(),
        };
        let corrupt = |reason: String| ModelError::ArtifactCorrupt {
            path: self.path.clone(),
            reason,
        };

        match &self.estimator {
            Estimator::Regression(model) => {
                let predictions = model.predict(&matrix).map_err(inference)?;
                let price = predictions.first().copied().ok_or_else(|| {
                    ModelError::Inference {
                        reason: "no prediction returned".to_string(),
                    }
                })?;
                Ok(ModelOutput::Price(price))
            }
            Estimator::Classification(model) => {
                let predictions = model.predict(&matrix).map_err(inference)?;
                let class_id = predictions.first().copied().ok_or_else(|| {
                    ModelError::Inference {
                        reason: "no prediction returned".to_string(),
                    }
                })?;
                let label = TrendLabel::from_class_id(class_id)
                    .ok_or_else(|| corrupt(format!("class id {} outside label table", class_id)))?;
                Ok(ModelOutput::Trend(TrendOutput {
                    label,
                    // smartcore's forest exposes labels only
                    probabilities: None,
                    validation_accuracy: self.validation_accuracy,
                }))
            }
            Estimator::Clustering(model) => {
                let predictions = model.predict(&matrix).map_err(inference)?;
                let cluster_id = predictions.first().copied().ok_or_else(|| {
                    ModelError::Inference {
                        reason: "no prediction returned".to_string(),
                    }
                })?;
                let table = self
                    .regime_table
                    .as_ref()
                    .ok_or_else(|| corrupt("regime table missing".to_string()))?;
                let regime = table.get(cluster_id as usize).copied().ok_or_else(|| {
                    corrupt(format!(
                        "cluster id {} outside regime table of {} entries",
                        cluster_id,
                        table.len()
                    ))
                })?;
                Ok(ModelOutput::Regime(RegimeOutput { cluster_id, regime }))
            }
        }
    }

    fn check_features(&self, vector: &FeatureVector) -> Result<(), ModelError> {
        let trained: BTreeSet<&str> = self.features.iter().map(|s| s.as_str()).collect();
        let supplied = vector.name_set();

        if trained == supplied {
            return Ok(());
        }
        let missing = trained
            .difference(&supplied)
            .map(|s| s.to_string())
            .collect();
        let unexpected = supplied
            .difference(&trained)
            .map(|s| s.to_string())
            .collect();
        Err(ModelError::FeatureMismatch {
            missing,
            unexpected,
        })
    }
}

/// Versioned-filename resolution: highest `{kind}_v{N}.json` wins.
fn resolve_latest(dir: &Path, kind: ModelKind) -> Result<PathBuf, ModelError> {
    let missing = || ModelError::ArtifactMissing {
        kind: kind.as_str().to_string(),
        dir: dir.display().to_string(),
    };

    let entries = std::fs::read_dir(dir).map_err(|_| missing())?;
    let prefix = format!("{}_v", kind.as_str());
    let mut best: Option<(u32, PathBuf)> = None;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(rest) = name.strip_prefix(&prefix)
            && let Some(num) = rest.strip_suffix(".json")
            && let Ok(version) = num.parse::<u32>()
            && best.as_ref().is_none_or(|(b, _)| version > *b)
        {
            best = Some((version, entry.path()));
        }
    }
    best.map(|(_, path)| path).ok_or_else(missing)
}

/// Read-only registry of loaded artifacts, keyed by (symbol, kind).
///
/// Append-only per distinct key; safe for concurrent readers. A failed load
/// never disturbs entries already cached.
pub struct ModelBank {
    root: PathBuf,
    cache: RwLock<HashMap<(String, ModelKind), Arc<ModelArtifact>>>,
}

impl ModelBank {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached artifact for (symbol, kind), loading it on first use.
    pub fn load(&self, symbol: &str, kind: ModelKind) -> Result<Arc<ModelArtifact>, ModelError> {
        let key = (symbol.to_string(), kind);
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(artifact) = cache.get(&key) {
                return Ok(artifact.clone());
            }
        }

        let dir = self.root.join(symbol);
        let path = resolve_latest(&dir, kind)?;
        let artifact = Arc::new(ModelArtifact::load(kind, &path)?);
        info!(
            "ModelBank: loaded {} artifact {} for {} from {}",
            kind,
            artifact.version(),
            symbol,
            path.display()
        );

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        Ok(cache.entry(key).or_insert(artifact).clone())
    }

    /// Thin dispatch kept for callers holding the bank rather than artifacts.
    pub fn predict(
        &self,
        artifact: &ModelArtifact,
        vector: &FeatureVector,
    ) -> Result<ModelOutput, ModelError> {
        artifact.predict(vector)
    }

    /// Drops the cached entry so the next `load` re-reads the filesystem.
    pub fn invalidate(&self, symbol: &str, kind: ModelKind) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if cache.remove(&(symbol.to_string(), kind)).is_some() {
            warn!("ModelBank: invalidated {} artifact for {}", kind, symbol);
        }
    }
}
