//! Meta-learner over stacked base-learner probabilities

use crate::error::Result;
use crate::training::{Classifier, RandomForest};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            seed: 42,
        }
    }
}

/// Random forest fit on the out-of-fold matrix
#[derive(Debug, Clone)]
pub struct MetaClassifier {
    forest: RandomForest,
    fitted: bool,
}

impl Default for MetaClassifier {
    fn default() -> Self {
        Self::new(&MetaConfig::default())
    }
}

impl MetaClassifier {
    pub fn new(config: &MetaConfig) -> Self {
        let mut forest = RandomForest::new(config.n_estimators).with_random_state(config.seed);
        if let Some(depth) = config.max_depth {
            forest = forest.with_max_depth(depth);
        }
        Self { forest, fitted: false }
    }

    pub fn fit(&mut self, oof: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.forest.fit(oof, y)?;
        self.fitted = true;
        info!(rows = oof.nrows(), inputs = oof.ncols(), trees = self.forest.n_trees(), "Meta-learner fitted");
        Ok(())
    }

    /// Probability of the positive class per stacked row
    pub fn predict_proba(&self, stacked: &Array2<f64>) -> Result<Array1<f64>> {
        self.forest.predict_proba(stacked)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }
}
