//! Named base learners for the stacking layer

use crate::training::{
    CatBoostClassifier, CatBoostConfig, Classifier, LightGBMClassifier, LightGBMConfig,
    XGBoostClassifier, XGBoostConfig,
};
use serde::{Deserialize, Serialize};

/// Builds a fresh, unfitted learner
pub type LearnerFactory = Box<dyn Fn() -> Box<dyn Classifier> + Send + Sync>;

/// Hyper-parameters for the default base learners
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub xgboost: XGBoostConfig,
    pub lightgbm: LightGBMConfig,
    pub catboost: CatBoostConfig,
}

impl LearnerConfig {
    /// Same seed for every learner
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.xgboost.random_state = seed;
        self.lightgbm.random_state = seed;
        self.catboost.random_state = seed;
        self
    }

    /// Same number of boosting rounds for every learner
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.xgboost.n_estimators = n_estimators;
        self.lightgbm.n_estimators = n_estimators;
        self.catboost.n_estimators = n_estimators;
        self
    }
}

/// A learner factory registered under a name
pub struct NamedLearner {
    name: String,
    factory: LearnerFactory,
}

impl NamedLearner {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self) -> Box<dyn Classifier> {
        (self.factory)()
    }
}

/// A fitted learner under its registered name
pub struct FittedLearner {
    pub name: String,
    pub model: Box<dyn Classifier>,
}

impl std::fmt::Debug for FittedLearner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedLearner").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Fixed, ordered set of named learner factories.
///
/// The order here is the column order of every stacked matrix.
pub struct BaseLearnerEnsemble {
    learners: Vec<NamedLearner>,
}

impl BaseLearnerEnsemble {
    /// Empty ensemble
    pub fn new() -> Self {
        Self { learners: Vec::new() }
    }

    /// The `xgb`, `lgbm` and `cat` learners
    pub fn from_config(config: &LearnerConfig) -> Self {
        let xgb = config.xgboost.clone();
        let lgbm = config.lightgbm.clone();
        let cat = config.catboost.clone();
        Self::new()
            .with_learner("xgb", move || Box::new(XGBoostClassifier::new(xgb.clone())))
            .with_learner("lgbm", move || Box::new(LightGBMClassifier::new(lgbm.clone())))
            .with_learner("cat", move || Box::new(CatBoostClassifier::new(cat.clone())))
    }

    /// Register a learner; a repeated name replaces the earlier factory in place
    pub fn with_learner<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Classifier> + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = NamedLearner {
            name: name.clone(),
            factory: Box::new(factory),
        };
        match self.learners.iter_mut().find(|l| l.name == name) {
            Some(existing) => *existing = entry,
            None => self.learners.push(entry),
        }
        self
    }

    pub fn learners(&self) -> &[NamedLearner] {
        &self.learners
    }

    pub fn names(&self) -> Vec<&str> {
        self.learners.iter().map(|l| l.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.learners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }
}

impl Default for BaseLearnerEnsemble {
    fn default() -> Self {
        Self::from_config(&LearnerConfig::default())
    }
}
