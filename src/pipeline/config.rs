//! Pipeline configuration

use crate::ensemble::{LearnerConfig, MetaConfig, StackingConfig, DEFAULT_THRESHOLD};
use crate::error::{Result, StackfoldError};
use crate::preprocessing::{BalanceConfig, PreparerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the orchestrator needs to train and predict
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preparer: PreparerConfig,
    pub balance: BalanceConfig,
    pub stacking: StackingConfig,
    pub learners: LearnerConfig,
    pub meta: MetaConfig,
    /// Threshold used before any train call sets one
    pub default_threshold: f64,
    /// Input fields echoed verbatim into each prediction
    pub passthrough_fields: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preparer: PreparerConfig::default(),
            balance: BalanceConfig::default(),
            stacking: StackingConfig::default(),
            learners: LearnerConfig::default(),
            meta: MetaConfig::default(),
            default_threshold: DEFAULT_THRESHOLD,
            passthrough_fields: vec![
                "temperature".to_string(),
                "pressure".to_string(),
                "humidity".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preparer(mut self, preparer: PreparerConfig) -> Self {
        self.preparer = preparer;
        self
    }

    pub fn with_stacking(mut self, stacking: StackingConfig) -> Self {
        self.stacking = stacking;
        self
    }

    pub fn with_learners(mut self, learners: LearnerConfig) -> Self {
        self.learners = learners;
        self
    }

    pub fn with_meta(mut self, meta: MetaConfig) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_passthrough_fields(mut self, fields: Vec<String>) -> Self {
        self.passthrough_fields = fields;
        self
    }

    /// Reject settings no train call could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.stacking.n_folds < 2 {
            return Err(StackfoldError::ConfigError(format!(
                "stacking.n_folds must be at least 2, got {}",
                self.stacking.n_folds
            )));
        }
        if self.meta.n_estimators == 0 {
            return Err(StackfoldError::ConfigError(
                "meta.n_estimators must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.preparer.missing_threshold) {
            return Err(StackfoldError::ConfigError(format!(
                "preparer.missing_threshold must be in [0, 1], got {}",
                self.preparer.missing_threshold
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_threshold, 0.7);
        assert_eq!(config.stacking.n_folds, 5);
        assert_eq!(config.meta.n_estimators, 100);
        assert_eq!(config.passthrough_fields, vec!["temperature", "pressure", "humidity"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"stacking": {"n_folds": 3}, "learners": {"xgboost": {"n_estimators": 5}}}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.stacking.n_folds, 3);
        assert_eq!(config.stacking.seed, 42);
        assert_eq!(config.learners.xgboost.n_estimators, 5);
        assert_eq!(config.learners.lightgbm.n_estimators, 100);
        assert_eq!(config.preparer.sentinel, -999.0);
    }

    #[test]
    fn test_invalid_folds_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"stacking": {"n_folds": 1}}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(StackfoldError::ConfigError(_))
        ));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");
        PipelineConfig::default().save(&path).unwrap();
        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.default_threshold, 0.7);
    }
}
