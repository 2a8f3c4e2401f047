//! Preprocessing configuration

use serde::{Deserialize, Serialize};

/// Configuration for feature preparation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparerConfig {
    /// Target column name, matched case-insensitively
    pub target_column: String,

    /// Columns whose missing fraction exceeds this are dropped
    pub missing_threshold: f64,

    /// Value written into every missing or non-numeric cell
    pub sentinel: f64,

    /// Timestamp column carried through for reporting, never a feature
    pub timestamp_column: String,

    /// Sample identifier column, never a feature
    pub id_column: String,

    /// Additional columns never used as features
    pub excluded_columns: Vec<String>,
}

impl Default for PreparerConfig {
    fn default() -> Self {
        Self {
            target_column: "response".to_string(),
            missing_threshold: 0.7,
            sentinel: -999.0,
            timestamp_column: "synthetic_timestamp".to_string(),
            id_column: "Id".to_string(),
            excluded_columns: Vec::new(),
        }
    }
}

impl PreparerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the target column
    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    /// Builder method to set the missing-fraction cutoff
    pub fn with_missing_threshold(mut self, threshold: f64) -> Self {
        self.missing_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set the sentinel value
    pub fn with_sentinel(mut self, sentinel: f64) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Builder method to exclude an extra column
    pub fn with_excluded_column(mut self, name: impl Into<String>) -> Self {
        self.excluded_columns.push(name.into());
        self
    }

    /// Whether `name` can never be a feature column
    pub fn is_excluded(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        name.eq_ignore_ascii_case(&self.target_column)
            || name.eq_ignore_ascii_case(&self.timestamp_column)
            || name.eq_ignore_ascii_case(&self.id_column)
            || lower == "timestamp"
            || lower.ends_with("_timestamp")
            || self
                .excluded_columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Configuration for class balancing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Seed for sampling and the final shuffle
    pub seed: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreparerConfig::default();
        assert_eq!(config.missing_threshold, 0.7);
        assert_eq!(config.sentinel, -999.0);
    }

    #[test]
    fn test_exclusions() {
        let config = PreparerConfig::new().with_excluded_column("batch");
        assert!(config.is_excluded("Response"));
        assert!(config.is_excluded("synthetic_timestamp"));
        assert!(config.is_excluded("Event_Timestamp"));
        assert!(config.is_excluded("id"));
        assert!(config.is_excluded("BATCH"));
        assert!(!config.is_excluded("Sensor_A"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = PreparerConfig::new()
            .with_missing_threshold(1.5)
            .with_sentinel(-1.0);
        assert_eq!(config.missing_threshold, 1.0);
        assert_eq!(config.sentinel, -1.0);
    }
}
