//! Stackfold - out-of-fold stacking for binary pass/fail inspection
//!
//! This crate trains a two-level stacked ensemble on tabular sensor records
//! and decides pass or fail for new records against a configurable threshold.
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Dynamic records, CSV loading, timestamps and date ranges
//! - [`preprocessing`] - Feature selection, sentinel filling, class balancing
//!
//! ## Models
//! - [`training`] - Base learners (XGBoost, LightGBM, CatBoost), trees and folds
//! - [`ensemble`] - Out-of-fold stacking, meta-learner, threshold decision
//!
//! ## Services
//! - [`pipeline`] - Train, predict and simulate over one live training run
//! - [`cli`] - Command-line interface

pub mod error;

pub mod dataset;
pub mod preprocessing;

pub mod ensemble;
pub mod training;

pub mod cli;
pub mod pipeline;

pub use error::{Result, StackfoldError};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{Result, StackfoldError};

    pub use crate::dataset::{
        annotate_timestamps, DataLoader, DatasetMetadata, DateRanges, Period, RangeReport, Record,
    };

    pub use crate::preprocessing::{
        BalanceConfig, ClassBalancer, FeaturePreparer, FeatureSet, PreparerConfig, RowId,
    };

    pub use crate::training::{
        CatBoostClassifier, Classifier, DecisionTree, LightGBMClassifier, ModelMetrics,
        RandomForest, StratifiedKFold, XGBoostClassifier,
    };

    pub use crate::ensemble::{
        BaseLearnerEnsemble, LearnerConfig, MetaClassifier, MetaConfig, OofStacker,
        StackingConfig, ThresholdDecider, Verdict,
    };

    pub use crate::pipeline::{
        PipelineConfig, Prediction, RunStatus, SimulationReport, TrainingOrchestrator,
        TrainingResult,
    };
}
