//! Ensemble methods module
//!
//! Two-level stacking:
//! - Named base learners producing positive-class probabilities
//! - Out-of-fold stacking with stratified folds
//! - A random-forest meta-learner over the stacked probabilities
//! - Threshold decision into Pass/Fail

mod learners;
mod meta;
mod stacking;
mod threshold;

pub use learners::{BaseLearnerEnsemble, FittedLearner, LearnerConfig, LearnerFactory, NamedLearner};
pub use meta::{MetaClassifier, MetaConfig};
pub use stacking::{stack_features, OofStacker, StackOutput, StackingConfig};
pub use threshold::{ThresholdDecider, Verdict, DEFAULT_THRESHOLD};
