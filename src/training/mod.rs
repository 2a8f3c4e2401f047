//! Model training module
//!
//! Binary classifiers used by the stacking ensemble:
//! - XGBoost, LightGBM and CatBoost style gradient boosting
//! - Decision trees and Random Forests
//! - Stratified K-fold splitting and classification metrics

mod models;
pub mod catboost;
pub mod cross_validation;
pub mod decision_tree;
pub mod lightgbm;
pub mod random_forest;
pub mod xgboost;

pub use catboost::{CatBoostClassifier, CatBoostConfig};
pub use cross_validation::{CVSplit, StratifiedKFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use lightgbm::{LightGBMClassifier, LightGBMConfig};
pub use models::{Classifier, ModelMetrics};
pub use random_forest::{MaxFeatures, RandomForest};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
