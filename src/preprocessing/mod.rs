//! Preprocessing module
//!
//! Turns raw training rows into model input:
//! - Target resolution and label extraction
//! - Optional majority-class downsampling
//! - Column retention by missingness and numeric type
//! - Sentinel imputation shared by training and prediction

mod balance;
mod config;
mod preparer;

pub use balance::ClassBalancer;
pub use config::{BalanceConfig, PreparerConfig};
pub use preparer::{
    ColumnDecision, FeaturePreparer, FeatureSet, LabelledRows, PreparedFrame, RowId,
};
