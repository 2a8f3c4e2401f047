//! End-to-end training pipeline
//!
//! The orchestrator composes preparation, stacking, the meta-learner and the
//! threshold decision, and holds the one live training run that every
//! prediction reads.

mod config;
mod orchestrator;
mod results;
mod run;

pub use config::PipelineConfig;
pub use orchestrator::TrainingOrchestrator;
pub use results::{
    confidence_percent, Prediction, RunStatus, SimulationReport, SimulationStats, TrainingResult,
};
pub use run::TrainingRun;
