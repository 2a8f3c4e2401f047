//! Out-of-fold stacking over the base learners

use super::learners::{BaseLearnerEnsemble, FittedLearner, NamedLearner};
use crate::error::{Result, StackfoldError};
use crate::training::{CVSplit, StratifiedKFold};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for stacking ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    /// Number of cross-validation folds
    pub n_folds: usize,
    /// Seed for fold assignment
    pub seed: u64,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self { n_folds: 5, seed: 42 }
    }
}

impl StackingConfig {
    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Result of stacking one training set
#[derive(Debug)]
pub struct StackOutput {
    /// `n_train × n_learners` held-out probabilities
    pub oof: Array2<f64>,
    /// `n_test × n_learners` fold-averaged probabilities
    pub stacked_test: Array2<f64>,
    /// Learners refit on the whole training set, in ensemble order
    pub learners: Vec<FittedLearner>,
}

/// One learner's contribution before assembly
struct LearnerColumns {
    oof: Array1<f64>,
    test: Array1<f64>,
    fitted: FittedLearner,
}

/// Produces the out-of-fold matrix that trains the meta-learner
#[derive(Debug, Clone, Default)]
pub struct OofStacker {
    config: StackingConfig,
}

impl OofStacker {
    pub fn new(config: StackingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StackingConfig {
        &self.config
    }

    /// Build OOF and fold-averaged test matrices for every learner.
    ///
    /// Each training row's OOF value comes from the one fit that did not see
    /// it. Folds are validated before any fitting starts.
    pub fn stack(
        &self,
        ensemble: &BaseLearnerEnsemble,
        x: &Array2<f64>,
        y: &Array1<f64>,
        x_test: &Array2<f64>,
    ) -> Result<StackOutput> {
        if ensemble.is_empty() {
            return Err(StackfoldError::ValidationError(
                "No base models provided".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(StackfoldError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x_test.ncols() != x.ncols() {
            return Err(StackfoldError::ShapeError {
                expected: format!("{} test features", x.ncols()),
                actual: format!("{} test features", x_test.ncols()),
            });
        }

        let splits = StratifiedKFold::new(self.config.n_folds)
            .with_random_state(self.config.seed)
            .split(y)?;

        info!(
            rows = x.nrows(),
            test_rows = x_test.nrows(),
            learners = ensemble.len(),
            folds = splits.len(),
            "Stacking base learners"
        );

        let columns = ensemble
            .learners()
            .par_iter()
            .map(|learner| self.stack_learner(learner, x, y, x_test, &splits))
            .collect::<Result<Vec<_>>>()?;

        let n_learners = columns.len();
        let mut oof = Array2::zeros((x.nrows(), n_learners));
        let mut stacked_test = Array2::zeros((x_test.nrows(), n_learners));
        let mut learners = Vec::with_capacity(n_learners);
        for (j, column) in columns.into_iter().enumerate() {
            oof.column_mut(j).assign(&column.oof);
            stacked_test.column_mut(j).assign(&column.test);
            learners.push(column.fitted);
        }

        Ok(StackOutput {
            oof,
            stacked_test,
            learners,
        })
    }

    fn stack_learner(
        &self,
        learner: &NamedLearner,
        x: &Array2<f64>,
        y: &Array1<f64>,
        x_test: &Array2<f64>,
        splits: &[CVSplit],
    ) -> Result<LearnerColumns> {
        let k = splits.len() as f64;
        let mut oof = Array1::zeros(x.nrows());
        let mut test = Array1::zeros(x_test.nrows());

        for split in splits {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_val = x.select(Axis(0), &split.test_indices);

            let mut model = learner.build();
            model.fit(&x_train, &y_train)?;

            let val_proba = model.predict_proba(&x_val)?;
            for (&row, &p) in split.test_indices.iter().zip(val_proba.iter()) {
                oof[row] = p;
            }

            test.scaled_add(1.0 / k, &model.predict_proba(x_test)?);
            debug!(learner = learner.name(), fold = split.fold_idx, "Fold fitted");
        }

        let mut production = learner.build();
        production.fit(x, y)?;
        debug!(learner = learner.name(), "Production learner refit on full training set");

        Ok(LearnerColumns {
            oof,
            test,
            fitted: FittedLearner {
                name: learner.name().to_string(),
                model: production,
            },
        })
    }
}

/// Stack the production learners' probabilities column by column
pub fn stack_features(learners: &[FittedLearner], x: &Array2<f64>) -> Result<Array2<f64>> {
    let columns = learners
        .par_iter()
        .map(|learner| learner.model.predict_proba(x))
        .collect::<Result<Vec<_>>>()?;

    let mut stacked = Array2::zeros((x.nrows(), learners.len()));
    for (j, column) in columns.iter().enumerate() {
        stacked.column_mut(j).assign(column);
    }
    Ok(stacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::DecisionTree;

    fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(n, |i| if i >= n / 2 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn tree_ensemble() -> BaseLearnerEnsemble {
        BaseLearnerEnsemble::new()
            .with_learner("stump", || Box::new(DecisionTree::new().with_max_depth(1)))
            .with_learner("tree", || Box::new(DecisionTree::new()))
    }

    #[test]
    fn test_stack_shapes() {
        let (x, y) = data(20);
        let x_test = x.slice(ndarray::s![..7, ..]).to_owned();
        let out = OofStacker::default().stack(&tree_ensemble(), &x, &y, &x_test).unwrap();

        assert_eq!(out.oof.dim(), (20, 2));
        assert_eq!(out.stacked_test.dim(), (7, 2));
        assert_eq!(out.learners.len(), 2);
        assert_eq!(out.learners[0].name, "stump");
        assert!(out.oof.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_stack_is_deterministic() {
        let (x, y) = data(30);
        let a = OofStacker::default().stack(&tree_ensemble(), &x, &y, &x).unwrap();
        let b = OofStacker::default().stack(&tree_ensemble(), &x, &y, &x).unwrap();
        assert_eq!(a.oof, b.oof);
        assert_eq!(a.stacked_test, b.stacked_test);
    }

    #[test]
    fn test_degenerate_folds_propagate() {
        let (x, mut y) = data(20);
        y.fill(0.0);
        y[0] = 1.0;
        assert!(matches!(
            OofStacker::default().stack(&tree_ensemble(), &x, &y, &x),
            Err(StackfoldError::DegenerateFolds { .. })
        ));
    }

    #[test]
    fn test_production_stack_matches_learner_order() {
        let (x, y) = data(20);
        let out = OofStacker::default().stack(&tree_ensemble(), &x, &y, &x).unwrap();
        let stacked = stack_features(&out.learners, &x).unwrap();
        assert_eq!(stacked.dim(), (20, 2));
        assert_eq!(stacked.column(1).to_owned(), out.learners[1].model.predict_proba(&x).unwrap());
    }
}
