//! Stratified fold assignment for out-of-fold stacking

use crate::error::{Result, StackfoldError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Seeded stratified K-fold splitter
///
/// Every row lands in exactly one validation fold, and each fold keeps the
/// class ratio of the whole set as closely as integer counts allow.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: u64,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self::new(5)
    }
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate stratified train/validation splits over `y`.
    ///
    /// Fails when there are fewer than two folds, fewer than two classes, or
    /// any class has fewer members than there are folds.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(StackfoldError::ValidationError(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }

        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if class_indices.len() < 2 {
            let absent = if class_indices.contains_key(&0) { 1 } else { 0 };
            return Err(StackfoldError::DegenerateFolds {
                class: absent,
                count: 0,
                n_folds: self.n_splits,
            });
        }
        for (&class, indices) in &class_indices {
            if indices.len() < self.n_splits {
                return Err(StackfoldError::DegenerateFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_splits,
                });
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        if self.shuffle {
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Round-robin per class, continuing the fold cursor across classes so
        // remainders do not all pile into the first folds
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut cursor = 0usize;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[cursor % self.n_splits].push(idx);
                cursor += 1;
            }
        }

        let splits = (0..self.n_splits)
            .map(|fold_idx| {
                let mut test_indices = folds[fold_idx].clone();
                test_indices.sort_unstable();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}
