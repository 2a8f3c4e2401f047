//! CatBoost-style gradient boosting on symmetric (oblivious) trees
//!
//! Every node at a given depth shares one split feature and threshold, so a
//! tree of depth d is a list of d splits plus 2^d leaf values.

use super::models::{base_log_odds, check_fit_input, check_predict_input, sigmoid, Classifier};
use crate::error::{Result, StackfoldError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper bound on candidate thresholds evaluated per feature and level
const MAX_CANDIDATE_THRESHOLDS: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub subsample: f64,
    pub random_state: u64,
}

impl Default for CatBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            reg_lambda: 3.0,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymmetricTree {
    /// `(feature, threshold)` per level
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl SymmetricTree {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        let idx = self
            .splits
            .iter()
            .fold(0usize, |idx, &(feature, threshold)| idx * 2 + usize::from(sample[feature] > threshold));
        self.leaf_values[idx]
    }
}

fn build_symmetric_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    max_depth: usize,
    reg_lambda: f64,
) -> SymmetricTree {
    let n_features = x.ncols();
    let mut splits = Vec::with_capacity(max_depth);
    let mut buckets: Vec<Vec<usize>> = vec![indices.to_vec()];

    for _ in 0..max_depth {
        let best = (0..n_features)
            .into_par_iter()
            .filter_map(|feat| {
                let mut values: Vec<f64> = buckets
                    .iter()
                    .flat_map(|b| b.iter().map(|&i| x[[i, feat]]))
                    .collect();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                if values.len() < 2 {
                    return None;
                }

                let step = (values.len() / MAX_CANDIDATE_THRESHOLDS).max(1);
                let mut best: Option<(f64, f64)> = None;
                for i in (0..values.len() - 1).step_by(step) {
                    let thr = (values[i] + values[i + 1]) / 2.0;
                    let gain: f64 = buckets
                        .iter()
                        .map(|bucket| {
                            let (lg, lh, rg, rh) =
                                bucket.iter().fold((0.0, 0.0, 0.0, 0.0), |(lg, lh, rg, rh), &idx| {
                                    if x[[idx, feat]] <= thr {
                                        (lg + gradients[idx], lh + hessians[idx], rg, rh)
                                    } else {
                                        (lg, lh, rg + gradients[idx], rh + hessians[idx])
                                    }
                                });
                            let (pg, ph) = (lg + rg, lh + rh);
                            lg * lg / (lh + reg_lambda) + rg * rg / (rh + reg_lambda)
                                - pg * pg / (ph + reg_lambda)
                        })
                        .sum();
                    if best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, thr));
                    }
                }

                best.filter(|(g, _)| *g > 1e-12).map(|(g, thr)| (feat, thr, g))
            })
            .max_by(|a, b| a.2.total_cmp(&b.2).then_with(|| b.0.cmp(&a.0)));

        let Some((feat, thr, _)) = best else {
            break;
        };
        splits.push((feat, thr));
        buckets = buckets
            .iter()
            .flat_map(|bucket| {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    bucket.iter().partition(|&&i| x[[i, feat]] <= thr);
                [left, right]
            })
            .collect();
    }

    let leaf_values = buckets
        .iter()
        .map(|bucket| {
            let g: f64 = bucket.iter().map(|&i| gradients[i]).sum();
            let h: f64 = bucket.iter().map(|&i| hessians[i]).sum();
            if bucket.is_empty() { 0.0 } else { -g / (h + reg_lambda) }
        })
        .collect();

    SymmetricTree { splits, leaf_values }
}

/// CatBoost classifier (logistic loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostClassifier {
    pub config: CatBoostConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: usize,
}

impl CatBoostClassifier {
    pub fn new(config: CatBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
        }
    }

    fn predict_raw_row(&self, row: &ArrayView1<f64>) -> f64 {
        self.base_prediction
            + self
                .trees
                .iter()
                .map(|t| self.config.learning_rate * t.predict(row))
                .sum::<f64>()
    }
}

impl Classifier for CatBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.nrows();
        self.n_features = x.ncols();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.base_prediction = base_log_odds(y);
        let mut raw = Array1::from_elem(n, self.base_prediction);

        self.trees.clear();
        for _ in 0..self.config.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&r| sigmoid(r)).collect();
            let gradients: Vec<f64> = probs.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();
            let hessians: Vec<f64> = probs.iter().map(|&p| (p * (1.0 - p)).max(1e-16)).collect();

            let indices: Vec<usize> = if self.config.subsample < 1.0 {
                let k = ((n as f64 * self.config.subsample).ceil() as usize).max(1);
                let mut sub: Vec<usize> = (0..n).collect();
                sub.shuffle(&mut rng);
                sub.truncate(k);
                sub
            } else {
                (0..n).collect()
            };

            let tree = build_symmetric_tree(
                x,
                &gradients,
                &hessians,
                &indices,
                self.config.max_depth,
                self.config.reg_lambda,
            );

            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += self.config.learning_rate * tree.predict(&row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 {
            return Err(StackfoldError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| sigmoid(self.predict_raw_row(&row))).collect())
    }
}
