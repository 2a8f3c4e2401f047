//! LightGBM-style gradient boosting with leaf-wise tree growth
//!
//! - Leaf-wise (best-first) growth bounded by a leaf budget instead of level-wise
//! - Optional Gradient-based One-Side Sampling (GOSS): keeps the largest gradients,
//!   samples the rest and re-weights them

use super::models::{base_log_odds, check_fit_input, check_predict_input, sigmoid, Classifier};
use crate::error::{Result, StackfoldError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightGBMConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub use_goss: bool,
    pub top_rate: f64,
    pub other_rate: f64,
    pub random_state: u64,
}

impl Default for LightGBMConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            use_goss: false,
            top_rate: 0.2,
            other_rate: 0.1,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LGBNode {
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<LGBNode>,
        right: Box<LGBNode>,
    },
}

impl LGBNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                LGBNode::Leaf { value } => return *value,
                LGBNode::Split { feature, threshold, left, right } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn compute_leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g.abs() <= alpha { 0.0 } else { g - alpha * g.signum() };
    -g_adj / (h + lambda).max(1e-12)
}

fn compute_gain_single(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda).max(1e-12)
}

fn make_leaf(gradients: &[f64], hessians: &[f64], indices: &[usize], lambda: f64, alpha: f64) -> LGBNode {
    let g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    LGBNode::Leaf { value: compute_leaf_weight(g, h, lambda, alpha) }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

fn find_best_split_for_feature(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature: usize,
    config: &LightGBMConfig,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let total_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    let base_score = compute_gain_single(total_g, total_h, config.reg_lambda);
    let min_child = config.min_child_samples.max(1);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best: Option<(f64, f64, usize)> = None;

    for i in 0..sorted.len() - 1 {
        left_g += gradients[sorted[i].0];
        left_h += hessians[sorted[i].0];

        if i + 1 < min_child || sorted.len() - i - 1 < min_child {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }

        let gain = compute_gain_single(left_g, left_h, config.reg_lambda)
            + compute_gain_single(total_g - left_g, total_h - left_h, config.reg_lambda)
            - base_score;

        if best.map_or(true, |(g, _, _)| gain > g) {
            best = Some((gain, (sorted[i].1 + sorted[i + 1].1) / 2.0, i + 1));
        }
    }

    let (gain, threshold, pos) = best.filter(|(g, _, _)| *g > 0.0)?;
    Some(SplitCandidate {
        feature,
        threshold,
        gain,
        left_indices: sorted[..pos].iter().map(|&(i, _)| i).collect(),
        right_indices: sorted[pos..].iter().map(|&(i, _)| i).collect(),
    })
}

fn best_split(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    features: &[usize],
    config: &LightGBMConfig,
) -> Option<SplitCandidate> {
    features
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, gradients, hessians, indices, f, config))
        .max_by(|a, b| a.gain.total_cmp(&b.gain))
}

struct PendingSplit {
    node_id: usize,
    split: SplitCandidate,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for PendingSplit {}
impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties resolve to the earlier node so growth order is deterministic
        self.split
            .gain
            .total_cmp(&other.split.gain)
            .then_with(|| other.node_id.cmp(&self.node_id))
    }
}

enum NodeSlot {
    Leaf(Vec<usize>),
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// Build a tree leaf-wise: always expand the pending leaf with the largest gain
fn build_lgb_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    config: &LightGBMConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> LGBNode {
    if indices.len() < config.min_child_samples * 2 || indices.len() < 2 {
        return make_leaf(gradients, hessians, indices, config.reg_lambda, config.reg_alpha);
    }

    let n_features = x.ncols();
    let n_selected = ((n_features as f64 * config.colsample_bytree).ceil() as usize).clamp(1, n_features);
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(n_selected);

    let max_depth = config.max_depth.unwrap_or(usize::MAX);
    let mut nodes: Vec<NodeSlot> = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut depths: Vec<usize> = vec![0];
    let mut heap: BinaryHeap<PendingSplit> = BinaryHeap::new();

    if max_depth > 0 {
        if let Some(split) = best_split(x, gradients, hessians, indices, &features, config) {
            heap.push(PendingSplit { node_id: 0, split });
        }
    }

    let mut n_leaves = 1usize;
    while n_leaves < config.max_leaves {
        let Some(PendingSplit { node_id, split }) = heap.pop() else {
            break;
        };

        let depth = depths[node_id] + 1;
        let left_id = nodes.len();
        let right_id = left_id + 1;

        for (child_id, child_indices) in [(left_id, &split.left_indices), (right_id, &split.right_indices)] {
            if depth < max_depth && child_indices.len() >= config.min_child_samples * 2 {
                if let Some(child) = best_split(x, gradients, hessians, child_indices, &features, config) {
                    heap.push(PendingSplit { node_id: child_id, split: child });
                }
            }
        }

        nodes.push(NodeSlot::Leaf(split.left_indices));
        nodes.push(NodeSlot::Leaf(split.right_indices));
        depths.push(depth);
        depths.push(depth);
        nodes[node_id] = NodeSlot::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;
    }

    fn to_node(nodes: &[NodeSlot], idx: usize, g: &[f64], h: &[f64], config: &LightGBMConfig) -> LGBNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => make_leaf(g, h, indices, config.reg_lambda, config.reg_alpha),
            NodeSlot::Split { feature, threshold, left, right } => LGBNode::Split {
                feature: *feature,
                threshold: *threshold,
                left: Box::new(to_node(nodes, *left, g, h, config)),
                right: Box::new(to_node(nodes, *right, g, h, config)),
            },
        }
    }
    to_node(&nodes, 0, gradients, hessians, config)
}

/// GOSS row selection; returns indices and the weight applied to each sampled row
fn goss_sample(
    gradients: &[f64],
    top_rate: f64,
    other_rate: f64,
    rng: &mut Xoshiro256PlusPlus,
) -> (Vec<usize>, Vec<usize>, f64) {
    let n = gradients.len();
    let n_top = ((n as f64 * top_rate).ceil() as usize).min(n);
    let n_other = (n as f64 * other_rate).ceil() as usize;

    let mut sorted: Vec<usize> = (0..n).collect();
    sorted.sort_by(|&a, &b| gradients[b].abs().total_cmp(&gradients[a].abs()));

    let top = sorted[..n_top].to_vec();
    let mut rest = sorted[n_top..].to_vec();
    rest.shuffle(rng);
    rest.truncate(n_other);

    let amplify = if other_rate > 0.0 { (1.0 - top_rate) / other_rate } else { 1.0 };
    (top, rest, amplify)
}

/// LightGBM classifier (logistic loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMClassifier {
    pub config: LightGBMConfig,
    trees: Vec<LGBNode>,
    base_prediction: f64,
    n_features: usize,
}

impl LightGBMClassifier {
    pub fn new(config: LightGBMConfig) -> Self {
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

    fn sample_rows(
        &self,
        gradients: &mut [f64],
        hessians: &mut [f64],
        rng: &mut Xoshiro256PlusPlus,
    ) -> Vec<usize> {
        let n = gradients.len();
        if self.config.use_goss && self.config.top_rate + self.config.other_rate < 1.0 {
            let (mut top, rest, amplify) =
                goss_sample(gradients, self.config.top_rate, self.config.other_rate, rng);
            for &i in &rest {
                gradients[i] *= amplify;
                hessians[i] *= amplify;
            }
            top.extend(rest);
            top
        } else if self.config.subsample < 1.0 {
            let k = ((n as f64 * self.config.subsample).ceil() as usize).max(1);
            let mut idx: Vec<usize> = (0..n).collect();
            idx.shuffle(rng);
            idx.truncate(k);
            idx
        } else {
            (0..n).collect()
        }
    }
}

impl Classifier for LightGBMClassifier {
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
            let mut gradients: Vec<f64> = probs.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();
            let mut hessians: Vec<f64> = probs.iter().map(|&p| (p * (1.0 - p)).max(1e-16)).collect();

            let indices = self.sample_rows(&mut gradients, &mut hessians, &mut rng);
            let tree = build_lgb_tree(x, &gradients, &hessians, &indices, &self.config, &mut rng);

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

#[cfg(test)]
mod tests {
    use super::*;

    fn make_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| (i as f64) / 100.0).collect()).unwrap();
        let y = Array1::from_vec((0..100).map(|i| if i < 50 { 0.0 } else { 1.0 }).collect());
        (x, y)
    }

    #[test]
    fn test_lightgbm_classifier() {
        let (x, y) = make_classification_data();
        let config = LightGBMConfig {
            n_estimators: 30,
            max_leaves: 8,
            min_child_samples: 2,
            ..Default::default()
        };
        let mut model = LightGBMClassifier::new(config);
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        let acc = preds.iter().zip(y.iter()).filter(|(&p, &t)| p == t).count() as f64 / 100.0;
        assert!(acc > 0.9, "Accuracy too low: {}", acc);
    }

    #[test]
    fn test_lightgbm_goss() {
        let (x, y) = make_classification_data();
        let config = LightGBMConfig {
            n_estimators: 10,
            max_leaves: 8,
            min_child_samples: 2,
            use_goss: true,
            top_rate: 0.3,
            other_rate: 0.2,
            ..Default::default()
        };
        let mut model = LightGBMClassifier::new(config);
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), 100);
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_lightgbm_small_data_single_leaf() {
        // Fewer rows than 2 * min_child_samples: every tree is one leaf
        let x = Array2::from_shape_vec((6, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let mut model = LightGBMClassifier::new(LightGBMConfig::default());
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (p - proba[0]).abs() < 1e-12));
    }

    #[test]
    fn test_lightgbm_unfitted() {
        let (x, _) = make_classification_data();
        let model = LightGBMClassifier::new(LightGBMConfig::default());
        assert!(matches!(model.predict_proba(&x), Err(StackfoldError::ModelNotFitted)));
    }
}
