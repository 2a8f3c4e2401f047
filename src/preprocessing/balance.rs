//! Majority-class downsampling

use super::preparer::LabelledRows;
use super::BalanceConfig;
use crate::error::{Result, StackfoldError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Random undersampler that trims every class to the minority count
#[derive(Debug, Clone, Default)]
pub struct ClassBalancer {
    config: BalanceConfig,
}

impl ClassBalancer {
    pub fn new(config: BalanceConfig) -> Self {
        Self { config }
    }

    /// Downsample to `min(count_0, count_1)` rows per class, then shuffle.
    ///
    /// Sampling is without replacement and fully determined by the seed.
    pub fn balance(&self, data: LabelledRows) -> Result<LabelledRows> {
        let (neg, pos) = data.class_counts();
        let target = neg.min(pos);
        if target == 0 {
            return Err(StackfoldError::ValidationError(format!(
                "Cannot balance classes: {} negatives, {} positives",
                neg, pos
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let mut selected: Vec<usize> = Vec::with_capacity(target * 2);
        for class in [0.0, 1.0] {
            let mut class_idx: Vec<usize> = data
                .labels
                .iter()
                .enumerate()
                .filter(|(_, &y)| (y > 0.5) == (class > 0.5))
                .map(|(i, _)| i)
                .collect();
            class_idx.shuffle(&mut rng);
            selected.extend(class_idx.into_iter().take(target));
        }
        selected.shuffle(&mut rng);

        info!(before = data.len(), after = selected.len(), per_class = target, "Downsampled majority class");

        let LabelledRows { rows, labels } = data;
        Ok(LabelledRows {
            rows: selected.iter().map(|&i| rows[i].clone()).collect(),
            labels: selected.iter().map(|&i| labels[i]).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(neg: usize, pos: usize) -> LabelledRows {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..neg + pos {
            let y = if i < neg { 0.0 } else { 1.0 };
            rows.push(json!({"i": i}).as_object().cloned().unwrap());
            labels.push(y);
        }
        LabelledRows { rows, labels }
    }

    #[test]
    fn test_balance_to_minority() {
        let balanced = ClassBalancer::default().balance(data(60, 40)).unwrap();
        assert_eq!(balanced.len(), 80);
        assert_eq!(balanced.class_counts(), (40, 40));
    }

    #[test]
    fn test_balance_is_seeded() {
        let a = ClassBalancer::default().balance(data(30, 10)).unwrap();
        let b = ClassBalancer::default().balance(data(30, 10)).unwrap();
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_balance_labels_follow_rows() {
        let balanced = ClassBalancer::default().balance(data(12, 5)).unwrap();
        for (row, y) in balanced.rows.iter().zip(balanced.labels.iter()) {
            let i = row["i"].as_u64().unwrap() as usize;
            assert_eq!(*y, if i < 12 { 0.0 } else { 1.0 });
        }
    }

    #[test]
    fn test_balance_single_class_fails() {
        assert!(ClassBalancer::default().balance(data(10, 0)).is_err());
    }
}
