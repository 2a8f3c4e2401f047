//! Probability to Pass/Fail decision

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default decision threshold
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Decided label for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    /// 1.0 for Pass, 0.0 for Fail
    pub fn as_label(self) -> f64 {
        if self.is_pass() { 1.0 } else { 0.0 }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

/// Inclusive threshold rule: Pass iff `p >= threshold`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdDecider;

impl ThresholdDecider {
    pub fn decide(probability: f64, threshold: f64) -> Verdict {
        if probability >= threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn decide_all(probabilities: &[f64], threshold: f64) -> Vec<Verdict> {
        probabilities.iter().map(|&p| Self::decide(p, threshold)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_inclusive() {
        assert_eq!(ThresholdDecider::decide(0.7, 0.7), Verdict::Pass);
        assert_eq!(ThresholdDecider::decide(0.699_999_9, 0.7), Verdict::Fail);
        assert_eq!(ThresholdDecider::decide(1.0, DEFAULT_THRESHOLD), Verdict::Pass);
    }

    #[test]
    fn test_verdict_serialization() {
        assert_eq!(serde_json::to_string(&Verdict::Pass).unwrap(), "\"Pass\"");
        assert_eq!(Verdict::Fail.to_string(), "Fail");
        assert_eq!(Verdict::Fail.as_label(), 0.0);
    }
}
