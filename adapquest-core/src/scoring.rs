//! Uncertainty scores of a distribution.
//!
//! A [`Scoring`] maps a posterior to a scalar where lower means more
//! certain. Selection and stop logic never care which one is installed.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::Distribution;

/// Uncertainty of a distribution.
pub trait Scoring: Send + Sync + fmt::Debug {
    fn score(&self, distribution: &Distribution) -> f64;

    /// Short name used in logs and settings.
    fn name(&self) -> &'static str;
}

/// Shannon entropy in bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entropy;

impl Scoring for Entropy {
    fn score(&self, distribution: &Distribution) -> f64 {
        let h: f64 = distribution
            .as_slice()
            .iter()
            .map(|&p| if p == 0.0 { 0.0 } else { -p * p.log2() })
            .sum();
        if h.is_nan() { 0.0 } else { h }
    }

    fn name(&self) -> &'static str {
        "entropy"
    }
}

/// One minus the probability of the most likely state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BayesianMode;

impl Scoring for BayesianMode {
    fn score(&self, distribution: &Distribution) -> f64 {
        let max = distribution
            .as_slice()
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        1.0 - max
    }

    fn name(&self) -> &'static str {
        "mode"
    }
}

/// Scoring selected by a survey.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringKind {
    #[default]
    Entropy,
    Mode,
}

impl ScoringKind {
    /// Resolve a scoring name; anything other than `"mode"` selects entropy.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("mode") {
            Self::Mode
        } else {
            Self::Entropy
        }
    }

    #[must_use]
    pub fn build(self) -> Arc<dyn Scoring> {
        match self {
            Self::Entropy => Arc::new(Entropy),
            Self::Mode => Arc::new(BayesianMode),
        }
    }
}
