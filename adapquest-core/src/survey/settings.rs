//! Survey configuration: question bounds, score thresholds, and agent variant.

use serde::{Deserialize, Serialize};

use crate::scoring::ScoringKind;

/// Question selection variant used by the agents of a survey.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveMode {
    /// Fixed or shuffled order, no inference during selection.
    NonAdaptive,
    /// Each question informs exactly one skill.
    #[default]
    SingleSkill,
    /// Questions may inform several skills.
    Simple,
    /// Like `Simple`, over a working graph folded after every answer.
    Structural,
}

impl AdaptiveMode {
    /// Resolve the variant from the `adaptive`, `simple`, and `structural` survey flags.
    #[must_use]
    pub fn from_flags(adaptive: bool, simple: bool, structural: bool) -> Self {
        match (adaptive, simple, structural) {
            (false, _, _) => Self::NonAdaptive,
            (true, _, true) => Self::Structural,
            (true, true, false) => Self::Simple,
            (true, false, false) => Self::SingleSkill,
        }
    }

    #[must_use]
    pub fn is_adaptive(self) -> bool {
        self != Self::NonAdaptive
    }
}

impl std::fmt::Display for AdaptiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NonAdaptive => "non-adaptive",
            Self::SingleSkill => "single-skill",
            Self::Simple => "simple",
            Self::Structural => "structural",
        };
        write!(f, "{name}")
    }
}

/// Inclusive score interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
        }
    }
}

impl ScoreBounds {
    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        score >= self.lower && score <= self.upper
    }
}

/// Per-survey thresholds and variant selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySettings {
    pub mode: AdaptiveMode,
    pub scoring: ScoringKind,
    /// Shuffle question order per session (non-adaptive only).
    pub questions_are_random: bool,
    pub question_per_skill_min: usize,
    pub question_per_skill_max: usize,
    pub question_total_min: usize,
    pub question_total_max: usize,
    /// Bounds on a single skill's score while it stays eligible.
    pub skill_score: ScoreBounds,
    /// Bounds on the mean skill score while the survey continues.
    pub global_mean_score: ScoreBounds,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            mode: AdaptiveMode::default(),
            scoring: ScoringKind::default(),
            questions_are_random: false,
            question_per_skill_min: 0,
            question_per_skill_max: usize::MAX,
            question_total_min: 0,
            question_total_max: usize::MAX,
            skill_score: ScoreBounds::default(),
            global_mean_score: ScoreBounds::default(),
        }
    }
}
