//! Progress snapshot of a session.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Distribution;

/// Immutable snapshot produced by [`Agent::state`](super::Agent::state).
///
/// Maps are keyed by skill name. `NoSkill` never appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub created_at: DateTime<Utc>,
    /// Posterior of each skill.
    pub probabilities: BTreeMap<String, Distribution>,
    pub scores: BTreeMap<String, f64>,
    /// Name of the most likely state of each skill.
    pub levels: BTreeMap<String, String>,
    pub questions_per_skill: BTreeMap<String, usize>,
    /// Skills that will receive no further questions.
    pub completed_skills: BTreeSet<String>,
    /// Mean of `scores`, zero without skills.
    pub score_average: f64,
    pub total_answers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_with_skill_keys() {
        let state = State {
            created_at: Utc::now(),
            probabilities: BTreeMap::from([("A".to_string(), Distribution::new(vec![0.2, 0.8]))]),
            scores: BTreeMap::from([("A".to_string(), 0.72)]),
            levels: BTreeMap::from([("A".to_string(), "high".to_string())]),
            questions_per_skill: BTreeMap::from([("A".to_string(), 3)]),
            completed_skills: BTreeSet::new(),
            score_average: 0.72,
            total_answers: 3,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["probabilities"]["A"][1], 0.8);
        assert_eq!(json["questions_per_skill"]["A"], 3);

        let parsed: State = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, state);
    }
}
