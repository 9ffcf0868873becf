//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::model::inference::DEFAULT_MAX_JOINT_STATES;

/// Resources available to every agent of a [`SurveyManager`](crate::manager::SurveyManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Threads used to score candidate questions. Zero scores on the calling thread.
    pub workers: usize,
    /// Largest number of joint states a single inference query may enumerate.
    pub max_joint_states: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_joint_states: DEFAULT_MAX_JOINT_STATES,
        }
    }
}
