//! Error types for adapquest-core

use thiserror::Error;

use crate::model::VarId;
use crate::survey::QuestionId;

/// Top-level error type for adapquest-core
#[derive(Error, Debug)]
pub enum AdapquestError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Manager error: {0}")]
    Manager(#[from] ManagerError),
}

/// Result alias for adapquest-core operations
pub type Result<T> = std::result::Result<T, AdapquestError>;

/// Errors raised by the graphical model and its inference backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(VarId),

    #[error("State {state} out of range for variable {variable} with {size} states")]
    InvalidState {
        variable: VarId,
        state: usize,
        size: usize,
    },

    #[error("Invalid table for variable {variable}: expected {expected} entries, got {actual}")]
    InvalidTable {
        variable: VarId,
        expected: usize,
        actual: usize,
    },

    #[error("Parent {parent} of variable {variable} has {actual} states, declared {expected}")]
    ParentMismatch {
        variable: VarId,
        parent: VarId,
        expected: usize,
        actual: usize,
    },

    #[error("Cycle detected through variable {0}")]
    Cycle(VarId),

    #[error("Evidence has zero probability")]
    ImpossibleEvidence,

    #[error("Query needs {states} joint states, limit is {limit}")]
    Intractable { states: u128, limit: u128 },

    #[error("Unsupported model structure: {0}")]
    UnsupportedStructure(String),

    #[error("Parse error at token {position}: {message}")]
    Parse { position: usize, message: String },
}

/// Errors raised while building or loading a survey definition
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Question {question} references unknown skill '{skill}'")]
    UnknownSkill { question: QuestionId, skill: String },

    #[error("{context} references variable {variable} which is not in the model")]
    UnknownVariable { context: String, variable: VarId },

    #[error("{context} asserts state {state} but variable {variable} has {size} states")]
    InvalidState {
        context: String,
        variable: VarId,
        state: usize,
        size: usize,
    },

    #[error("Skill '{skill}' declares {declared} states but its variable has {actual}")]
    SkillStates {
        skill: String,
        declared: usize,
        actual: usize,
    },

    #[error("Duplicate {kind} id {id}")]
    Duplicate { kind: &'static str, id: u64 },

    #[error("Question {0} has no answers")]
    NoAnswers(QuestionId),

    #[error("Survey definition has no model (set `model` or `model_path`)")]
    MissingModel,

    #[error("Failed to read survey definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid survey definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised by an [`Agent`](crate::agent::Agent)
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Survey is finished")]
    Finished,

    #[error("No valid question found: no eligible skill or question remains before the minimum is met")]
    NoCandidate,

    #[error("Question {0} is not part of this survey")]
    UnknownQuestion(QuestionId),

    #[error("Inference failed: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised by the [`SurveyManager`](crate::manager::SurveyManager)
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session token already in use: {0}")]
    DuplicateToken(String),

    #[error("Failed to build scoring worker pool: {0}")]
    WorkerPool(String),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_invalid_state_displays_correctly() {
        let error = ModelError::InvalidState {
            variable: 3,
            state: 4,
            size: 2,
        };
        assert!(error.to_string().contains("State 4"));
        assert!(error.to_string().contains("variable 3"));
    }

    #[test]
    fn model_error_intractable_displays_limit() {
        let error = ModelError::Intractable {
            states: 1 << 30,
            limit: 1 << 22,
        };
        assert!(error.to_string().contains("4194304"));
    }

    #[test]
    fn survey_error_unknown_skill_displays_correctly() {
        let error = SurveyError::UnknownSkill {
            question: QuestionId::new(7),
            skill: "Listening".to_string(),
        };
        assert!(error.to_string().contains("Question 7"));
        assert!(error.to_string().contains("'Listening'"));
    }

    #[test]
    fn agent_error_distinguishes_finished_from_no_candidate() {
        assert!(AgentError::Finished.to_string().contains("finished"));
        assert!(AgentError::NoCandidate.to_string().contains("No valid question"));
    }

    #[test]
    fn agent_error_converts_from_model_error() {
        let error: AgentError = ModelError::ImpossibleEvidence.into();
        assert!(matches!(error, AgentError::Model(ModelError::ImpossibleEvidence)));
    }

    #[test]
    fn manager_error_converts_from_agent_error() {
        let error: ManagerError = AgentError::Finished.into();
        assert!(error.to_string().contains("Survey is finished"));
    }

    #[test]
    fn adapquest_error_wraps_all_layers() {
        let error: AdapquestError = SurveyError::MissingModel.into();
        assert!(error.to_string().starts_with("Survey error"));

        let error: AdapquestError = ManagerError::NotFound("abc".to_string()).into();
        assert!(error.to_string().contains("abc"));
    }
}
