//! adapquest-core: adaptive questionnaires over Bayesian skill models
//!
//! This crate provides the engine behind adapquest:
//!
//! - **Models** - [`BayesianNetwork`] with exact [`Inference`] and a UAI reader in [`model::uai`]
//! - **Surveys** - [`Survey`] with skills, questions, answers, and [`SurveySettings`]
//! - **Agents** - [`Agent`] picking the most informative next question for one respondent
//! - **Sessions** - [`SurveyManager`] holding one agent per [`SessionToken`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use adapquest_core::{Answer, Selection, SurveyDefinition, new_agent};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let survey = Arc::new(SurveyDefinition::load("survey.json".as_ref())?.into_survey()?);
//!     let scoring = survey.settings().scoring.build();
//!     let mut agent = new_agent(survey, 0, scoring)?;
//!
//!     while !agent.stop()? {
//!         let Selection::Question(id) = agent.next()? else { break };
//!         let question = agent.survey().question(id).ok_or("unknown question")?;
//!         let first = question.answers[0].id;
//!         agent.check(&Answer::new(id, first));
//!     }
//!     println!("{:?}", agent.state()?.scores);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                SurveyManager                  │
//! │  token ──► Mutex<Agent>                       │
//! │  ┌──────────────────────────────────────────┐ │
//! │  │ Agent                                    │ │
//! │  │  SelectionPolicy ─┐    ┌─ StopPolicy     │ │
//! │  │                   ▼    ▼                 │ │
//! │  │  Ledger   Observations   Beliefs         │ │
//! │  │                   │                      │ │
//! │  │         Inference + Scoring              │ │
//! │  └──────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod scoring;
pub mod survey;

// Re-export key types for convenience
pub use agent::{Agent, Answer, Phase, RankedQuestion, Selection, State, new_agent};
pub use config::EngineConfig;
pub use error::{AdapquestError, AgentError, ManagerError, ModelError, Result, SurveyError};
pub use manager::{SessionToken, SurveyManager};
pub use model::{BayesianNetwork, Distribution, ExactInference, Inference, Node, Observations};
pub use scoring::{BayesianMode, Entropy, Scoring, ScoringKind};
pub use survey::{
    AdaptiveMode, AnswerId, Evidence, Question, QuestionAnswer, QuestionId, ScoreBounds, Skill,
    SkillState, Survey, SurveyDefinition, SurveySettings,
};
