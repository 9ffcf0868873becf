//! SurveyManager for live respondent sessions
//!
//! Maps session tokens to agents. Map operations are atomic; calls for the
//! same token are serialized by a per-agent lock, so different sessions
//! proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::agent::{Agent, Answer, RankedQuestion, Selection, State, new_agent};
use crate::config::EngineConfig;
use crate::error::{AgentError, ManagerError};
use crate::model::{ExactInference, Inference};
use crate::survey::{AnswerId, Question, QuestionId, Survey};

/// Opaque identifier of a respondent session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Create a token from a string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the agents of all active sessions.
pub struct SurveyManager {
    sessions: RwLock<HashMap<SessionToken, Arc<Mutex<Agent>>>>,
    inference: Arc<dyn Inference>,
    workers: Option<Arc<ThreadPool>>,
}

impl SurveyManager {
    /// Create a manager, building the scoring pool if `config.workers > 0`.
    pub fn new(config: &EngineConfig) -> Result<Self, ManagerError> {
        let workers = if config.workers > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("adapquest-score-{i}"))
                .build()
                .map_err(|e| ManagerError::WorkerPool(e.to_string()))?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            inference: Arc::new(ExactInference::with_limit(config.max_joint_states)),
            workers,
        })
    }

    /// Start a session on `survey`.
    ///
    /// The agent is seeded with the start time in epoch seconds.
    pub async fn init(
        &self,
        survey: Arc<Survey>,
        started_at: DateTime<Utc>,
    ) -> Result<SessionToken, ManagerError> {
        self.init_with_token(SessionToken::generate(), survey, started_at)
            .await
    }

    /// Start a session under a caller-chosen token.
    pub async fn init_with_token(
        &self,
        token: SessionToken,
        survey: Arc<Survey>,
        started_at: DateTime<Utc>,
    ) -> Result<SessionToken, ManagerError> {
        let seed = started_at.timestamp().unsigned_abs();
        let scoring = survey.settings().scoring.build();
        let agent = new_agent(survey, seed, scoring)?
            .with_inference(Arc::clone(&self.inference))
            .with_workers(self.workers.clone());

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&token) {
            return Err(ManagerError::DuplicateToken(token.to_string()));
        }
        sessions.insert(token.clone(), Arc::new(Mutex::new(agent)));
        info!(session = %token, "session started");
        Ok(token)
    }

    /// Run `f` on the agent of `token`.
    ///
    /// Uses the callback pattern so the map lock is released before the agent is touched.
    pub async fn with_agent<F, R>(&self, token: &SessionToken, f: F) -> Result<R, ManagerError>
    where
        F: FnOnce(&mut Agent) -> R,
    {
        let agent = self
            .sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(token.to_string()))?;
        let mut agent = agent.lock().await;
        Ok(f(&mut agent))
    }

    pub async fn state(&self, token: &SessionToken) -> Result<State, ManagerError> {
        Ok(self.with_agent(token, |agent| agent.state()).await??)
    }

    /// Whether the session is over, evaluating the stop predicate.
    pub async fn is_finished(&self, token: &SessionToken) -> Result<bool, ManagerError> {
        Ok(self.with_agent(token, |agent| agent.stop()).await??)
    }

    pub async fn check_answer(
        &self,
        token: &SessionToken,
        answer: Answer,
    ) -> Result<bool, ManagerError> {
        self.with_agent(token, |agent| agent.check(&answer)).await
    }

    /// Record the checked options of `question`.
    ///
    /// Multiple choice questions resolve to one answer per option variable;
    /// other questions take the first checked answer. Returns how many
    /// answers the agent accepted.
    pub async fn check_answers(
        &self,
        token: &SessionToken,
        question: QuestionId,
        checked: &[AnswerId],
    ) -> Result<usize, ManagerError> {
        self.with_agent(token, |agent| {
            let survey = Arc::clone(agent.survey());
            let Some(q) = survey.question(question) else {
                return 0;
            };
            let answers: Vec<AnswerId> = if q.multiple_choice {
                q.resolve_checked(checked).iter().map(|a| a.id).collect()
            } else {
                checked.iter().take(1).copied().collect()
            };
            answers
                .into_iter()
                .filter(|&id| agent.check(&Answer::new(question, id)))
                .count()
        })
        .await
    }

    /// Next question, or `None` when the survey ended normally.
    pub async fn next_question(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Question>, ManagerError> {
        let next = self
            .with_agent(token, |agent| {
                Ok::<_, AgentError>(match agent.next()? {
                    Selection::Question(id) => agent.survey().question(id).cloned(),
                    Selection::Finished => None,
                })
            })
            .await??;
        Ok(next)
    }

    pub async fn rank_questions(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<RankedQuestion>, ManagerError> {
        Ok(self.with_agent(token, |agent| agent.rank()).await??)
    }

    /// End the session and return its final state.
    pub async fn complete(&self, token: &SessionToken) -> Result<State, ManagerError> {
        let agent = self
            .sessions
            .write()
            .await
            .remove(token)
            .ok_or_else(|| ManagerError::NotFound(token.to_string()))?;
        let state = agent.lock().await.state()?;
        info!(session = %token, total = state.total_answers, "session completed");
        Ok(state)
    }

    /// Active session tokens.
    pub async fn list_sessions(&self) -> Vec<SessionToken> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
