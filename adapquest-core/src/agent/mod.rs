//! Adaptive agent: one per respondent session.
//!
//! # Lifecycle
//!
//! ```text
//!                  next()                check()
//!  AwaitingQuestion ─────► Asking(q) ───────────► Answered(q)
//!        ▲                   │  ▲ next() = q          │
//!        │                   │  └─────────            │
//!        │ rank()            │                        │
//!        ├───────────────────┴────────────────────────┤
//!        │                     next()                 │
//!        └────────────────────────────────────────────┘
//!
//!  any state ── stop() = true / no informative question ──► Finished
//! ```
//!
//! The variant is fixed at construction: a [`SelectionPolicy`](policy::SelectionPolicy)
//! and a [`StopPolicy`](stop::StopPolicy) chosen from the survey's
//! [`AdaptiveMode`].

mod belief;
mod gain;
mod ledger;
mod policy;
mod state;
mod stop;

use std::sync::Arc;

use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{AgentError, ModelError};
use crate::model::{Distribution, ExactInference, Inference, Model, Observations, VarId};
use crate::scoring::Scoring;
use crate::survey::{AdaptiveMode, AnswerId, Question, QuestionId, Survey, SurveySettings};

use belief::Beliefs;
use gain::Estimator;
use ledger::Ledger;
use policy::{
    Candidate, MultiSkillPolicy, SelectionPolicy, SequentialPolicy, SingleSkillPolicy,
};
use stop::{ExhaustedStop, StopPolicy, ThresholdStop};

pub use policy::CONVERGENCE_EPSILON;
pub use state::State;

/// Where an agent is in its question cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingQuestion,
    Asking(QuestionId),
    Answered(QuestionId),
    Finished,
}

/// Outcome of [`Agent::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    Question(QuestionId),
    /// No further question is worth asking; a normal end.
    Finished,
}

/// A respondent's choice for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question: QuestionId,
    pub answer: AnswerId,
}

impl Answer {
    #[must_use]
    pub fn new(question: QuestionId, answer: AnswerId) -> Self {
        Self { question, answer }
    }
}

/// Entry of [`Agent::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedQuestion {
    pub id: QuestionId,
    /// Gain from the ranking pass; zero for mandatory questions.
    pub score: f64,
}

/// A tracked skill that may receive questions this round.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EligibleSkill {
    pub slot: usize,
    pub variable: VarId,
    pub score: f64,
}

/// Session data read by the policies.
#[derive(Debug)]
pub(crate) struct Context {
    survey: Arc<Survey>,
    ledger: Ledger,
    observations: Observations,
    beliefs: Beliefs,
    scoring: Arc<dyn Scoring>,
    inference: Arc<dyn Inference>,
    workers: Option<Arc<ThreadPool>>,
}

impl Context {
    fn settings(&self) -> &SurveySettings {
        self.survey.settings()
    }

    fn workers(&self) -> Option<&ThreadPool> {
        self.workers.as_deref()
    }

    fn skill_name(&self, slot: usize) -> &str {
        &self.survey.skills()[self.ledger.skill(slot)].name
    }

    fn skill_variable(&self, slot: usize) -> VarId {
        self.survey.skills()[self.ledger.skill(slot)].variable
    }

    fn estimator<'a>(&'a self, model: &'a dyn Model) -> Estimator<'a> {
        Estimator::new(
            model,
            &self.observations,
            self.scoring.as_ref(),
            self.inference.as_ref(),
        )
    }

    fn posterior(&self, variable: VarId) -> Result<Distribution, ModelError> {
        let view = self.beliefs.view(&[])?;
        self.inference.query(&view, &self.observations, variable)
    }

    fn skill_score(&self, slot: usize) -> Result<f64, ModelError> {
        let posterior = self.posterior(self.skill_variable(slot))?;
        Ok(self.scoring.score(&posterior))
    }

    /// Skills passing the validity check this round, in variable order.
    fn eligible_skills(&self) -> Result<Vec<EligibleSkill>, ModelError> {
        let mut eligible = Vec::new();
        for slot in 0..self.ledger.slots() {
            if self.ledger.available(slot).is_empty() {
                continue;
            }
            let score = self.skill_score(slot)?;
            if self.ledger.is_skill_valid(slot, score, self.settings()) {
                eligible.push(EligibleSkill {
                    slot,
                    variable: self.skill_variable(slot),
                    score,
                });
            }
        }
        Ok(eligible)
    }

    /// Mean score over tracked skills, `None` without skills.
    fn mean_score(&self) -> Result<Option<f64>, ModelError> {
        let slots = self.ledger.slots();
        if slots == 0 {
            return Ok(None);
        }
        let mut sum = 0.0;
        for slot in 0..slots {
            sum += self.skill_score(slot)?;
        }
        Ok(Some(sum / slots as f64))
    }

    fn sync(&mut self) -> Result<(), ModelError> {
        self.beliefs
            .sync(&mut self.observations, self.inference.as_ref())
    }
}

/// Build the agent variant selected by the survey's mode.
///
/// `seed` drives the question order of shuffled non-adaptive surveys.
pub fn new_agent(
    survey: Arc<Survey>,
    seed: u64,
    scoring: Arc<dyn Scoring>,
) -> Result<Agent, AgentError> {
    let settings = survey.settings();
    let mode = settings.mode;
    let (policy, stop): (Box<dyn SelectionPolicy>, Box<dyn StopPolicy>) = match mode {
        AdaptiveMode::NonAdaptive => (
            Box::new(SequentialPolicy::new(settings.questions_are_random, seed)),
            Box::new(ExhaustedStop),
        ),
        AdaptiveMode::SingleSkill => (Box::new(SingleSkillPolicy), Box::new(ThresholdStop)),
        AdaptiveMode::Simple => (Box::new(MultiSkillPolicy::simple()), Box::new(ThresholdStop)),
        AdaptiveMode::Structural => (
            Box::new(MultiSkillPolicy::structural()),
            Box::new(ThresholdStop),
        ),
    };
    let beliefs = match mode {
        AdaptiveMode::Structural => Beliefs::working(&survey)?,
        _ => Beliefs::full(Arc::clone(survey.model())),
    };
    info!(%mode, scoring = scoring.name(), seed, "agent created");

    Ok(Agent {
        ctx: Context {
            ledger: Ledger::new(&survey),
            survey,
            observations: Observations::new(),
            beliefs,
            scoring,
            inference: Arc::new(ExactInference::new()),
            workers: None,
        },
        phase: Phase::AwaitingQuestion,
        ranked: false,
        policy,
        stop,
    })
}

/// Stateful question selector for one session.
#[derive(Debug)]
pub struct Agent {
    ctx: Context,
    phase: Phase,
    ranked: bool,
    policy: Box<dyn SelectionPolicy>,
    stop: Box<dyn StopPolicy>,
}

impl Agent {
    /// Replace the inference backend.
    #[must_use]
    pub fn with_inference(mut self, inference: Arc<dyn Inference>) -> Self {
        self.ctx.inference = inference;
        self
    }

    /// Score candidates on a shared worker pool.
    #[must_use]
    pub fn with_workers(mut self, workers: Option<Arc<ThreadPool>>) -> Self {
        self.ctx.workers = workers;
        self
    }

    #[must_use]
    pub fn survey(&self) -> &Arc<Survey> {
        &self.ctx.survey
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Question currently asked or just answered.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Asking(id) | Phase::Answered(id) => self.ctx.survey.question(id),
            _ => None,
        }
    }

    /// Evidence collected so far. The structural variant folds question
    /// observations into its skill priors, keeping only skill observations.
    #[must_use]
    pub fn observations(&self) -> &Observations {
        &self.ctx.observations
    }

    /// Number of folds applied to the working graph; always zero for other variants.
    #[must_use]
    pub fn belief_generation(&self) -> u64 {
        self.ctx.beliefs.generation()
    }

    /// Last gain computed for a question.
    #[must_use]
    pub fn question_score(&self, id: QuestionId) -> Option<f64> {
        self.ctx.survey.position(id).map(|p| self.ctx.ledger.score(p))
    }

    /// Snapshot of posteriors, scores, and counts.
    pub fn state(&mut self) -> Result<State, AgentError> {
        self.ctx.sync()?;
        let settings = self.ctx.settings();
        let mut state = State {
            created_at: chrono::Utc::now(),
            probabilities: Default::default(),
            scores: Default::default(),
            levels: Default::default(),
            questions_per_skill: Default::default(),
            completed_skills: Default::default(),
            score_average: 0.0,
            total_answers: self.ctx.ledger.total(),
        };

        for slot in 0..self.ctx.ledger.slots() {
            let skill = &self.ctx.survey.skills()[self.ctx.ledger.skill(slot)];
            let posterior = self.ctx.posterior(skill.variable)?;
            let score = self.ctx.scoring.score(&posterior);
            if let Some(level) = posterior
                .mode()
                .and_then(|m| skill.states.iter().find(|s| s.state == m))
            {
                state.levels.insert(skill.name.clone(), level.name.clone());
            }
            if self.ctx.ledger.is_completed(slot, settings) {
                state.completed_skills.insert(skill.name.clone());
            }
            state
                .questions_per_skill
                .insert(skill.name.clone(), self.ctx.ledger.done_in(slot));
            state.scores.insert(skill.name.clone(), score);
            state.probabilities.insert(skill.name.clone(), posterior);
        }
        if !state.scores.is_empty() {
            state.score_average = state.scores.values().sum::<f64>() / state.scores.len() as f64;
        }
        Ok(state)
    }

    /// Record an answer to the current question.
    ///
    /// Returns `false`, changing nothing, when the answer does not belong to
    /// the current question. After [`rank`](Self::rank) cleared the current
    /// question, an answer to any remaining question is accepted and that
    /// question is registered first.
    pub fn check(&mut self, answer: &Answer) -> bool {
        let survey = Arc::clone(&self.ctx.survey);
        let Some(position) = survey.position(answer.question) else {
            warn!(question = %answer.question, "answer for unknown question");
            return false;
        };
        let question = &survey.questions()[position];
        let Some(chosen) = question.answer(answer.answer) else {
            warn!(question = %question.name, answer = %answer.answer, "answer does not belong to question");
            return false;
        };

        let phase = self.phase;
        match phase {
            Phase::Asking(current) | Phase::Answered(current) if current == answer.question => {}
            Phase::AwaitingQuestion if self.ranked && self.ctx.ledger.is_remaining(position) => {
                if let Err(e) = self.register(position) {
                    warn!(question = %question.name, error = %e, "cannot register ranked question");
                    return false;
                }
            }
            _ => {
                warn!(?phase, received = %answer.question, "invalid answer");
                return false;
            }
        }

        if question.is_example {
            debug!(question = %question.name, "example answered");
        } else if question.yes_only && chosen.state == 0 {
            debug!(question = %question.name, "unchecked yes-only option");
        } else {
            let added = chosen.observe_into(&mut self.ctx.observations);
            self.ctx.beliefs.mark_pending();
            debug!(
                question = %question.name,
                variable = ?chosen.variable,
                state = chosen.state,
                added,
                "answer recorded"
            );
        }
        self.phase = Phase::Answered(answer.question);
        true
    }

    /// Whether the session is over. Once `true`, always `true`.
    pub fn stop(&mut self) -> Result<bool, AgentError> {
        if self.phase == Phase::Finished {
            return Ok(true);
        }
        self.ctx.sync()?;
        let stop = self.stop.should_stop(&self.ctx)?;
        if stop {
            self.phase = Phase::Finished;
        }
        Ok(stop)
    }

    /// The question to ask next.
    ///
    /// Repeats the current question while it is unanswered. Mandatory
    /// questions come first; afterwards the policy picks the most
    /// informative candidate.
    pub fn next(&mut self) -> Result<Selection, AgentError> {
        match self.phase {
            Phase::Finished => return Err(AgentError::Finished),
            Phase::Asking(id) => return Ok(Selection::Question(id)),
            Phase::AwaitingQuestion | Phase::Answered(_) => {}
        }
        self.ctx.sync()?;

        if let Some(position) = self.ctx.ledger.next_mandatory() {
            return self.ask(position);
        }

        let candidates = self.policy.evaluate(&self.ctx)?;
        self.record_scores(&candidates);

        let total = self.ctx.ledger.total();
        let min = self.ctx.settings().question_total_min;
        match self.policy.choose(&candidates) {
            Some(best)
                if self.policy.converges() && best.gain <= CONVERGENCE_EPSILON && total >= min =>
            {
                info!(total, gain = best.gain, "no informative question left");
                self.phase = Phase::Finished;
                Ok(Selection::Finished)
            }
            Some(best) => self.ask(best.question),
            None if total >= min || self.ctx.ledger.remaining().is_empty() => {
                info!(total, "no eligible question left");
                self.phase = Phase::Finished;
                Ok(Selection::Finished)
            }
            None => {
                error!(total, min, "no valid question found");
                Err(AgentError::NoCandidate)
            }
        }
    }

    /// All remaining questions, mandatory ones first, the rest by descending gain.
    ///
    /// Clears the current question: the caller answers whichever question it picks.
    pub fn rank(&mut self) -> Result<Vec<RankedQuestion>, AgentError> {
        if self.phase == Phase::Finished {
            return Err(AgentError::Finished);
        }
        self.ranked = true;
        self.ctx.sync()?;

        let candidates = self.policy.evaluate(&self.ctx)?;
        self.record_scores(&candidates);

        let ledger = &self.ctx.ledger;
        let mandatory: Vec<usize> = ledger.mandatory().collect();
        let mut rest: Vec<usize> = ledger
            .remaining()
            .iter()
            .copied()
            .filter(|q| !mandatory.contains(q))
            .collect();
        rest.sort_by(|a, b| ledger.score(*b).total_cmp(&ledger.score(*a)));

        let questions = self.ctx.survey.questions();
        let ranked = mandatory
            .iter()
            .map(|&q| RankedQuestion {
                id: questions[q].id,
                score: 0.0,
            })
            .chain(rest.iter().map(|&q| RankedQuestion {
                id: questions[q].id,
                score: ledger.score(q),
            }))
            .collect();
        self.phase = Phase::AwaitingQuestion;
        Ok(ranked)
    }

    fn ask(&mut self, position: usize) -> Result<Selection, AgentError> {
        self.register(position)?;
        Ok(Selection::Question(self.ctx.survey.questions()[position].id))
    }

    fn register(&mut self, position: usize) -> Result<(), ModelError> {
        let survey = Arc::clone(&self.ctx.survey);
        let question = &survey.questions()[position];
        self.ctx.beliefs.attach(&question.variables())?;
        self.ctx.ledger.register(position);
        self.phase = Phase::Asking(question.id);
        debug!(
            question = %question.name,
            skills = ?question.skills,
            total = self.ctx.ledger.total(),
            "next question"
        );
        Ok(())
    }

    fn record_scores(&mut self, candidates: &[Candidate]) {
        let remaining = self.ctx.ledger.remaining().to_vec();
        for question in remaining {
            self.ctx.ledger.set_score(question, 0.0);
        }
        for candidate in candidates {
            self.ctx.ledger.set_score(candidate.question, candidate.gain);
        }
    }
}
