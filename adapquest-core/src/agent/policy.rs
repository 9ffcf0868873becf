//! Question selection policies.
//!
//! A policy scores the candidate questions of one round and picks one. The
//! agent owns everything else: mandatory questions, registration, and the
//! decision to finish when the best gain carries no information.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::gain::{gain, map_ordered};
use super::{Context, EligibleSkill};
use crate::error::{AgentError, ModelError};
use crate::model::Model;
use crate::survey::Question;

/// Best gains at or below this value end an adaptive survey once the minimum is met.
pub const CONVERGENCE_EPSILON: f64 = 1e-9;

/// One scored question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub question: usize,
    pub gain: f64,
}

pub(crate) trait SelectionPolicy: Send + Sync + fmt::Debug {
    /// Score every candidate question, in enumeration order.
    fn evaluate(&self, ctx: &Context) -> Result<Vec<Candidate>, AgentError>;

    /// Pick among evaluated candidates; `None` when there are none.
    fn choose(&mut self, candidates: &[Candidate]) -> Option<Candidate> {
        best(candidates)
    }

    /// Whether a best gain at or below [`CONVERGENCE_EPSILON`] ends the survey.
    fn converges(&self) -> bool {
        true
    }
}

/// Highest gain; the first one wins ties.
pub(crate) fn best(candidates: &[Candidate]) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for &candidate in candidates {
        if best.is_none_or(|b| candidate.gain > b.gain) {
            best = Some(candidate);
        }
    }
    best
}

/// Each question informs one skill; only questions of eligible skills compete.
///
/// A multiple choice question scores the mean gain of its options.
#[derive(Debug, Default)]
pub(crate) struct SingleSkillPolicy;

impl SelectionPolicy for SingleSkillPolicy {
    fn evaluate(&self, ctx: &Context) -> Result<Vec<Candidate>, AgentError> {
        let eligible = ctx.eligible_skills()?;
        let view = ctx.beliefs.view(&[])?;
        let estimator = ctx.estimator(&view);

        let jobs: Vec<(usize, usize)> = eligible
            .iter()
            .enumerate()
            .flat_map(|(e, skill)| ctx.ledger.available(skill.slot).iter().map(move |&q| (e, q)))
            .collect();

        let gains = map_ordered(ctx.workers(), &jobs, |&(e, q)| {
            let skill = &eligible[e];
            let question = &ctx.survey.questions()[q];
            if !question.multiple_choice {
                let Some(variable) = question.variable() else {
                    return Ok(0.0);
                };
                let expected = estimator.expected_score(question, variable, skill.variable)?;
                return Ok(gain(skill.score, expected));
            }

            // mean over the options
            let variables = question.variables();
            if variables.is_empty() {
                return Ok(0.0);
            }
            let mut total = 0.0;
            for &variable in &variables {
                let expected = if question.yes_only {
                    estimator.expected_score_yes_only(question, variable, skill.variable, skill.score)?
                } else {
                    estimator.expected_score(question, variable, skill.variable)?
                };
                total += gain(skill.score, expected);
            }
            Ok(total / variables.len() as f64)
        })?;

        Ok(jobs
            .iter()
            .zip(gains)
            .map(|(&(e, q), gain)| {
                debug!(
                    skill = %ctx.skill_name(eligible[e].slot),
                    question = %ctx.survey.questions()[q].name,
                    gain,
                    "scored candidate"
                );
                Candidate { question: q, gain }
            })
            .collect())
    }
}

/// Questions may inform several skills; a question's gain is its mean over eligible skills.
///
/// The structural flavor scores each candidate on the working graph extended
/// with that candidate's nodes only.
#[derive(Debug)]
pub(crate) struct MultiSkillPolicy {
    structural: bool,
}

impl MultiSkillPolicy {
    pub fn simple() -> Self {
        Self { structural: false }
    }

    pub fn structural() -> Self {
        Self { structural: true }
    }

    fn question_gain(
        &self,
        ctx: &Context,
        model: &dyn Model,
        question: &Question,
        eligible: &[EligibleSkill],
    ) -> Result<f64, ModelError> {
        let estimator = ctx.estimator(model);
        let skills = eligible.len() as f64;

        if !question.multiple_choice {
            let Some(variable) = question.variable() else {
                return Ok(0.0);
            };
            let mut total = 0.0;
            for skill in eligible {
                let expected = estimator.expected_score(question, variable, skill.variable)?;
                total += gain(skill.score, expected);
            }
            return Ok(total / skills);
        }

        // one term per (option, parent skill) pair, normalized by the option count
        let variables = question.variables();
        if variables.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for &variable in &variables {
            let parents = model.parents(variable);
            for skill in eligible
                .iter()
                .filter(|s| parents.contains(&s.variable) && !ctx.observations.contains(s.variable))
            {
                let expected = if question.yes_only {
                    estimator.expected_score_yes_only(question, variable, skill.variable, skill.score)?
                } else {
                    estimator.expected_score(question, variable, skill.variable)?
                };
                total += gain(skill.score, expected) / skills;
            }
        }
        Ok(total / variables.len() as f64)
    }
}

impl SelectionPolicy for MultiSkillPolicy {
    fn evaluate(&self, ctx: &Context) -> Result<Vec<Candidate>, AgentError> {
        let eligible = ctx.eligible_skills()?;
        if eligible.is_empty() {
            return Ok(Vec::new());
        }
        let shared = ctx.beliefs.view(&[])?;
        let questions = ctx.ledger.remaining();

        let gains = map_ordered(ctx.workers(), questions, |&q| {
            let question = &ctx.survey.questions()[q];
            if self.structural {
                let scratch = ctx.beliefs.view(&question.variables())?;
                self.question_gain(ctx, &scratch, question, &eligible)
            } else {
                self.question_gain(ctx, &shared, question, &eligible)
            }
        })?;

        Ok(questions
            .iter()
            .zip(gains)
            .map(|(&q, gain)| {
                debug!(question = %ctx.survey.questions()[q].name, gain, "scored candidate");
                Candidate { question: q, gain }
            })
            .collect())
    }
}

/// Fixed definition order, or a uniformly random pick per round when shuffled.
#[derive(Debug)]
pub(crate) struct SequentialPolicy {
    rng: Option<StdRng>,
}

impl SequentialPolicy {
    pub fn new(random: bool, seed: u64) -> Self {
        Self {
            rng: random.then(|| StdRng::seed_from_u64(seed)),
        }
    }
}

impl SelectionPolicy for SequentialPolicy {
    fn evaluate(&self, ctx: &Context) -> Result<Vec<Candidate>, AgentError> {
        Ok(ctx
            .ledger
            .remaining()
            .iter()
            .map(|&question| Candidate { question, gain: 0.0 })
            .collect())
    }

    fn choose(&mut self, candidates: &[Candidate]) -> Option<Candidate> {
        if candidates.is_empty() {
            return None;
        }
        let index = match &mut self.rng {
            Some(rng) => rng.gen_range(0..candidates.len()),
            None => 0,
        };
        Some(candidates[index])
    }

    fn converges(&self) -> bool {
        false
    }
}
