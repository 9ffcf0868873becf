//! Expected score reduction from asking a question.

use rayon::ThreadPool;
use rayon::prelude::*;

use crate::error::ModelError;
use crate::model::{Inference, Model, Observations, VarId};
use crate::scoring::Scoring;
use crate::survey::Question;

/// Clamped information gain: a nominally negative gain carries no signal.
pub(crate) fn gain(score: f64, expected: f64) -> f64 {
    (score - expected).max(0.0)
}

/// Map `f` over `items` on `workers` if given, keeping input order.
pub(crate) fn map_ordered<T, R, F>(
    workers: Option<&ThreadPool>,
    items: &[T],
    f: F,
) -> Result<Vec<R>, ModelError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, ModelError> + Sync + Send,
{
    match workers {
        Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
        None => items.iter().map(f).collect(),
    }
}

/// Scores a model view under fixed observations.
pub(crate) struct Estimator<'a> {
    model: &'a dyn Model,
    observations: &'a Observations,
    scoring: &'a dyn Scoring,
    inference: &'a dyn Inference,
}

impl<'a> Estimator<'a> {
    pub fn new(
        model: &'a dyn Model,
        observations: &'a Observations,
        scoring: &'a dyn Scoring,
        inference: &'a dyn Inference,
    ) -> Self {
        Self {
            model,
            observations,
            scoring,
            inference,
        }
    }

    /// Current score of `variable`.
    pub fn score(&self, variable: VarId) -> Result<f64, ModelError> {
        let posterior = self
            .inference
            .query(self.model, self.observations, variable)?;
        Ok(self.scoring.score(&posterior))
    }

    /// `Σ_i P(variable = i) · score(skill | variable = i)`.
    ///
    /// Each state is observed through the matching answer of `question`, so
    /// direct evidence attached to that answer is included.
    pub fn expected_score(
        &self,
        question: &Question,
        variable: VarId,
        skill: VarId,
    ) -> Result<f64, ModelError> {
        let answers = self
            .inference
            .query(self.model, self.observations, variable)?;
        let mut expected = 0.0;
        for (state, &p) in answers.as_slice().iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            expected += p * self.score_given(question, variable, state, skill)?;
        }
        Ok(expected)
    }

    /// Expected score when only a checked option (`variable = 1`) carries evidence.
    ///
    /// `H(S|C) = H(S|c=1)·P(c=1) + H(S)·P(c=0)`
    pub fn expected_score_yes_only(
        &self,
        question: &Question,
        variable: VarId,
        skill: VarId,
        score: f64,
    ) -> Result<f64, ModelError> {
        let answers = self
            .inference
            .query(self.model, self.observations, variable)?;
        let yes = answers.value_at(1);
        let checked = if yes > 0.0 {
            self.score_given(question, variable, 1, skill)?
        } else {
            0.0
        };
        Ok(checked * yes + score * (1.0 - yes))
    }

    fn score_given(
        &self,
        question: &Question,
        variable: VarId,
        state: usize,
        skill: VarId,
    ) -> Result<f64, ModelError> {
        let mut observations = self.observations.clone();
        match question.answer_for(variable, state) {
            Some(answer) => {
                answer.observe_into(&mut observations);
            }
            None => {
                observations.observe(variable, state);
            }
        }
        let posterior = self.inference.query(self.model, &observations, skill)?;
        Ok(self.scoring.score(&posterior))
    }
}
