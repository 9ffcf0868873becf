//! Stop predicates.

use std::fmt;

use tracing::info;

use super::Context;
use crate::error::AgentError;

pub(crate) trait StopPolicy: Send + Sync + fmt::Debug {
    fn should_stop(&self, ctx: &Context) -> Result<bool, AgentError>;
}

/// Question bounds and score thresholds, evaluated in order:
///
/// 1. nothing left to ask
/// 2. survey maximum reached
/// 3. below the survey minimum with an eligible skill: continue
/// 4. mean skill score outside the global bounds
/// 5. every skill out of questions
#[derive(Debug, Default)]
pub(crate) struct ThresholdStop;

impl StopPolicy for ThresholdStop {
    fn should_stop(&self, ctx: &Context) -> Result<bool, AgentError> {
        let settings = ctx.survey.settings();
        let total = ctx.ledger.total();

        if ctx.ledger.remaining().is_empty() {
            info!(total, "stop: no questions left");
            return Ok(true);
        }
        if total >= settings.question_total_max {
            info!(total, max = settings.question_total_max, "stop: maximum reached");
            return Ok(true);
        }
        if total < settings.question_total_min && !ctx.eligible_skills()?.is_empty() {
            return Ok(false);
        }
        if let Some(mean) = ctx.mean_score()?
            && !settings.global_mean_score.contains(mean)
        {
            info!(total, mean, "stop: mean score outside global bounds");
            return Ok(true);
        }
        if (0..ctx.ledger.slots()).all(|slot| ctx.ledger.available(slot).is_empty()) {
            info!(total, "stop: every skill is out of questions");
            return Ok(true);
        }
        Ok(false)
    }
}

/// Stops once every question has been asked.
#[derive(Debug, Default)]
pub(crate) struct ExhaustedStop;

impl StopPolicy for ExhaustedStop {
    fn should_stop(&self, ctx: &Context) -> Result<bool, AgentError> {
        Ok(ctx.ledger.remaining().is_empty())
    }
}
