pub mod config;
pub mod inspect;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use adapquest_core::{Survey, SurveyDefinition};
use anyhow::{Context, Result};
use tracing::debug;

/// Read a survey definition and validate it against its model.
pub(crate) fn load_survey(path: &Path) -> Result<Arc<Survey>> {
    let definition = SurveyDefinition::load(path)
        .with_context(|| format!("failed to read survey {}", path.display()))?;
    debug!(name = %definition.name, questions = definition.questions.len(), "survey loaded");
    let survey = definition
        .into_survey()
        .with_context(|| format!("invalid survey {}", path.display()))?;
    Ok(Arc::new(survey))
}

#[cfg(test)]
pub(crate) fn demo_survey_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("demos")
        .join("survey.json")
}
