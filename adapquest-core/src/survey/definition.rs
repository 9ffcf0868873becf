//! Serialized survey bundle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Question, Skill, Survey, SurveySettings};
use crate::error::SurveyError;
use crate::model::uai;

/// JSON form of a survey.
///
/// The model is UAI text, given inline as `model` or read from `model_path`,
/// which is resolved relative to the definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: SurveySettings,
    pub skills: Vec<Skill>,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

impl SurveyDefinition {
    pub fn from_json(text: &str) -> Result<Self, SurveyError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a definition file, inlining the model from `model_path` if needed.
    pub fn load(path: &Path) -> Result<Self, SurveyError> {
        let mut definition = Self::from_json(&std::fs::read_to_string(path)?)?;
        if definition.model.is_none()
            && let Some(model_path) = &definition.model_path
        {
            let resolved = match path.parent() {
                Some(dir) if model_path.is_relative() => dir.join(model_path),
                _ => model_path.clone(),
            };
            debug!(path = %resolved.display(), "reading survey model");
            definition.model = Some(std::fs::read_to_string(resolved)?);
        }
        Ok(definition)
    }

    /// Parse the model and validate the survey against it.
    pub fn into_survey(self) -> Result<Survey, SurveyError> {
        let text = self.model.ok_or(SurveyError::MissingModel)?;
        let model = uai::parse(&text)?;
        Survey::new(self.settings, model, self.skills, self.questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::AdaptiveMode;

    const MODEL: &str = "BAYES 2 2 2 2 1 0 2 0 1 2 0.5 0.5 4 0.9 0.1 0.2 0.8";

    fn definition_json(model_field: &str) -> String {
        format!(
            r#"{{
                "name": "demo",
                "settings": {{ "mode": "simple" }},
                "skills": [{{ "id": 1, "name": "A", "variable": 0 }}],
                "questions": [{{
                    "id": 1,
                    "skills": ["A"],
                    "answers": [
                        {{ "id": 1, "variable": 1, "state": 0 }},
                        {{ "id": 2, "variable": 1, "state": 1 }}
                    ]
                }}],
                {model_field}
            }}"#
        )
    }

    #[test]
    fn inline_model_builds_survey() {
        let json = definition_json(&format!(r#""model": "{MODEL}""#));
        let definition = SurveyDefinition::from_json(&json).unwrap();
        assert_eq!(definition.name, "demo");
        let survey = definition.into_survey().unwrap();
        assert_eq!(survey.settings().mode, AdaptiveMode::Simple);
        assert_eq!(survey.questions().len(), 1);
    }

    #[test]
    fn missing_model_is_reported() {
        let json = definition_json(r#""description": "no model""#);
        let definition = SurveyDefinition::from_json(&json).unwrap();
        assert!(matches!(
            definition.into_survey(),
            Err(SurveyError::MissingModel)
        ));
    }

    #[test]
    fn load_resolves_model_path_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.uai"), MODEL).unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, definition_json(r#""model_path": "model.uai""#)).unwrap();

        let definition = SurveyDefinition::load(&path).unwrap();
        assert_eq!(definition.model.as_deref(), Some(MODEL));
        assert!(definition.into_survey().is_ok());
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            SurveyDefinition::from_json("{ not json"),
            Err(SurveyError::Json(_))
        ));
    }
}
