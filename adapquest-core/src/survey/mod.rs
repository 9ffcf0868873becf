//! Static survey description shared by every agent of a survey.
//!
//! A [`Survey`] ties skills and questions to variables of a validated
//! [`BayesianNetwork`]. It is built once, wrapped in an `Arc`, and never
//! mutated while sessions run.

mod definition;
mod settings;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SurveyError;
use crate::model::{BayesianNetwork, Model, Observations, VarId};

pub use definition::SurveyDefinition;
pub use settings::{AdaptiveMode, ScoreBounds, SurveySettings};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a question within a survey.
    QuestionId
);
id_type!(
    /// Identifier of an answer option within a survey.
    AnswerId
);

/// Named state of a skill variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillState {
    pub name: String,
    pub state: usize,
}

/// A latent variable whose posterior the survey refines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: u64,
    pub name: String,
    pub variable: VarId,
    #[serde(default)]
    pub states: Vec<SkillState>,
}

impl Skill {
    /// Name of the placeholder skill that groups questions without a real skill.
    pub const NO_SKILL: &'static str = "NoSkill";

    /// Whether this skill takes part in scoring and state snapshots.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.name != Self::NO_SKILL
    }
}

/// A (variable, state) pair asserted alongside an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub variable: VarId,
    pub state: usize,
}

/// One selectable answer and the observations it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: AnswerId,
    #[serde(default)]
    pub text: String,
    /// Variable asserted by this answer; `None` for answers that carry no evidence.
    #[serde(default)]
    pub variable: Option<VarId>,
    #[serde(default)]
    pub state: usize,
    #[serde(default)]
    pub correct: bool,
    /// Extra assertions made unconditionally when this answer is chosen.
    #[serde(default)]
    pub direct_evidence: Vec<Evidence>,
}

impl QuestionAnswer {
    /// Fold this answer into `observations`. Returns how many variables were newly observed.
    pub fn observe_into(&self, observations: &mut Observations) -> usize {
        let main = self.variable.map(|v| (v, self.state));
        main.into_iter()
            .chain(self.direct_evidence.iter().map(|e| (e.variable, e.state)))
            .filter(|&(variable, state)| observations.observe(variable, state))
            .count()
    }
}

/// A question and the skills it informs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    /// Names of the skills this question informs.
    pub skills: Vec<String>,
    pub answers: Vec<QuestionAnswer>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub is_example: bool,
    #[serde(default)]
    pub multiple_choice: bool,
    #[serde(default)]
    pub multiple_skills: bool,
    /// Multiple choice where only checked options carry evidence.
    #[serde(default)]
    pub yes_only: bool,
}

impl Question {
    /// Distinct answer variables, in answer order.
    #[must_use]
    pub fn variables(&self) -> Vec<VarId> {
        let mut seen = HashSet::new();
        self.answers
            .iter()
            .filter_map(|a| a.variable)
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// The first answer variable.
    #[must_use]
    pub fn variable(&self) -> Option<VarId> {
        self.answers.iter().find_map(|a| a.variable)
    }

    #[must_use]
    pub fn answer(&self, id: AnswerId) -> Option<&QuestionAnswer> {
        self.answers.iter().find(|a| a.id == id)
    }

    /// The answer asserting `variable = state`.
    #[must_use]
    pub fn answer_for(&self, variable: VarId, state: usize) -> Option<&QuestionAnswer> {
        self.answers
            .iter()
            .find(|a| a.variable == Some(variable) && a.state == state)
    }

    /// Answers shown to a respondent. Multiple choice questions show only their "checked" options.
    pub fn options(&self) -> impl Iterator<Item = &QuestionAnswer> {
        let multiple_choice = self.multiple_choice;
        self.answers
            .iter()
            .filter(move |a| !multiple_choice || a.state == 1)
    }

    /// Map the checked options of a multiple choice question to one answer per option variable.
    ///
    /// A variable with a checked option resolves to its state 1 answer, any other to its
    /// state 0 answer. Variables lacking the needed answer are skipped.
    #[must_use]
    pub fn resolve_checked(&self, checked: &[AnswerId]) -> Vec<&QuestionAnswer> {
        let checked: HashSet<VarId> = checked
            .iter()
            .filter_map(|id| self.answer(*id))
            .filter(|a| a.state == 1)
            .filter_map(|a| a.variable)
            .collect();
        self.variables()
            .into_iter()
            .filter_map(|v| self.answer_for(v, usize::from(checked.contains(&v))))
            .collect()
    }
}

/// A validated survey: settings, model, skills, and questions.
#[derive(Debug)]
pub struct Survey {
    settings: SurveySettings,
    model: Arc<BayesianNetwork>,
    skills: Vec<Skill>,
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl Survey {
    /// Validate the parts against the model and assemble a survey.
    ///
    /// Skills are reordered by variable. Skills declared without states get
    /// numbered state names.
    pub fn new(
        settings: SurveySettings,
        model: BayesianNetwork,
        mut skills: Vec<Skill>,
        questions: Vec<Question>,
    ) -> Result<Self, SurveyError> {
        model.validate()?;

        let mut skill_ids = HashSet::new();
        for skill in &mut skills {
            if !skill_ids.insert(skill.id) {
                return Err(SurveyError::Duplicate {
                    kind: "skill",
                    id: skill.id,
                });
            }
            let size = variable_size(&model, skill.variable, || format!("Skill '{}'", skill.name))?;
            if skill.states.is_empty() {
                skill.states = (0..size)
                    .map(|state| SkillState {
                        name: state.to_string(),
                        state,
                    })
                    .collect();
            } else if skill.states.len() != size {
                return Err(SurveyError::SkillStates {
                    skill: skill.name.clone(),
                    declared: skill.states.len(),
                    actual: size,
                });
            }
        }
        skills.sort_by_key(|s| s.variable);

        let names: HashSet<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        let mut index = HashMap::new();
        let mut answer_ids = HashSet::new();
        for (position, question) in questions.iter().enumerate() {
            if index.insert(question.id, position).is_some() {
                return Err(SurveyError::Duplicate {
                    kind: "question",
                    id: question.id.get(),
                });
            }
            if question.answers.is_empty() {
                return Err(SurveyError::NoAnswers(question.id));
            }
            if let Some(skill) = question.skills.iter().find(|s| !names.contains(s.as_str())) {
                return Err(SurveyError::UnknownSkill {
                    question: question.id,
                    skill: skill.clone(),
                });
            }
            for answer in &question.answers {
                if !answer_ids.insert(answer.id) {
                    return Err(SurveyError::Duplicate {
                        kind: "answer",
                        id: answer.id.get(),
                    });
                }
                let context = || format!("Answer {} of question {}", answer.id, question.id);
                let assertions = answer
                    .variable
                    .map(|v| (v, answer.state))
                    .into_iter()
                    .chain(answer.direct_evidence.iter().map(|e| (e.variable, e.state)));
                for (variable, state) in assertions {
                    let size = variable_size(&model, variable, context)?;
                    if state >= size {
                        return Err(SurveyError::InvalidState {
                            context: context(),
                            variable,
                            state,
                            size,
                        });
                    }
                }
            }
        }

        Ok(Self {
            settings,
            model: Arc::new(model),
            skills,
            questions,
            index,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &SurveySettings {
        &self.settings
    }

    #[must_use]
    pub fn model(&self) -> &Arc<BayesianNetwork> {
        &self.model
    }

    /// Skills ordered by variable.
    #[must_use]
    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// Questions in definition order.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Position of a question in definition order.
    #[must_use]
    pub fn position(&self, id: QuestionId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.position(id).map(|p| &self.questions[p])
    }

    /// Position of the skill named `name` in [`Self::skills`].
    #[must_use]
    pub fn skill_position(&self, name: &str) -> Option<usize> {
        self.skills.iter().position(|s| s.name == name)
    }
}

fn variable_size(
    model: &BayesianNetwork,
    variable: VarId,
    context: impl FnOnce() -> String,
) -> Result<usize, SurveyError> {
    model
        .size(variable)
        .ok_or_else(|| SurveyError::UnknownVariable {
            context: context(),
            variable,
        })
}
