//! Question bookkeeping for one session.
//!
//! Questions and skills are referred to by position: questions by their
//! index in [`Survey::questions`], skills by a *slot* counting only tracked
//! skills (everything except `NoSkill`) in variable order.

use std::collections::VecDeque;

use tracing::debug;

use crate::survey::{Survey, SurveySettings};

#[derive(Debug, Clone)]
pub(crate) struct Ledger {
    /// Survey skill position of each slot.
    skills: Vec<usize>,
    /// Slots informed by each question.
    question_skills: Vec<Vec<usize>>,
    /// Unasked questions, definition order.
    remaining: Vec<usize>,
    /// Forced questions: examples first, then mandatory ones.
    mandatory: VecDeque<usize>,
    done: Vec<usize>,
    available: Vec<Vec<usize>>,
    done_per_skill: Vec<usize>,
    /// Last gain computed for each question.
    scores: Vec<f64>,
}

impl Ledger {
    pub fn new(survey: &Survey) -> Self {
        let skills: Vec<usize> = survey
            .skills()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_tracked())
            .map(|(position, _)| position)
            .collect();

        let question_skills: Vec<Vec<usize>> = survey
            .questions()
            .iter()
            .map(|q| {
                q.skills
                    .iter()
                    .filter_map(|name| {
                        skills
                            .iter()
                            .position(|&p| survey.skills()[p].name == *name)
                    })
                    .collect()
            })
            .collect();

        let questions = survey.questions();
        let examples = (0..questions.len()).filter(|&q| questions[q].is_example);
        let mandatory = (0..questions.len())
            .filter(|&q| questions[q].mandatory && !questions[q].is_example);

        let mut available = vec![Vec::new(); skills.len()];
        for (question, slots) in question_skills.iter().enumerate() {
            for &slot in slots {
                available[slot].push(question);
            }
        }

        Self {
            done_per_skill: vec![0; skills.len()],
            skills,
            question_skills,
            remaining: (0..questions.len()).collect(),
            mandatory: examples.chain(mandatory).collect(),
            done: Vec::new(),
            available,
            scores: vec![0.0; questions.len()],
        }
    }

    /// Number of tracked skills.
    pub fn slots(&self) -> usize {
        self.skills.len()
    }

    /// Survey skill position of `slot`.
    pub fn skill(&self, slot: usize) -> usize {
        self.skills[slot]
    }

    pub fn question_skills(&self, question: usize) -> &[usize] {
        &self.question_skills[question]
    }

    pub fn remaining(&self) -> &[usize] {
        &self.remaining
    }

    pub fn is_remaining(&self, question: usize) -> bool {
        self.remaining.contains(&question)
    }

    pub fn available(&self, slot: usize) -> &[usize] {
        &self.available[slot]
    }

    pub fn done_in(&self, slot: usize) -> usize {
        self.done_per_skill[slot]
    }

    /// Questions registered so far.
    pub fn total(&self) -> usize {
        self.done.len()
    }

    pub fn mandatory(&self) -> impl Iterator<Item = usize> + '_ {
        self.mandatory.iter().copied()
    }

    pub fn next_mandatory(&self) -> Option<usize> {
        self.mandatory.front().copied()
    }

    pub fn score(&self, question: usize) -> f64 {
        self.scores[question]
    }

    pub fn set_score(&mut self, question: usize, score: f64) {
        self.scores[question] = score;
    }

    /// Move `question` from every pending pool to the done pools.
    pub fn register(&mut self, question: usize) {
        self.remaining.retain(|&q| q != question);
        self.mandatory.retain(|&q| q != question);
        for &slot in &self.question_skills[question] {
            self.available[slot].retain(|&q| q != question);
            self.done_per_skill[slot] += 1;
        }
        self.done.push(question);
    }

    /// Whether `slot` may still receive questions given its current score.
    ///
    /// Checked in order: questions left, per-skill minimum, per-skill maximum,
    /// survey minimum, score bounds.
    pub fn is_skill_valid(&self, slot: usize, score: f64, settings: &SurveySettings) -> bool {
        let done = self.done_per_skill[slot];
        let verdict = if self.available[slot].is_empty() {
            Err("no questions left")
        } else if done <= settings.question_per_skill_min {
            Ok(())
        } else if done > settings.question_per_skill_max {
            Err("per-skill maximum reached")
        } else if self.total() < settings.question_total_min {
            Ok(())
        } else if !settings.skill_score.contains(score) {
            Err("score outside bounds")
        } else {
            Ok(())
        };
        if let Err(reason) = verdict {
            debug!(slot, done, score, reason, "skill not eligible");
        }
        verdict.is_ok()
    }

    /// Whether `slot` will not receive further questions regardless of its score.
    pub fn is_completed(&self, slot: usize, settings: &SurveySettings) -> bool {
        self.done_per_skill[slot] > settings.question_per_skill_max
            || self.available[slot].is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BayesianNetwork, Node};
    use crate::survey::{AnswerId, Question, QuestionAnswer, QuestionId, ScoreBounds, Skill};

    fn question(id: u64, variable: usize, skill: &str) -> Question {
        Question {
            id: QuestionId::new(id),
            name: format!("Q{id}"),
            text: String::new(),
            skills: vec![skill.to_string()],
            answers: vec![QuestionAnswer {
                id: AnswerId::new(id * 10),
                text: String::new(),
                variable: Some(variable),
                state: 0,
                correct: false,
                direct_evidence: vec![],
            }],
            mandatory: false,
            is_example: false,
            multiple_choice: false,
            multiple_skills: false,
            yes_only: false,
        }
    }

    /// Skills A (var 0), NoSkill (var 1); questions 0..=3 on A, 4 on NoSkill.
    fn survey() -> Survey {
        let mut model = BayesianNetwork::new();
        model.insert(0, Node::new(0, 2, vec![], vec![0.5, 0.5]).unwrap());
        model.insert(1, Node::new(1, 2, vec![], vec![0.5, 0.5]).unwrap());
        for v in 2..=6 {
            let parent = if v == 6 { 1 } else { 0 };
            model.insert(
                v,
                Node::new(v, 2, vec![(parent, 2)], vec![0.7, 0.3, 0.4, 0.6]).unwrap(),
            );
        }
        let skills = vec![
            Skill {
                id: 1,
                name: "A".to_string(),
                variable: 0,
                states: vec![],
            },
            Skill {
                id: 2,
                name: Skill::NO_SKILL.to_string(),
                variable: 1,
                states: vec![],
            },
        ];
        let mut questions: Vec<Question> = (0..4).map(|i| question(i, 2 + i as usize, "A")).collect();
        questions.push(question(4, 6, Skill::NO_SKILL));
        questions[2].mandatory = true;
        questions[3].is_example = true;
        Survey::new(SurveySettings::default(), model, skills, questions).unwrap()
    }

    #[test]
    fn no_skill_is_excluded_from_slots() {
        let ledger = Ledger::new(&survey());
        assert_eq!(ledger.slots(), 1);
        assert_eq!(ledger.skill(0), 0);
        assert!(ledger.question_skills(4).is_empty());
        assert_eq!(ledger.available(0), &[0, 1, 2, 3]);
    }

    #[test]
    fn examples_come_before_mandatory_questions() {
        let ledger = Ledger::new(&survey());
        assert_eq!(ledger.mandatory().collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(ledger.next_mandatory(), Some(3));
    }

    #[test]
    fn register_moves_question_to_done() {
        let mut ledger = Ledger::new(&survey());
        ledger.register(3);
        assert!(!ledger.is_remaining(3));
        assert_eq!(ledger.next_mandatory(), Some(2));
        assert_eq!(ledger.available(0), &[0, 1, 2]);
        assert_eq!(ledger.done_in(0), 1);
        assert_eq!(ledger.total(), 1);
    }

    #[test]
    fn per_skill_minimum_overrides_score_bounds() {
        let mut ledger = Ledger::new(&survey());
        let settings = SurveySettings {
            question_per_skill_min: 1,
            skill_score: ScoreBounds {
                lower: 0.5,
                upper: 1.0,
            },
            ..SurveySettings::default()
        };
        ledger.register(0);
        assert!(ledger.is_skill_valid(0, 0.1, &settings));
        ledger.register(1);
        assert!(!ledger.is_skill_valid(0, 0.1, &settings));
        assert!(ledger.is_skill_valid(0, 0.7, &settings));
    }

    #[test]
    fn per_skill_maximum_is_a_hard_cap() {
        let mut ledger = Ledger::new(&survey());
        let settings = SurveySettings {
            question_per_skill_max: 1,
            question_total_min: 10,
            ..SurveySettings::default()
        };
        ledger.register(0);
        assert!(ledger.is_skill_valid(0, 0.5, &settings));
        ledger.register(1);
        assert!(!ledger.is_skill_valid(0, 0.5, &settings));
        assert!(ledger.is_completed(0, &settings));
    }

    #[test]
    fn survey_minimum_overrides_score_bounds() {
        let mut ledger = Ledger::new(&survey());
        let settings = SurveySettings {
            question_total_min: 3,
            skill_score: ScoreBounds {
                lower: 0.5,
                upper: 1.0,
            },
            ..SurveySettings::default()
        };
        ledger.register(0);
        assert!(ledger.is_skill_valid(0, 0.1, &settings));
    }

    #[test]
    fn skill_without_questions_is_invalid_and_completed() {
        let mut ledger = Ledger::new(&survey());
        for q in 0..4 {
            ledger.register(q);
        }
        let settings = SurveySettings::default();
        assert!(!ledger.is_skill_valid(0, 0.5, &settings));
        assert!(ledger.is_completed(0, &settings));
    }

    #[test]
    fn scores_are_tracked_per_question() {
        let mut ledger = Ledger::new(&survey());
        ledger.set_score(1, 0.25);
        assert_eq!(ledger.score(1), 0.25);
        assert_eq!(ledger.score(0), 0.0);
    }
}
