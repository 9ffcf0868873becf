//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use adapquest_core::{
    Agent, AnswerId, BayesianNetwork, Node, Question, QuestionAnswer, QuestionId, Selection,
    Skill, Survey, SurveySettings, new_agent,
};

/// CPT of a binary question under one binary skill: `P(correct | skill)` for both skill states.
pub fn table(low: f64, high: f64) -> Vec<f64> {
    vec![1.0 - low, low, 1.0 - high, high]
}

/// Skill variable 0 with a uniform prior, question variables 1..=n below it.
pub fn one_skill_network(tables: &[Vec<f64>]) -> BayesianNetwork {
    let mut network = BayesianNetwork::new();
    network.insert(0, Node::new(0, 2, vec![], vec![0.5, 0.5]).unwrap());
    for (i, table) in tables.iter().enumerate() {
        let variable = i + 1;
        network.insert(
            variable,
            Node::new(variable, 2, vec![(0, 2)], table.clone()).unwrap(),
        );
    }
    network
}

/// Binary node on binary `parents`.
pub fn node(variable: usize, parents: &[usize], table: Vec<f64>) -> Node {
    Node::new(variable, 2, parents.iter().map(|&p| (p, 2)).collect(), table).unwrap()
}

pub fn skill(id: u64, name: &str, variable: usize) -> Skill {
    Skill {
        id,
        name: name.to_string(),
        variable,
        states: vec![],
    }
}

/// Answer id `variable * 10 + state`.
pub fn answer(variable: usize, state: usize) -> QuestionAnswer {
    QuestionAnswer {
        id: AnswerId::new((variable * 10 + state) as u64),
        text: format!("{variable}={state}"),
        variable: Some(variable),
        state,
        correct: state == 1,
        direct_evidence: vec![],
    }
}

/// Binary question `id` on `variable`, informing `skills`.
pub fn question(id: u64, variable: usize, skills: &[&str]) -> Question {
    Question {
        id: QuestionId::new(id),
        name: format!("Q{id}"),
        text: String::new(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        answers: vec![answer(variable, 0), answer(variable, 1)],
        mandatory: false,
        is_example: false,
        multiple_choice: false,
        multiple_skills: false,
        yes_only: false,
    }
}

/// Multiple choice question `id` with one option per variable.
pub fn multiple_choice(id: u64, variables: &[usize], skills: &[&str]) -> Question {
    Question {
        answers: variables
            .iter()
            .flat_map(|&v| [answer(v, 0), answer(v, 1)])
            .collect(),
        multiple_choice: true,
        multiple_skills: skills.len() > 1,
        ..question(id, variables[0], skills)
    }
}

/// Skill "A" on variable 0 of `network`.
pub fn one_skill(
    settings: SurveySettings,
    network: BayesianNetwork,
    questions: Vec<Question>,
) -> Arc<Survey> {
    Arc::new(Survey::new(settings, network, vec![skill(1, "A", 0)], questions).unwrap())
}

/// Skills "A" on variable 0 and "B" on variable 1 of `network`.
pub fn two_skills(
    settings: SurveySettings,
    network: BayesianNetwork,
    questions: Vec<Question>,
) -> Arc<Survey> {
    let skills = vec![skill(1, "A", 0), skill(2, "B", 1)];
    Arc::new(Survey::new(settings, network, skills, questions).unwrap())
}

/// One skill "A" and one question per table, question `i` on variable `i`.
pub fn one_skill_survey(tables: &[Vec<f64>], settings: SurveySettings) -> Arc<Survey> {
    let questions = (1..=tables.len())
        .map(|i| question(i as u64, i, &["A"]))
        .collect();
    one_skill(settings, one_skill_network(tables), questions)
}

/// `n` identical questions with `P(correct | low) = 0.2` and `P(correct | high) = 0.8`.
pub fn identical_survey(n: usize, settings: SurveySettings) -> Arc<Survey> {
    one_skill_survey(&vec![table(0.2, 0.8); n], settings)
}

pub fn agent(survey: Arc<Survey>, seed: u64) -> Agent {
    let scoring = survey.settings().scoring.build();
    new_agent(survey, seed, scoring).unwrap()
}

/// Drive `agent` until it stops, answering with `pick`. Returns the questions asked.
pub fn run<F>(agent: &mut Agent, mut pick: F) -> Vec<QuestionId>
where
    F: FnMut(&Question) -> Vec<AnswerId>,
{
    let mut asked = Vec::new();
    while !agent.stop().unwrap() {
        match agent.next().unwrap() {
            Selection::Finished => break,
            Selection::Question(id) => {
                let question = agent.survey().question(id).unwrap().clone();
                for answer in pick(&question) {
                    assert!(agent.check(&adapquest_core::Answer::new(id, answer)));
                }
                asked.push(id);
            }
        }
        assert!(asked.len() <= agent.survey().questions().len());
    }
    asked
}

/// Always answer state 1 of the first variable.
pub fn always_correct(question: &Question) -> Vec<AnswerId> {
    question
        .answers
        .iter()
        .filter(|a| a.state == 1)
        .take(1)
        .map(|a| a.id)
        .collect()
}
