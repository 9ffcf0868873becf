//! Survey session command.
//!
//! Runs one respondent through a survey, either prompting on the terminal or
//! answering at random from a seed. In assistant mode the respondent picks
//! among all remaining questions ranked by expected information gain.

use std::path::PathBuf;
use std::sync::Arc;

use adapquest_core::{
    AnswerId, EngineConfig, Question, SessionToken, State, Survey, SurveyManager,
};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use dialoguer::{MultiSelect, Select, theme::ColorfulTheme};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::load_survey;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Survey definition file (JSON)
    pub survey: PathBuf,

    /// Pick the next question from a ranked list instead of taking the best one
    #[arg(long)]
    pub assistant: bool,

    /// Answer at random using this seed instead of prompting
    #[arg(long, value_name = "SEED")]
    pub simulate: Option<u64>,

    /// Write the final state to this file as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: RunArgs, engine: &EngineConfig) -> Result<()> {
    let survey = load_survey(&args.survey)?;
    let manager = SurveyManager::new(engine)?;
    let mut respondent = match args.simulate {
        Some(seed) => Respondent::simulated(seed),
        None => Respondent::Interactive,
    };

    let state = run_session(&manager, Arc::clone(&survey), args.assistant, &mut respondent).await?;

    println!();
    println!("{}", state_table(&state));
    println!(
        "Answered {} question(s), average score {:.3}",
        state.total_answers, state.score_average
    );

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("State written to {}", path.display());
    }
    Ok(())
}

/// Source of answers for a session.
enum Respondent {
    Interactive,
    Simulated(StdRng),
}

impl Respondent {
    fn simulated(seed: u64) -> Self {
        Self::Simulated(StdRng::seed_from_u64(seed))
    }

    /// Checked answer ids for `question`.
    fn answer(&mut self, question: &Question) -> Result<Vec<AnswerId>> {
        let options: Vec<_> = question.options().collect();
        if options.is_empty() {
            bail!("question {} has no answers", question.id);
        }
        match self {
            Self::Simulated(rng) if question.multiple_choice => Ok(options
                .iter()
                .filter(|_| rng.gen_bool(0.5))
                .map(|a| a.id)
                .collect()),
            Self::Simulated(rng) => Ok(vec![options[rng.gen_range(0..options.len())].id]),
            Self::Interactive => {
                let items: Vec<&str> = options.iter().map(|a| a.text.as_str()).collect();
                let theme = ColorfulTheme::default();
                if question.multiple_choice {
                    let checked = MultiSelect::with_theme(&theme)
                        .with_prompt(prompt(question))
                        .items(&items)
                        .interact()?;
                    Ok(checked.into_iter().map(|i| options[i].id).collect())
                } else {
                    let chosen = Select::with_theme(&theme)
                        .with_prompt(prompt(question))
                        .items(&items)
                        .default(0)
                        .interact()?;
                    Ok(vec![options[chosen].id])
                }
            }
        }
    }

    /// Index of the question to answer among `ranked` (best first).
    fn pick(&mut self, ranked: &[(&Question, f64)]) -> Result<usize> {
        match self {
            Self::Simulated(_) => Ok(0),
            Self::Interactive => {
                let items: Vec<String> = ranked
                    .iter()
                    .map(|(q, score)| format!("{:<24} gain {score:.4}", prompt(q)))
                    .collect();
                Ok(Select::with_theme(&ColorfulTheme::default())
                    .with_prompt("Which question next?")
                    .items(&items)
                    .default(0)
                    .interact()?)
            }
        }
    }
}

fn prompt(question: &Question) -> &str {
    if question.text.is_empty() {
        &question.name
    } else {
        &question.text
    }
}

/// Run a whole session and return its final state.
async fn run_session(
    manager: &SurveyManager,
    survey: Arc<Survey>,
    assistant: bool,
    respondent: &mut Respondent,
) -> Result<State> {
    let token = manager.init(Arc::clone(&survey), Utc::now()).await?;
    info!(session = %token, assistant, "survey started");

    while !manager.is_finished(&token).await? {
        let question = if assistant {
            match pick_ranked(manager, &token, &survey, respondent).await? {
                Some(question) => question,
                None => break,
            }
        } else {
            match manager.next_question(&token).await? {
                Some(question) => question,
                None => break,
            }
        };

        let checked = respondent.answer(&question)?;
        let accepted = manager.check_answers(&token, question.id, &checked).await?;
        debug!(question = %question.name, accepted, "answered");
    }

    Ok(manager.complete(&token).await?)
}

async fn pick_ranked(
    manager: &SurveyManager,
    token: &SessionToken,
    survey: &Survey,
    respondent: &mut Respondent,
) -> Result<Option<Question>> {
    let ranked = manager.rank_questions(token).await?;
    let candidates: Vec<(&Question, f64)> = ranked
        .iter()
        .filter_map(|r| survey.question(r.id).map(|q| (q, r.score)))
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }
    let index = respondent.pick(&candidates)?;
    Ok(candidates.get(index).map(|(q, _)| (*q).clone()))
}

fn state_table(state: &State) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Skill").fg(Color::Cyan),
        Cell::new("Level").fg(Color::Cyan),
        Cell::new("Distribution").fg(Color::Cyan),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Questions").fg(Color::Cyan),
        Cell::new("Done").fg(Color::Cyan),
    ]);
    for (skill, distribution) in &state.probabilities {
        let probabilities: Vec<String> = distribution
            .as_slice()
            .iter()
            .map(|p| format!("{p:.3}"))
            .collect();
        table.add_row(vec![
            Cell::new(skill),
            Cell::new(state.levels.get(skill).map_or("-", String::as_str)),
            Cell::new(probabilities.join(" / ")),
            Cell::new(format!("{:.3}", state.scores.get(skill).copied().unwrap_or_default())),
            Cell::new(state.questions_per_skill.get(skill).copied().unwrap_or_default()),
            Cell::new(if state.completed_skills.contains(skill) { "yes" } else { "no" }),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::demo_survey_path;

    #[tokio::test]
    async fn simulated_session_respects_question_bounds() {
        let survey = load_survey(&demo_survey_path()).unwrap();
        let manager = SurveyManager::new(&EngineConfig::default()).unwrap();

        let state = run_session(&manager, survey, false, &mut Respondent::simulated(7))
            .await
            .unwrap();

        assert!((2..=6).contains(&state.total_answers));
        assert_eq!(state.probabilities.len(), 2);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn assistant_session_answers_ranked_questions() {
        let survey = load_survey(&demo_survey_path()).unwrap();
        let manager = SurveyManager::new(&EngineConfig::default()).unwrap();

        let state = run_session(&manager, survey, true, &mut Respondent::simulated(7))
            .await
            .unwrap();

        assert!(state.total_answers >= 2);
        assert!(state.total_answers <= 7);
    }

    #[test]
    fn simulated_multiple_choice_checks_only_shown_options() {
        let survey = load_survey(&demo_survey_path()).unwrap();
        let checklist = survey
            .questions()
            .iter()
            .find(|q| q.multiple_choice)
            .unwrap();
        let mut respondent = Respondent::simulated(3);
        for _ in 0..10 {
            let checked = respondent.answer(checklist).unwrap();
            assert!(checked.iter().all(|id| checklist.answer(*id).unwrap().state == 1));
        }
    }

    #[test]
    fn state_table_lists_levels() {
        let state = State {
            created_at: Utc::now(),
            probabilities: [("Algebra".to_string(), adapquest_core::Distribution::new(vec![0.1, 0.9]))]
                .into_iter()
                .collect(),
            scores: [("Algebra".to_string(), 0.469)].into_iter().collect(),
            levels: [("Algebra".to_string(), "proficient".to_string())]
                .into_iter()
                .collect(),
            questions_per_skill: [("Algebra".to_string(), 2)].into_iter().collect(),
            completed_skills: Default::default(),
            score_average: 0.469,
            total_answers: 2,
        };
        let rendered = state_table(&state).to_string();
        assert!(rendered.contains("proficient"));
        assert!(rendered.contains("0.100 / 0.900"));
    }
}
