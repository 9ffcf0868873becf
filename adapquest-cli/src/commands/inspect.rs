//! Survey inspection command.
//!
//! Prints the settings, skills, and questions of a survey definition after
//! validating it against its model.

use std::path::PathBuf;

use adapquest_core::Survey;
use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use super::load_survey;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Survey definition file (JSON)
    pub survey: PathBuf,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let survey = load_survey(&args.survey)?;
    let settings = survey.settings();

    println!("Mode:      {}", settings.mode);
    println!("Scoring:   {}", settings.scoring.build().name());
    println!(
        "Questions: {} (total {}..{})",
        survey.questions().len(),
        settings.question_total_min,
        format_limit(settings.question_total_max)
    );
    println!("Variables: {}", survey.model().len());
    println!();
    println!("{}", skills_table(&survey));
    println!();
    println!("{}", questions_table(&survey));
    Ok(())
}

fn format_limit(limit: usize) -> String {
    if limit == usize::MAX {
        "∞".to_string()
    } else {
        limit.to_string()
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

fn skills_table(survey: &Survey) -> Table {
    let mut table = new_table(&["Skill", "Variable", "States", "Questions"]);
    for skill in survey.skills() {
        let states: Vec<&str> = skill.states.iter().map(|s| s.name.as_str()).collect();
        let questions = survey
            .questions()
            .iter()
            .filter(|q| q.skills.contains(&skill.name))
            .count();
        table.add_row(vec![
            Cell::new(&skill.name),
            Cell::new(skill.variable),
            Cell::new(states.join(", ")),
            Cell::new(questions),
        ]);
    }
    table
}

fn questions_table(survey: &Survey) -> Table {
    let mut table = new_table(&["Id", "Name", "Skills", "Kind", "Answers"]);
    for question in survey.questions() {
        let kind = if question.is_example {
            "example"
        } else if question.multiple_choice && question.yes_only {
            "checklist (yes only)"
        } else if question.multiple_choice {
            "checklist"
        } else {
            "single choice"
        };
        let kind = if question.mandatory && !question.is_example {
            format!("{kind}, mandatory")
        } else {
            kind.to_string()
        };
        table.add_row(vec![
            Cell::new(question.id),
            Cell::new(&question.name),
            Cell::new(question.skills.join(", ")),
            Cell::new(kind),
            Cell::new(question.options().count()),
        ]);
    }
    table
}
