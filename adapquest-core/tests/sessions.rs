//! Concurrency tests for SurveyManager
//!
//! Sessions are independent: many respondents can run surveys at once
//! against one manager and each ends with its own state.

mod common;

use std::sync::Arc;

use adapquest_core::{EngineConfig, ScoreBounds, SessionToken, SurveyManager, SurveySettings};
use chrono::Utc;
use common::identical_survey;

async fn drive(manager: &SurveyManager, token: &SessionToken, correct: bool) -> usize {
    let mut asked = 0;
    while !manager.is_finished(token).await.unwrap() {
        let Some(question) = manager.next_question(token).await.unwrap() else {
            break;
        };
        let state = usize::from(correct);
        let answer = question
            .answers
            .iter()
            .find(|a| a.state == state)
            .unwrap()
            .id;
        assert_eq!(
            manager.check_answers(token, question.id, &[answer]).await.unwrap(),
            1
        );
        asked += 1;
    }
    asked
}

fn settings() -> SurveySettings {
    SurveySettings {
        skill_score: ScoreBounds {
            lower: 0.2,
            upper: 1.0,
        },
        ..SurveySettings::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_finish_independently() {
    let manager = Arc::new(
        SurveyManager::new(&EngineConfig {
            workers: 2,
            ..EngineConfig::default()
        })
        .unwrap(),
    );
    let survey = identical_survey(10, settings());

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = Arc::clone(&manager);
        let survey = Arc::clone(&survey);
        handles.push(tokio::spawn(async move {
            let token = manager.init(survey, Utc::now()).await.unwrap();
            let correct = i % 2 == 0;
            let asked = drive(&manager, &token, correct).await;
            (token, correct, asked)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert_eq!(manager.session_count().await, 8);

    for (token, correct, asked) in results {
        assert_eq!(asked, 3);
        let state = manager.complete(&token).await.unwrap();
        assert_eq!(state.total_answers, 3);
        let high = state.probabilities["A"].value_at(1);
        assert_eq!(high > 0.5, correct);
    }
    assert_eq!(manager.session_count().await, 0);
}

#[tokio::test]
async fn finished_session_reports_no_next_question() {
    let manager = SurveyManager::new(&EngineConfig::default()).unwrap();
    let token = manager
        .init(identical_survey(10, settings()), Utc::now())
        .await
        .unwrap();
    drive(&manager, &token, true).await;
    assert!(manager.is_finished(&token).await.unwrap());
    assert!(manager.next_question(&token).await.is_err());
}
