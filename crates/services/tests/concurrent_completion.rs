mod common;

use chrono::Duration;
use focus_core::completion::{Completion, TodaySession};
use focus_core::input::{CompleteSessionInput, Credentials, PlanInput};
use focus_core::model::{DifficultyRating, SessionStatus};
use focus_core::time::{fixed_now, fixed_today};
use services::{AppServices, Clock};
use storage::repository::{DateRange, Storage, WorkSessionRepository};

use common::PlainAuth;

#[tokio::test]
async fn racing_ad_hoc_completions_leave_one_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_url = format!(
        "sqlite:{}?mode=rwc",
        dir.path().join("race.sqlite3").display()
    );
    // Onboard two months back so the generated horizon ends before today.
    let earlier = Clock::fixed(fixed_now() - Duration::days(60));
    let onboarding = AppServices::new_sqlite(&db_url, earlier, 4, PlainAuth::shared())
        .await
        .expect("open services");
    let (user, _) = onboarding
        .accounts()
        .register(&Credentials::parse("racer", "secret1").unwrap())
        .await
        .unwrap();
    let plan = onboarding
        .plans()
        .create_plan(user.id, PlanInput::new(25, 3, &[1, 3, 5]).unwrap())
        .await
        .unwrap();

    let app = AppServices::new_sqlite(&db_url, Clock::fixed(fixed_now()), 4, PlainAuth::shared())
        .await
        .expect("open services");
    let today = app.sessions().current_session(user.id).await.unwrap();
    assert!(matches!(today, TodaySession::AdHoc { .. }));

    let mut handles = Vec::new();
    for minutes in [20_u32, 35] {
        let sessions = app.sessions();
        let user_id = user.id;
        let plan_id = plan.id();
        handles.push(tokio::spawn(async move {
            sessions
                .complete_session(
                    user_id,
                    CompleteSessionInput {
                        session_id: None,
                        plan_id,
                        completion: Completion::new(minutes, DifficultyRating::JustRight, None)
                            .unwrap(),
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("complete");
    }

    let storage = Storage::sqlite(&db_url).await.expect("reopen");
    let rows = storage
        .sessions
        .find_sessions_by_user(user.id, Some(DateRange::new(fixed_today(), fixed_today())))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.status, SessionStatus::Completed);
    assert!(matches!(row.actual_duration, Some(20 | 35)));
    assert!(matches!(row.planned_duration, 20 | 35));
}

#[tokio::test]
async fn racing_update_and_ad_hoc_completion_leave_one_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_url = format!(
        "sqlite:{}?mode=rwc",
        dir.path().join("mixed_race.sqlite3").display()
    );
    let app = AppServices::new_sqlite(&db_url, Clock::fixed(fixed_now()), 4, PlainAuth::shared())
        .await
        .expect("open services");
    let (user, _) = app
        .accounts()
        .register(&Credentials::parse("mixer", "secret1").unwrap())
        .await
        .unwrap();
    let plan = app
        .plans()
        .create_plan(user.id, PlanInput::new(25, 7, &[0, 1, 2, 3, 4, 5, 6]).unwrap())
        .await
        .unwrap();
    let TodaySession::Existing(scheduled) = app.sessions().current_session(user.id).await.unwrap()
    else {
        panic!("today should have a generated row");
    };

    let mut handles = Vec::new();
    for (session_id, minutes) in [(Some(scheduled.id), 20_u32), (None, 35)] {
        let sessions = app.sessions();
        let user_id = user.id;
        let plan_id = plan.id();
        handles.push(tokio::spawn(async move {
            sessions
                .complete_session(
                    user_id,
                    CompleteSessionInput {
                        session_id,
                        plan_id,
                        completion: Completion::new(minutes, DifficultyRating::Easy, None)
                            .unwrap(),
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("complete");
    }

    let storage = Storage::sqlite(&db_url).await.expect("reopen");
    let rows = storage
        .sessions
        .find_sessions_by_user(user.id, Some(DateRange::new(fixed_today(), fixed_today())))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, scheduled.id);
    assert_eq!(row.status, SessionStatus::Completed);
    assert!(matches!(row.actual_duration, Some(20 | 35)));
}
