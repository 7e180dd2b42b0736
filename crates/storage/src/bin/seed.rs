use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use focus_core::generator;
use focus_core::model::{
    DifficultyRating, FocusDuration, Plan, PlanId, SessionStatus, WorkDays,
};
use storage::repository::Storage;

/// Replaces the user's plan and fills in past sessions so dashboards have data.
/// The account must already exist (register it with the focus CLI first).
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// SQLite URL.
    #[arg(
        long = "db",
        env = "FOCUS_DB_URL",
        default_value = "sqlite:focus.sqlite3",
        value_parser = parse_db_url
    )]
    db_url: String,
    /// Existing account to seed.
    #[arg(long, env = "FOCUS_SEED_USER")]
    username: String,
    /// Focus duration tier: 15, 25, 45, 60 or 90.
    #[arg(long, default_value = "25", value_parser = parse_duration)]
    duration: FocusDuration,
    /// Weekday indices, 0 = Sunday.
    #[arg(long, default_value = "1,2,3,4", value_parser = parse_work_days)]
    work_days: WorkDays,
    /// Days of past sessions to create.
    #[arg(long = "history", env = "FOCUS_SEED_HISTORY", default_value_t = 21)]
    history_days: u32,
    /// Fixed current date (YYYY-MM-DD) for deterministic seeding.
    #[arg(long, value_parser = parse_today)]
    today: Option<NaiveDate>,
}

fn parse_db_url(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("database URL is empty".into());
    }
    Ok(raw.to_owned())
}

fn parse_duration(raw: &str) -> Result<FocusDuration, String> {
    raw.parse::<u32>()
        .ok()
        .and_then(|m| FocusDuration::from_minutes(m).ok())
        .ok_or_else(|| format!("expected 15, 25, 45, 60 or 90, got {raw}"))
}

fn parse_work_days(raw: &str) -> Result<WorkDays, String> {
    let invalid = || format!("expected weekday indices like 1,2,3,4, got {raw}");
    let indices = raw
        .split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    WorkDays::from_indices(indices).map_err(|_| invalid())
}

fn parse_today(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM-DD, got {raw}"))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = Utc::now();
    let today = args.today.unwrap_or_else(|| now.date_naive());

    let user = storage
        .users
        .find_user_by_username(&args.username)
        .await?
        .ok_or_else(|| format!("no account named {}", args.username))?;

    let days_per_week = u8::try_from(args.work_days.len())?;
    let plan = Plan::new(
        PlanId::generate(),
        user.id,
        args.duration,
        days_per_week,
        args.work_days,
        now,
    )?;

    let start = today - Duration::days(i64::from(args.history_days));
    let horizon_weeks = args.history_days.div_ceil(7) + generator::DEFAULT_HORIZON_WEEKS;
    let mut drafts = generator::generate(
        user.id,
        plan.id(),
        plan.focus_duration(),
        plan.work_days(),
        horizon_weeks,
        start,
        now,
    );

    // Complete most past work days; leave every fifth one pending so it reads as missed.
    let mut completed = 0_u32;
    for (i, session) in drafts
        .iter_mut()
        .filter(|s| s.scheduled_date < today && !s.is_rest_day)
        .enumerate()
    {
        if i % 5 == 3 {
            continue;
        }
        let rating = DifficultyRating::ALL[i % DifficultyRating::ALL.len()];
        session.status = SessionStatus::Completed;
        session.actual_duration = Some(session.planned_duration);
        session.difficulty_rating = Some(rating);
        session.completed_at = Some(now);
        completed += 1;
    }

    let written = storage.ledger.activate_plan(&plan, &drafts, start).await?;

    println!(
        "Seeded {} with a {} plan: {written} rows ({completed} completed) into {}",
        user.username, plan.focus_duration(), args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
