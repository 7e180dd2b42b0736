mod auth;
mod config;
mod render;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use focus_core::input::{
    CompleteSessionInput, CompletionForm, Credentials, PlanForm, PlanInput, ProgressionRequest,
    WorkDaysField, YearMonth,
};
use focus_core::model::{SessionId, UserId};
use services::{AppServices, Fallback, ServiceError};

use crate::auth::LocalAuthenticator;
use crate::config::AppConfig;
use crate::render::Output;

#[derive(Parser)]
#[command(name = "focus", version, about = "Plan, log and progress daily focus sessions")]
struct Cli {
    /// SQLite URL; overrides FOCUS_DB_URL.
    #[arg(long, global = true)]
    db: Option<String>,
    #[arg(long, short = 'u', global = true, env = "FOCUS_USER")]
    user: Option<String>,
    #[arg(long, global = true, env = "FOCUS_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Pin "today" (YYYY-MM-DD); overrides FOCUS_TODAY.
    #[arg(long, global = true, value_parser = parse_today)]
    today: Option<NaiveDate>,
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Register,
    /// Create the first plan and schedule the coming weeks
    Onboard(PlanArgs),
    /// Show or change the active plan
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Today's session
    Today,
    /// Record a finished session (today's, unless --session-id is given)
    Complete(CompleteArgs),
    /// Skip a scheduled session (today's, unless --session-id is given)
    Skip {
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Dashboard: streak, last seven days, totals
    Stats,
    /// Sessions for one month plus all-time statistics
    History {
        /// YYYY-MM; defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Difficulty progression
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
    /// Delete the account and all its data
    DeleteAccount,
}

#[derive(Subcommand)]
enum PlanAction {
    Show,
    Update(PlanArgs),
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Eligibility and the suggested next tier
    Status,
    /// Take the suggestion once eligible
    Accept,
    /// Take the suggestion now
    Apply,
    /// Move to an explicit tier
    Custom {
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        days_per_week: u8,
    },
    /// Past progressions, newest first
    List,
}

#[derive(Args)]
struct PlanArgs {
    /// Minutes per session: 15, 25, 45, 60 or 90.
    #[arg(long)]
    duration: String,
    #[arg(long)]
    days_per_week: String,
    /// Weekday numbers, Sunday = 0, e.g. 1,3,5.
    #[arg(long, value_delimiter = ',', required = true)]
    work_days: Vec<String>,
}

impl PlanArgs {
    fn into_input(self) -> anyhow::Result<PlanInput> {
        Ok(PlanInput::parse(&PlanForm {
            focus_duration: self.duration,
            days_per_week: self.days_per_week,
            work_days: WorkDaysField::Values(self.work_days),
        })?)
    }
}

#[derive(Args)]
struct CompleteArgs {
    #[arg(long)]
    session_id: Option<String>,
    /// Minutes actually worked.
    #[arg(long)]
    actual: String,
    /// easy, just_right or challenging.
    #[arg(long)]
    rating: String,
    #[arg(long)]
    notes: Option<String>,
}

fn parse_today(raw: &str) -> Result<NaiveDate, String> {
    config::parse_date("--today", raw).map_err(|e| e.to_string())
}

/// `mode=rwc` creates the file but not its directory.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    let Some(rest) = db_url.strip_prefix("sqlite:") else {
        anyhow::bail!("unsupported database url: {db_url}");
    };
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(':') || path.starts_with("file:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

async fn dispatch(
    app: &AppServices,
    out: Output,
    user_id: UserId,
    token: &str,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Register => anyhow::bail!("register runs before sign-in"),
        Command::Onboard(args) => {
            let plan = app.plans().create_plan(user_id, args.into_input()?).await?;
            out.plan(&plan)
        }
        Command::Plan { action } => match action {
            PlanAction::Show => out.plan(&app.plans().active_plan(user_id).await?),
            PlanAction::Update(args) => {
                let plan = app.plans().update_plan(user_id, args.into_input()?).await?;
                out.plan(&plan)
            }
        },
        Command::Today => out.today(&app.sessions().current_session(user_id).await?),
        Command::Complete(args) => {
            let (session_id, plan_id) = match args.session_id {
                Some(id) => {
                    let plan = app.plans().active_plan(user_id).await?;
                    (Some(id), plan.id().to_string())
                }
                None => {
                    let today = app.sessions().current_session(user_id).await?;
                    (
                        today.session_id().map(|id| id.to_string()),
                        today.plan_id().to_string(),
                    )
                }
            };
            let input = CompleteSessionInput::parse(&CompletionForm {
                session_id,
                plan_id,
                actual_duration: args.actual,
                difficulty_rating: args.rating,
                notes: args.notes,
            })?;
            out.session(&app.sessions().complete_session(user_id, input).await?)
        }
        Command::Skip { session_id } => {
            let id = match session_id {
                Some(raw) => raw
                    .trim()
                    .parse::<SessionId>()
                    .with_context(|| format!("invalid session id: {raw}"))?,
                None => app
                    .sessions()
                    .current_session(user_id)
                    .await?
                    .session_id()
                    .context("nothing is scheduled today")?,
            };
            out.session(&app.sessions().skip_session(user_id, id).await?)
        }
        Command::Stats => out.dashboard(&app.dashboard().dashboard(user_id).await?),
        Command::History { month } => {
            let month = match month {
                Some(raw) => YearMonth::parse(&raw)?,
                None => app.history().current_month(),
            };
            out.history(&app.history().history(user_id, month).await?)
        }
        Command::Progress { action } => {
            let request = match action {
                ProgressAction::Status => {
                    let status = app.progression().progression_status(user_id).await?;
                    return out.progression_status(status.as_ref());
                }
                ProgressAction::List => {
                    return out.progressions(&app.progression().list_progressions(user_id).await?);
                }
                ProgressAction::Accept => ProgressionRequest::AcceptSuggestion,
                ProgressAction::Apply => ProgressionRequest::ApplySuggestion,
                ProgressAction::Custom {
                    duration,
                    days_per_week,
                } => ProgressionRequest::custom(duration, days_per_week)?,
            };
            let (progression, _plan) = app.progression().progress(user_id, request).await?;
            out.progression(&progression)
        }
        Command::DeleteAccount => {
            app.accounts().delete_account(user_id, Some(token)).await?;
            out.message("Account deleted.")
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_url = db;
    }
    if let Some(today) = cli.today {
        config.today = Some(today);
    }
    let clock = config.clock();

    let (Some(username), Some(password)) = (cli.user, cli.password) else {
        anyhow::bail!("--user and --password are required (or FOCUS_USER / FOCUS_PASSWORD)");
    };
    let credentials = Credentials::parse(&username, &password)?;

    prepare_sqlite_file(&config.db_url)?;
    let auth = Arc::new(LocalAuthenticator::new(clock, config.session_ttl));
    let app = AppServices::new_sqlite(&config.db_url, clock, config.horizon_weeks, auth.clone())
        .await
        .with_context(|| format!("opening {}", config.db_url))?;
    let out = Output { json: cli.json };

    if matches!(cli.command, Command::Register) {
        let (user, session) = app.accounts().register(&credentials).await?;
        app.accounts().sign_out(&session.token).await?;
        return out.registered(&user);
    }

    let (_, session) = app.accounts().sign_in(&credentials).await?;
    tracing::debug!(expires_at = %session.expires_at, "signed in");
    let user_id = auth
        .resolve(&session.token)
        .await
        .context("session expired")?;

    let result = dispatch(&app, out, user_id, &session.token, cli.command).await;
    app.accounts().sign_out(&session.token).await?;
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("focus=info,services=info,storage=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        let fallback = err
            .downcast_ref::<ServiceError>()
            .and_then(ServiceError::fallback);
        match fallback {
            Some(Fallback::Onboarding) => {
                eprintln!("No plan yet. Run `focus onboard --duration 25 --days-per-week 3 --work-days 1,3,5`.");
            }
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "focus",
            "complete",
            "--actual",
            "30",
            "--rating",
            "easy",
            "--user",
            "alice",
            "--password",
            "secret1",
            "--today",
            "2023-11-14",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2023, 11, 14));
        assert!(matches!(cli.command, Command::Complete(ref a) if a.actual == "30"));
    }

    #[test]
    fn plan_args_split_work_days() {
        let cli = Cli::try_parse_from([
            "focus",
            "onboard",
            "--duration",
            "45",
            "--days-per-week",
            "3",
            "--work-days",
            "1,3,5",
        ])
        .unwrap();
        let Command::Onboard(args) = cli.command else {
            panic!("expected onboard");
        };
        let input = args.into_input().unwrap();
        assert_eq!(input.work_days.indices(), vec![1, 3, 5]);
    }

    #[test]
    fn rejects_malformed_today() {
        assert!(Cli::try_parse_from(["focus", "today", "--today", "11/14/2023"]).is_err());
    }

    #[test]
    fn sqlite_paths_get_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("focus-prep-{}", std::process::id()));
        let url = format!("sqlite:{}?mode=rwc", dir.join("nested/db.sqlite3").display());
        prepare_sqlite_file(&url).unwrap();
        assert!(dir.join("nested").is_dir());
        std::fs::remove_dir_all(&dir).unwrap();

        prepare_sqlite_file("sqlite::memory:").unwrap();
        assert!(prepare_sqlite_file("postgres://x").is_err());
    }
}
