//! Terminal output for each command, as text or pretty JSON.

use serde::Serialize;

use focus_core::completion::TodaySession;
use focus_core::model::{Plan, Progression, User, WorkDays, WorkSession};
use services::{DashboardView, HistoryView, ProgressionStatus, SessionEntry};

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn emit<T: Serialize>(self, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }

    pub fn registered(self, user: &User) -> anyhow::Result<()> {
        self.emit(&serde_json::json!({ "user_id": user.id, "username": user.username }), |_| {
            println!("Registered {}. Next: focus onboard", user.username);
        })
    }

    pub fn plan(self, plan: &Plan) -> anyhow::Result<()> {
        self.emit(plan, |plan| println!("{}", plan_line(plan)))
    }

    pub fn today(self, today: &TodaySession) -> anyhow::Result<()> {
        self.emit(today, |today| match today {
            TodaySession::Existing(session) if session.is_rest_day => {
                println!("{}: rest day", session.scheduled_date);
            }
            TodaySession::Existing(session) => {
                println!(
                    "{}: {} min planned, {} [{}]",
                    session.scheduled_date, session.planned_duration, session.status, session.id
                );
            }
            TodaySession::AdHoc {
                planned_duration, ..
            } => {
                println!(
                    "Nothing scheduled today. `focus complete` records an ad-hoc {planned_duration} min session."
                );
            }
        })
    }

    pub fn session(self, session: &WorkSession) -> anyhow::Result<()> {
        self.emit(session, |s| {
            match (s.actual_duration, s.difficulty_rating) {
                (Some(actual), Some(rating)) => println!(
                    "{}: {} ({actual} of {} min, {rating})",
                    s.scheduled_date, s.status, s.planned_duration
                ),
                _ => println!("{}: {}", s.scheduled_date, s.status),
            }
            if let Some(notes) = &s.notes {
                println!("  {notes}");
            }
        })
    }

    pub fn dashboard(self, view: &DashboardView) -> anyhow::Result<()> {
        self.emit(view, |view| {
            println!("{}", plan_line(&view.plan));
            println!(
                "Streak: {} | This week: {} sessions, {} min | All time: {} h",
                view.stats.streak,
                view.stats.sessions_this_week,
                view.stats.total_focus_minutes,
                view.stats.total_focus_hours
            );
            println!("Last 7 days:");
            print_entries(&view.week);
        })
    }

    pub fn history(self, view: &HistoryView) -> anyhow::Result<()> {
        self.emit(view, |view| {
            println!("{}", view.month);
            if view.sessions.is_empty() {
                println!("  (no sessions)");
            }
            print_entries(&view.sessions);
            println!(
                "All time: {} sessions, {} h, longest streak {}",
                view.stats.total_sessions, view.stats.total_hours, view.stats.longest_streak
            );
            let ratings: Vec<String> = view
                .stats
                .ratings
                .iter()
                .map(|(rating, count)| format!("{rating} {count}"))
                .collect();
            println!("Ratings: {}", ratings.join(", "));
        })
    }

    pub fn progression_status(self, status: Option<&ProgressionStatus>) -> anyhow::Result<()> {
        self.emit(&status, |status| {
            let Some(status) = status else {
                println!("No plan yet. Next: focus onboard");
                return;
            };
            println!("{}", plan_line(&status.plan));
            let eval = &status.evaluation;
            println!(
                "Weeks at this level: {}. {}",
                eval.weeks_at_level,
                if eval.is_eligible {
                    "Ready to progress."
                } else {
                    "Not yet eligible."
                }
            );
            if status.at_ceiling {
                println!("Already at the top tier.");
            } else {
                println!(
                    "Suggested: {} x{} per week",
                    eval.suggestion.duration, eval.suggestion.frequency
                );
            }
        })
    }

    pub fn progression(self, progression: &Progression) -> anyhow::Result<()> {
        self.emit(progression, |p| println!("{}", progression_line(p)))
    }

    pub fn progressions(self, progressions: &[Progression]) -> anyhow::Result<()> {
        self.emit(&progressions, |list| {
            if list.is_empty() {
                println!("No progressions yet.");
            }
            for p in *list {
                println!("{}", progression_line(p));
            }
        })
    }

    pub fn message(self, text: &str) -> anyhow::Result<()> {
        self.emit(&serde_json::json!({ "message": text }), |_| println!("{text}"))
    }
}

fn day_names(days: WorkDays) -> String {
    days.indices()
        .into_iter()
        .filter_map(|i| WEEKDAY_NAMES.get(usize::from(i)).copied())
        .collect::<Vec<_>>()
        .join(", ")
}

fn plan_line(plan: &Plan) -> String {
    format!(
        "Plan: {} x{} per week on {} (week {} at this level)",
        plan.focus_duration(),
        plan.days_per_week(),
        day_names(plan.work_days()),
        plan.current_progression_week()
    )
}

fn progression_line(p: &Progression) -> String {
    format!(
        "{} {}: {} x{} -> {} x{}",
        p.created_at.date_naive(),
        p.progression_type,
        p.previous_duration,
        p.previous_frequency,
        p.new_duration,
        p.new_frequency
    )
}

fn print_entries(entries: &[SessionEntry]) {
    for entry in entries {
        let s = &entry.session;
        let minutes = s
            .actual_duration
            .map_or_else(|| format!("{} min", s.planned_duration), |m| format!("{m} min done"));
        println!(
            "  {} {:<9} {}{}",
            s.scheduled_date,
            entry.effective_status.as_str(),
            minutes,
            if s.is_rest_day { " (rest)" } else { "" }
        );
    }
}
