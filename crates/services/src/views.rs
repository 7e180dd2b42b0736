//! Read models handed to the host for rendering.

use chrono::NaiveDate;
use serde::Serialize;

use focus_core::completion::TodaySession;
use focus_core::evaluator::Evaluation;
use focus_core::input::YearMonth;
use focus_core::model::{Plan, SessionStatus, WorkSession};
use focus_core::stats::{DashboardStats, HistoryStats};

/// A ledger row together with the status it reads as on the day it is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    #[serde(flatten)]
    pub session: WorkSession,
    pub effective_status: SessionStatus,
}

impl SessionEntry {
    #[must_use]
    pub fn new(session: WorkSession, as_of: NaiveDate) -> Self {
        let effective_status = session.effective_status(as_of);
        Self {
            session,
            effective_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub plan: Plan,
    pub today: TodaySession,
    /// Rows dated within the last seven days, oldest first.
    pub week: Vec<SessionEntry>,
    pub stats: DashboardStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
    pub month: String,
    pub sessions: Vec<SessionEntry>,
    pub stats: HistoryStats,
}

impl HistoryView {
    #[must_use]
    pub fn new(month: YearMonth, sessions: Vec<SessionEntry>, stats: HistoryStats) -> Self {
        Self {
            month: month.to_string(),
            sessions,
            stats,
        }
    }
}

/// Progression screen: where the plan stands and what comes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionStatus {
    pub plan: Plan,
    pub evaluation: Evaluation,
    pub at_ceiling: bool,
}
