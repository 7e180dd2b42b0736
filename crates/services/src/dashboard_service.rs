use std::sync::Arc;

use focus_core::completion::TodaySession;
use focus_core::model::{UserId, WorkSession};
use focus_core::stats::{self, DashboardStats};
use storage::repository::{DateRange, PlanRepository, WorkSessionRepository};

use crate::Clock;
use crate::error::ServiceError;
use crate::views::{DashboardView, SessionEntry};

/// Home screen read model: today's block, the last seven days and headline stats.
#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
    sessions: Arc<dyn WorkSessionRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        plans: Arc<dyn PlanRepository>,
        sessions: Arc<dyn WorkSessionRepository>,
    ) -> Self {
        Self {
            clock,
            plans,
            sessions,
        }
    }

    /// Rows dated `[today - 6, today]`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn week_sessions(&self, user_id: UserId) -> Result<Vec<SessionEntry>, ServiceError> {
        let today = self.clock.today();
        let (start, end) = stats::week_window(today);
        let rows = self
            .sessions
            .find_sessions_by_user(user_id, Some(DateRange::new(start, end)))
            .await?;
        Ok(rows
            .into_iter()
            .map(|s| SessionEntry::new(s, today))
            .collect())
    }

    /// Streak, weekly totals and all-time hours.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn user_stats(&self, user_id: UserId) -> Result<DashboardStats, ServiceError> {
        let desc = self.ledger_desc(user_id).await?;
        Ok(DashboardStats::compute(&desc, self.clock.today()))
    }

    /// Everything the dashboard shows, read once.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NeedsOnboarding` when there is no active plan.
    pub async fn dashboard(&self, user_id: UserId) -> Result<DashboardView, ServiceError> {
        let plan = self
            .plans
            .find_active_plan(user_id)
            .await?
            .ok_or(ServiceError::NeedsOnboarding)?;
        let today = self.clock.today();
        let desc = self.ledger_desc(user_id).await?;

        let todays_row = desc.iter().find(|s| s.scheduled_date == today).cloned();
        let today_session = match todays_row {
            Some(session) => TodaySession::Existing(session),
            None => TodaySession::AdHoc {
                plan_id: plan.id(),
                planned_duration: plan.focus_duration().minutes(),
            },
        };

        let (start, end) = stats::week_window(today);
        let week = desc
            .iter()
            .rev()
            .filter(|s| (start..=end).contains(&s.scheduled_date))
            .cloned()
            .map(|s| SessionEntry::new(s, today))
            .collect();

        let stats = DashboardStats::compute(&desc, today);
        tracing::debug!(%user_id, streak = stats.streak, "dashboard computed");

        Ok(DashboardView {
            plan,
            today: today_session,
            week,
            stats,
        })
    }

    async fn ledger_desc(&self, user_id: UserId) -> Result<Vec<WorkSession>, ServiceError> {
        let mut rows = self.sessions.find_sessions_by_user(user_id, None).await?;
        rows.reverse();
        Ok(rows)
    }
}
