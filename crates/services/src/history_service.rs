use std::sync::Arc;

use focus_core::input::YearMonth;
use focus_core::model::UserId;
use focus_core::stats::HistoryStats;
use storage::repository::{DateRange, WorkSessionRepository};

use crate::Clock;
use crate::error::ServiceError;
use crate::views::{HistoryView, SessionEntry};

/// Month calendar and all-time statistics.
#[derive(Clone)]
pub struct HistoryService {
    clock: Clock,
    sessions: Arc<dyn WorkSessionRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn WorkSessionRepository>) -> Self {
        Self { clock, sessions }
    }

    /// The month containing today.
    #[must_use]
    pub fn current_month(&self) -> YearMonth {
        YearMonth::containing(self.clock.today())
    }

    /// Rows dated inside `month`, oldest first, with effective status.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn sessions_by_month(
        &self,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<Vec<SessionEntry>, ServiceError> {
        let today = self.clock.today();
        let rows = self
            .sessions
            .find_sessions_by_user(
                user_id,
                Some(DateRange::new(month.first_day(), month.last_day())),
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|s| SessionEntry::new(s, today))
            .collect())
    }

    /// Totals over the whole ledger.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn history_stats(&self, user_id: UserId) -> Result<HistoryStats, ServiceError> {
        let mut rows = self.sessions.find_sessions_by_user(user_id, None).await?;
        rows.reverse();
        Ok(HistoryStats::compute(&rows))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<HistoryView, ServiceError> {
        let sessions = self.sessions_by_month(user_id, month).await?;
        let stats = self.history_stats(user_id).await?;
        Ok(HistoryView::new(month, sessions, stats))
    }
}
