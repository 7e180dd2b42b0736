use std::sync::Arc;

use focus_core::completion::{self, CompletionTarget, CompletionWrite, TodaySession};
use focus_core::input::{CompleteSessionInput, ValidationError};
use focus_core::model::{SessionId, UserId, WorkSession};
use storage::repository::{PlanRepository, StorageError, WorkSessionRepository};

use crate::Clock;
use crate::error::ServiceError;

fn not_found_as_session(err: StorageError) -> ServiceError {
    match err {
        StorageError::NotFound => ServiceError::SessionNotFound,
        other => ServiceError::Storage(other),
    }
}

/// Today's focus block: look it up, complete it or skip it.
#[derive(Clone)]
pub struct WorkSessionService {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
    sessions: Arc<dyn WorkSessionRepository>,
}

impl WorkSessionService {
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

    /// Today's ledger row, or an ad-hoc placeholder sized to the active plan.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NeedsOnboarding` when there is no active plan.
    pub async fn current_session(&self, user_id: UserId) -> Result<TodaySession, ServiceError> {
        let plan = self
            .plans
            .find_active_plan(user_id)
            .await?
            .ok_or(ServiceError::NeedsOnboarding)?;

        let today = self.clock.today();
        Ok(match self.sessions.find_session_on(user_id, today).await? {
            Some(session) => TodaySession::Existing(session),
            None => TodaySession::AdHoc {
                plan_id: plan.id(),
                planned_duration: plan.focus_duration().minutes(),
            },
        })
    }

    /// Record a finished focus block.
    ///
    /// With a session id the existing row is updated. Without one a completed
    /// row is written for today; if another request already wrote today's
    /// row, the later completion overwrites it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::SessionNotFound` for an unknown or foreign
    /// session, or `ServiceError::Validation` for a foreign plan.
    pub async fn complete_session(
        &self,
        user_id: UserId,
        input: CompleteSessionInput,
    ) -> Result<WorkSession, ServiceError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let target = CompletionTarget::select(input.session_id, input.plan_id);

        match target {
            CompletionTarget::UpdateExisting(id) => {
                self.sessions
                    .get_session(user_id, id)
                    .await
                    .map_err(not_found_as_session)?;
            }
            CompletionTarget::CreateAdHoc { plan_id } => {
                let owned = match self.plans.get_plan(plan_id).await {
                    Ok(plan) => plan.user_id() == user_id,
                    Err(StorageError::NotFound) => false,
                    Err(other) => return Err(other.into()),
                };
                if !owned {
                    return Err(ValidationError::new("plan_id", "unknown plan").into());
                }
            }
        }

        let stored = match completion::resolve(target, &input.completion, user_id, today, now) {
            CompletionWrite::Update { id, patch } => self
                .sessions
                .update_session(id, &patch)
                .await
                .map_err(not_found_as_session)?,
            CompletionWrite::Create(session) => self.sessions.upsert_completed(&session).await?,
        };

        tracing::info!(
            %user_id,
            session_id = %stored.id,
            date = %stored.scheduled_date,
            actual_minutes = input.completion.actual_duration(),
            rating = %input.completion.difficulty_rating(),
            ad_hoc = input.session_id.is_none(),
            "session completed"
        );
        Ok(stored)
    }

    /// Mark a pending session as skipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::SessionNotFound` for an unknown or foreign
    /// session, or `ServiceError::WorkSession` if it is no longer pending.
    pub async fn skip_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<WorkSession, ServiceError> {
        let mut session = self
            .sessions
            .get_session(user_id, session_id)
            .await
            .map_err(not_found_as_session)?;
        let patch = session.skip(self.clock.now())?;
        let stored = self
            .sessions
            .update_session(session_id, &patch)
            .await
            .map_err(not_found_as_session)?;

        tracing::info!(%user_id, %session_id, date = %stored.scheduled_date, "session skipped");
        Ok(stored)
    }
}
