use std::sync::Arc;

use focus_core::evaluator;
use focus_core::input::ProgressionRequest;
use focus_core::model::{Plan, PlanPatch, Progression, UserId};
use storage::repository::{LedgerPersistence, PlanRepository, ProgressionRepository};

use crate::Clock;
use crate::error::ServiceError;
use crate::views::ProgressionStatus;

/// Difficulty ladder: evaluate, move up a tier, list past moves.
#[derive(Clone)]
pub struct ProgressionService {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
    progressions: Arc<dyn ProgressionRepository>,
    ledger: Arc<dyn LedgerPersistence>,
}

impl ProgressionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        plans: Arc<dyn PlanRepository>,
        progressions: Arc<dyn ProgressionRepository>,
        ledger: Arc<dyn LedgerPersistence>,
    ) -> Self {
        Self {
            clock,
            plans,
            progressions,
            ledger,
        }
    }

    async fn active_plan(&self, user_id: UserId) -> Result<Plan, ServiceError> {
        self.plans
            .find_active_plan(user_id)
            .await?
            .ok_or(ServiceError::NeedsOnboarding)
    }

    /// Eligibility and the suggested next tier. Read-only; `None` until the
    /// user has an active plan.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn progression_status(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProgressionStatus>, ServiceError> {
        let Some(plan) = self.plans.find_active_plan(user_id).await? else {
            return Ok(None);
        };
        let evaluation = evaluator::evaluate(&plan);
        let at_ceiling = evaluation.is_at_ceiling(&plan);
        Ok(Some(ProgressionStatus {
            plan,
            evaluation,
            at_ceiling,
        }))
    }

    /// Commit a tier change. The audit record, the plan update and the new
    /// planned duration on pending rows from today onward are written together.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotEligible` when accepting a suggestion before
    /// the plan has spent enough weeks at its tier, or
    /// `ServiceError::NeedsOnboarding` when there is no active plan.
    pub async fn progress(
        &self,
        user_id: UserId,
        request: ProgressionRequest,
    ) -> Result<(Progression, Plan), ServiceError> {
        let plan = self.active_plan(user_id).await?;
        let evaluation = evaluator::evaluate(&plan);

        let (duration, frequency) = match request {
            ProgressionRequest::AcceptSuggestion if !evaluation.is_eligible => {
                return Err(ServiceError::NotEligible);
            }
            ProgressionRequest::AcceptSuggestion | ProgressionRequest::ApplySuggestion => (
                evaluation.suggestion.duration,
                evaluation.suggestion.frequency,
            ),
            ProgressionRequest::Custom {
                duration,
                frequency,
            } => (duration, frequency),
        };

        let now = self.clock.now();
        let (progression, updated) = evaluator::commit(
            &plan,
            duration,
            frequency,
            request.progression_type(),
            now,
        )?;
        let patch = PlanPatch {
            focus_duration: Some(updated.focus_duration()),
            days_per_week: Some(updated.days_per_week()),
            current_progression_week: Some(updated.current_progression_week()),
            ..PlanPatch::touch(now)
        };
        let rescheduled = self
            .ledger
            .commit_progression(
                &progression,
                plan.id(),
                &patch,
                duration.minutes(),
                self.clock.today(),
            )
            .await?;

        if progression.is_noop() {
            tracing::warn!(%user_id, plan_id = %plan.id(), "progression left the tier unchanged");
        }
        tracing::info!(
            %user_id,
            plan_id = %plan.id(),
            kind = %progression.progression_type,
            from_minutes = progression.previous_duration.minutes(),
            to_minutes = progression.new_duration.minutes(),
            from_days = progression.previous_frequency,
            to_days = progression.new_frequency,
            rescheduled,
            "plan progressed"
        );
        Ok((progression, updated))
    }

    /// Past tier changes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn list_progressions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Progression>, ServiceError> {
        Ok(self.progressions.list_progressions(user_id).await?)
    }
}
