use std::sync::Arc;

use focus_core::generator::SessionGenerator;
use focus_core::input::PlanInput;
use focus_core::model::{Plan, PlanId, PlanPatch, UserId};
use storage::repository::{LedgerPersistence, PlanRepository};

use crate::Clock;
use crate::error::ServiceError;

/// Onboarding and plan settings.
///
/// Every write regenerates the pending part of the ledger from today onward
/// inside one storage transaction.
#[derive(Clone)]
pub struct PlanService {
    clock: Clock,
    generator: SessionGenerator,
    plans: Arc<dyn PlanRepository>,
    ledger: Arc<dyn LedgerPersistence>,
}

impl PlanService {
    #[must_use]
    pub fn new(
        clock: Clock,
        generator: SessionGenerator,
        plans: Arc<dyn PlanRepository>,
        ledger: Arc<dyn LedgerPersistence>,
    ) -> Self {
        Self {
            clock,
            generator,
            plans,
            ledger,
        }
    }

    /// True when the user has no active plan yet.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if repository access fails.
    pub async fn needs_onboarding(&self, user_id: UserId) -> Result<bool, ServiceError> {
        Ok(self.plans.find_active_plan(user_id).await?.is_none())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NeedsOnboarding` when there is no active plan.
    pub async fn active_plan(&self, user_id: UserId) -> Result<Plan, ServiceError> {
        self.plans
            .find_active_plan(user_id)
            .await?
            .ok_or(ServiceError::NeedsOnboarding)
    }

    /// Create a new active plan, retiring any previous one, and schedule the
    /// coming weeks.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if persistence fails; nothing is
    /// written in that case.
    pub async fn create_plan(
        &self,
        user_id: UserId,
        input: PlanInput,
    ) -> Result<Plan, ServiceError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let plan = Plan::new(
            PlanId::generate(),
            user_id,
            input.focus_duration,
            input.days_per_week,
            input.work_days,
            now,
        )?;
        let drafts = self.generator.generate_for_plan(&plan, today, now);
        let written = self.ledger.activate_plan(&plan, &drafts, today).await?;

        tracing::info!(
            %user_id,
            plan_id = %plan.id(),
            focus_minutes = plan.focus_duration().minutes(),
            sessions = written,
            "plan created"
        );
        Ok(plan)
    }

    /// Change the active plan's settings. The progression week is kept.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NeedsOnboarding` when there is no active plan,
    /// or `ServiceError::Storage` if persistence fails.
    pub async fn update_plan(
        &self,
        user_id: UserId,
        input: PlanInput,
    ) -> Result<Plan, ServiceError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let mut plan = self.active_plan(user_id).await?;
        plan.apply_settings(input.focus_duration, input.days_per_week, input.work_days, now)?;

        let drafts = self.generator.generate_for_plan(&plan, today, now);
        let patch = PlanPatch {
            focus_duration: Some(plan.focus_duration()),
            days_per_week: Some(plan.days_per_week()),
            work_days: Some(plan.work_days()),
            ..PlanPatch::touch(now)
        };
        let written = self
            .ledger
            .replace_schedule(plan.id(), &patch, &drafts, today)
            .await?;

        tracing::info!(
            %user_id,
            plan_id = %plan.id(),
            focus_minutes = plan.focus_duration().minutes(),
            sessions = written,
            "plan updated"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::model::{FocusDuration, User};
    use focus_core::time::{fixed_clock, fixed_today};
    use storage::repository::{InMemoryRepository, UserRepository, WorkSessionRepository};

    async fn setup() -> (InMemoryRepository, PlanService, UserId) {
        let repo = InMemoryRepository::new();
        let user = User {
            id: UserId::generate(),
            username: "pat".into(),
            password_hash: "h".into(),
        };
        repo.insert_user(&user).await.unwrap();
        let service = PlanService::new(
            fixed_clock(),
            SessionGenerator::new(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (repo, service, user.id)
    }

    #[tokio::test]
    async fn onboarding_creates_plan_and_schedule() {
        let (repo, service, user_id) = setup().await;
        assert!(service.needs_onboarding(user_id).await.unwrap());
        assert!(matches!(
            service.active_plan(user_id).await,
            Err(ServiceError::NeedsOnboarding)
        ));

        let plan = service
            .create_plan(user_id, PlanInput::new(25, 4, &[1, 2, 3, 4]).unwrap())
            .await
            .unwrap();
        assert!(!service.needs_onboarding(user_id).await.unwrap());
        assert_eq!(plan.current_progression_week(), 1);

        let sessions = repo.find_sessions_by_user(user_id, None).await.unwrap();
        assert_eq!(sessions.len(), 29);
        assert_eq!(sessions[0].scheduled_date, fixed_today());
    }

    #[tokio::test]
    async fn update_keeps_plan_identity_and_week() {
        let (repo, service, user_id) = setup().await;
        let plan = service
            .create_plan(user_id, PlanInput::new(25, 2, &[1, 3]).unwrap())
            .await
            .unwrap();

        let updated = service
            .update_plan(user_id, PlanInput::new(60, 3, &[1, 3, 5]).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.id(), plan.id());
        assert_eq!(updated.focus_duration(), FocusDuration::Minutes60);
        assert_eq!(updated.current_progression_week(), 1);

        let stored = service.active_plan(user_id).await.unwrap();
        assert_eq!(stored, updated);
        let sessions = repo.find_sessions_by_user(user_id, None).await.unwrap();
        assert_eq!(sessions.len(), 29);
        assert!(sessions.iter().all(|s| s.planned_duration == 60));
    }

    #[tokio::test]
    async fn update_without_plan_needs_onboarding() {
        let (_repo, service, user_id) = setup().await;
        let err = service
            .update_plan(user_id, PlanInput::new(25, 1, &[1]).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.fallback(), Some(crate::error::Fallback::Onboarding));
    }
}
