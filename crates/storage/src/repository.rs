use async_trait::async_trait;
use chrono::NaiveDate;
use focus_core::model::{
    Plan, PlanId, PlanPatch, Progression, SessionId, SessionPatch, SessionStatus, User, UserId,
    WorkSession,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Inclusive calendar range used to narrow ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_user(&self, id: UserId) -> Result<User, StorageError>;

    /// Remove an account together with its plans, sessions and progressions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// The single active plan for a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_active_plan(&self, user_id: UserId) -> Result<Option<Plan>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_plan(&self, id: PlanId) -> Result<Plan, StorageError>;
}

#[async_trait]
pub trait WorkSessionRepository: Send + Sync {
    /// Ledger rows for a user in ascending date order, optionally bounded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_sessions_by_user(
        &self,
        user_id: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<WorkSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_session_on(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<WorkSession>, StorageError>;

    /// Fetch a row owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the row is missing or owned by
    /// someone else.
    async fn get_session(&self, user_id: UserId, id: SessionId)
    -> Result<WorkSession, StorageError>;

    /// Insert rows, skipping any date the user already has a row for.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn insert_sessions(&self, sessions: &[WorkSession]) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> Result<WorkSession, StorageError>;

    /// Write a completed row for its date. If a row already exists for that
    /// user and date its completion fields are overwritten.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn upsert_completed(&self, session: &WorkSession) -> Result<WorkSession, StorageError>;
}

#[async_trait]
pub trait ProgressionRepository: Send + Sync {
    /// Audit trail for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_progressions(&self, user_id: UserId) -> Result<Vec<Progression>, StorageError>;
}

/// Multi-table writes that must land atomically.
#[async_trait]
pub trait LedgerPersistence: Send + Sync {
    /// Retire the user's active plan, store `plan` as the new active one and
    /// swap pending rows dated `from` or later for `drafts`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError`; nothing is written on failure.
    async fn activate_plan(
        &self,
        plan: &Plan,
        drafts: &[WorkSession],
        from: NaiveDate,
    ) -> Result<u64, StorageError>;

    /// Apply `patch` to the plan and swap pending rows dated `from` or later
    /// for `drafts`. Rows already acted upon are kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError`; nothing is written on failure.
    async fn replace_schedule(
        &self,
        plan_id: PlanId,
        patch: &PlanPatch,
        drafts: &[WorkSession],
        from: NaiveDate,
    ) -> Result<u64, StorageError>;

    /// Record a tier change, apply `patch` to the plan and set
    /// `planned_duration` on its pending rows dated `from` or later.
    /// Returns the number of rescheduled rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError`; nothing is written on failure.
    async fn commit_progression(
        &self,
        progression: &Progression,
        plan_id: PlanId,
        patch: &PlanPatch,
        planned_duration: u32,
        from: NaiveDate,
    ) -> Result<u64, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Clone, Default)]
struct State {
    users: HashMap<UserId, User>,
    plans: HashMap<PlanId, Plan>,
    sessions: HashMap<SessionId, WorkSession>,
    progressions: Vec<Progression>,
}

impl State {
    fn session_on(&self, user_id: UserId, date: NaiveDate) -> Option<&WorkSession> {
        self.sessions
            .values()
            .find(|s| s.user_id == user_id && s.scheduled_date == date)
    }

    fn drop_pending_from(&mut self, user_id: UserId, from: NaiveDate) {
        self.sessions.retain(|_, s| {
            !(s.user_id == user_id
                && s.status == SessionStatus::Scheduled
                && s.scheduled_date >= from)
        });
    }

    fn insert_missing(&mut self, drafts: &[WorkSession]) -> Result<u64, StorageError> {
        let mut written = 0;
        for draft in drafts {
            if !self.plans.contains_key(&draft.plan_id) {
                return Err(StorageError::NotFound);
            }
            if self.session_on(draft.user_id, draft.scheduled_date).is_none() {
                self.sessions.insert(draft.id, draft.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    fn patch_plan(&mut self, plan_id: PlanId, patch: &PlanPatch) -> Result<Plan, StorageError> {
        let mut plan = self
            .plans
            .get(&plan_id)
            .cloned()
            .ok_or(StorageError::NotFound)?;
        plan.apply_patch(patch)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.plans.insert(plan_id, plan.clone());
        Ok(plan)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All tables live behind one lock so every ledger write is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Run `write` against a copy of the state and keep it only on success.
    fn transact<T>(
        &self,
        write: impl FnOnce(&mut State) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let out = write(&mut next)?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard
            .users
            .values()
            .any(|u| u.username == user.username || u.id == user.id)
        {
            return Err(StorageError::Conflict);
        }
        guard.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<User, StorageError> {
        let guard = self.lock()?;
        guard.users.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.users.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.plans.retain(|_, p| p.user_id() != id);
        guard.sessions.retain(|_, s| s.user_id != id);
        guard.progressions.retain(|p| p.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl PlanRepository for InMemoryRepository {
    async fn find_active_plan(&self, user_id: UserId) -> Result<Option<Plan>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .plans
            .values()
            .find(|p| p.user_id() == user_id && p.is_active())
            .cloned())
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan, StorageError> {
        let guard = self.lock()?;
        guard.plans.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl WorkSessionRepository for InMemoryRepository {
    async fn find_sessions_by_user(
        &self,
        user_id: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<WorkSession>, StorageError> {
        let guard = self.lock()?;
        let mut found: Vec<WorkSession> = guard
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| range.is_none_or(|r| r.contains(s.scheduled_date)))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.scheduled_date);
        Ok(found)
    }

    async fn find_session_on(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<WorkSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.session_on(user_id, date).cloned())
    }

    async fn get_session(
        &self,
        user_id: UserId,
        id: SessionId,
    ) -> Result<WorkSession, StorageError> {
        let guard = self.lock()?;
        guard
            .sessions
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn insert_sessions(&self, sessions: &[WorkSession]) -> Result<u64, StorageError> {
        self.transact(|state| state.insert_missing(sessions))
    }

    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> Result<WorkSession, StorageError> {
        let mut guard = self.lock()?;
        let session = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        session.apply_patch(patch);
        Ok(session.clone())
    }

    async fn upsert_completed(&self, session: &WorkSession) -> Result<WorkSession, StorageError> {
        let mut guard = self.lock()?;
        let existing = guard
            .session_on(session.user_id, session.scheduled_date)
            .map(|s| s.id);
        match existing {
            Some(id) => {
                let stored = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
                stored.status = session.status;
                stored.actual_duration = session.actual_duration;
                stored.completed_at = session.completed_at;
                stored.difficulty_rating = session.difficulty_rating;
                stored.notes.clone_from(&session.notes);
                stored.updated_at = session.updated_at;
                Ok(stored.clone())
            }
            None => {
                guard.sessions.insert(session.id, session.clone());
                Ok(session.clone())
            }
        }
    }
}

#[async_trait]
impl ProgressionRepository for InMemoryRepository {
    async fn list_progressions(&self, user_id: UserId) -> Result<Vec<Progression>, StorageError> {
        let guard = self.lock()?;
        let mut found: Vec<Progression> = guard
            .progressions
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[async_trait]
impl LedgerPersistence for InMemoryRepository {
    async fn activate_plan(
        &self,
        plan: &Plan,
        drafts: &[WorkSession],
        from: NaiveDate,
    ) -> Result<u64, StorageError> {
        self.transact(|state| {
            if !state.users.contains_key(&plan.user_id()) {
                return Err(StorageError::NotFound);
            }
            for existing in state.plans.values_mut() {
                if existing.user_id() == plan.user_id() && existing.is_active() {
                    existing.deactivate(plan.created_at());
                }
            }
            state.plans.insert(plan.id(), plan.clone());
            state.drop_pending_from(plan.user_id(), from);
            state.insert_missing(drafts)
        })
    }

    async fn replace_schedule(
        &self,
        plan_id: PlanId,
        patch: &PlanPatch,
        drafts: &[WorkSession],
        from: NaiveDate,
    ) -> Result<u64, StorageError> {
        self.transact(|state| {
            let plan = state.patch_plan(plan_id, patch)?;
            state.drop_pending_from(plan.user_id(), from);
            state.insert_missing(drafts)
        })
    }

    async fn commit_progression(
        &self,
        progression: &Progression,
        plan_id: PlanId,
        patch: &PlanPatch,
        planned_duration: u32,
        from: NaiveDate,
    ) -> Result<u64, StorageError> {
        self.transact(|state| {
            state.progressions.push(progression.clone());
            state.patch_plan(plan_id, patch)?;

            let mut touched = 0;
            for session in state.sessions.values_mut() {
                if session.plan_id == plan_id
                    && session.status == SessionStatus::Scheduled
                    && session.scheduled_date >= from
                {
                    session.planned_duration = planned_duration;
                    session.updated_at = patch.updated_at;
                    touched += 1;
                }
            }
            Ok(touched)
        })
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub sessions: Arc<dyn WorkSessionRepository>,
    pub progressions: Arc<dyn ProgressionRepository>,
    pub ledger: Arc<dyn LedgerPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            plans: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            progressions: Arc::new(repo.clone()),
            ledger: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use focus_core::generator::SessionGenerator;
    use focus_core::model::{DifficultyRating, FocusDuration, ProgressionId, ProgressionType, WorkDays};
    use focus_core::time::{fixed_now, fixed_today};

    fn build_user(name: &str) -> User {
        User {
            id: UserId::generate(),
            username: name.into(),
            password_hash: "hash".into(),
        }
    }

    fn build_plan(user_id: UserId, duration: FocusDuration) -> Plan {
        Plan::new(
            PlanId::generate(),
            user_id,
            duration,
            4,
            WorkDays::from_indices([1, 2, 3, 4]).unwrap(),
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = InMemoryRepository::new();
        repo.insert_user(&build_user("alice")).await.unwrap();
        let err = repo.insert_user(&build_user("alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn activating_a_plan_retires_the_previous_one() {
        let repo = InMemoryRepository::new();
        let user = build_user("alice");
        repo.insert_user(&user).await.unwrap();
        let today = fixed_today();

        let first = build_plan(user.id, FocusDuration::Minutes25);
        let drafts = SessionGenerator::new().generate_for_plan(&first, today, fixed_now());
        assert_eq!(repo.activate_plan(&first, &drafts, today).await.unwrap(), 29);

        let second = build_plan(user.id, FocusDuration::Minutes45);
        let drafts = SessionGenerator::new().generate_for_plan(&second, today, fixed_now());
        repo.activate_plan(&second, &drafts, today).await.unwrap();

        let active = repo.find_active_plan(user.id).await.unwrap().unwrap();
        assert_eq!(active.id(), second.id());
        assert!(!repo.get_plan(first.id()).await.unwrap().is_active());

        let sessions = repo.find_sessions_by_user(user.id, None).await.unwrap();
        assert_eq!(sessions.len(), 29);
        assert!(sessions.iter().all(|s| s.plan_id == second.id()));
    }

    #[tokio::test]
    async fn upsert_completed_overwrites_same_day_row() {
        let repo = InMemoryRepository::new();
        let user = build_user("bob");
        repo.insert_user(&user).await.unwrap();
        let plan = build_plan(user.id, FocusDuration::Minutes25);

        let mut first =
            WorkSession::scheduled(user.id, plan.id(), fixed_today(), 30, false, fixed_now());
        first.status = SessionStatus::Completed;
        first.actual_duration = Some(30);
        first.difficulty_rating = Some(DifficultyRating::Easy);
        repo.upsert_completed(&first).await.unwrap();

        let mut second = first.clone();
        second.id = SessionId::generate();
        second.actual_duration = Some(50);
        second.difficulty_rating = Some(DifficultyRating::Challenging);
        let stored = repo.upsert_completed(&second).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(stored.actual_duration, Some(50));
        let all = repo.find_sessions_by_user(user.id, None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn progression_reschedules_future_pending_rows_only() {
        let repo = InMemoryRepository::new();
        let user = build_user("carol");
        repo.insert_user(&user).await.unwrap();
        let today = fixed_today();
        let plan = build_plan(user.id, FocusDuration::Minutes25);
        let drafts = SessionGenerator::with_horizon_weeks(1).generate_for_plan(
            &plan,
            today - Duration::days(2),
            fixed_now(),
        );
        repo.activate_plan(&plan, &drafts, today - Duration::days(2))
            .await
            .unwrap();

        let progression = Progression {
            id: ProgressionId::generate(),
            user_id: user.id,
            previous_duration: FocusDuration::Minutes25,
            previous_frequency: 4,
            new_duration: FocusDuration::Minutes45,
            new_frequency: 4,
            progression_type: ProgressionType::Manual,
            created_at: fixed_now(),
        };
        let patch = PlanPatch {
            focus_duration: Some(FocusDuration::Minutes45),
            current_progression_week: Some(1),
            ..PlanPatch::touch(fixed_now())
        };
        let touched = repo
            .commit_progression(&progression, plan.id(), &patch, 45, today)
            .await
            .unwrap();
        assert_eq!(touched, 6);

        let sessions = repo.find_sessions_by_user(user.id, None).await.unwrap();
        for s in &sessions {
            let expected = if s.scheduled_date >= today { 45 } else { 25 };
            assert_eq!(s.planned_duration, expected, "{}", s.scheduled_date);
        }
        assert_eq!(
            repo.get_plan(plan.id()).await.unwrap().focus_duration(),
            FocusDuration::Minutes45
        );
        assert_eq!(repo.list_progressions(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_progression_leaves_ledger_untouched() {
        let repo = InMemoryRepository::new();
        let user = build_user("erin");
        repo.insert_user(&user).await.unwrap();
        let today = fixed_today();
        let plan = build_plan(user.id, FocusDuration::Minutes25);
        let drafts =
            SessionGenerator::with_horizon_weeks(1).generate_for_plan(&plan, today, fixed_now());
        repo.activate_plan(&plan, &drafts, today).await.unwrap();

        let progression = Progression {
            id: ProgressionId::generate(),
            user_id: user.id,
            previous_duration: FocusDuration::Minutes25,
            previous_frequency: 4,
            new_duration: FocusDuration::Minutes45,
            new_frequency: 4,
            progression_type: ProgressionType::Manual,
            created_at: fixed_now(),
        };
        // Zero weeks is rejected after the progression row is staged.
        let patch = PlanPatch {
            focus_duration: Some(FocusDuration::Minutes45),
            current_progression_week: Some(0),
            ..PlanPatch::touch(fixed_now())
        };
        assert!(
            repo.commit_progression(&progression, plan.id(), &patch, 45, today)
                .await
                .is_err()
        );

        assert!(repo.list_progressions(user.id).await.unwrap().is_empty());
        assert_eq!(
            repo.get_plan(plan.id()).await.unwrap().focus_duration(),
            FocusDuration::Minutes25
        );
        let sessions = repo.find_sessions_by_user(user.id, None).await.unwrap();
        assert!(sessions.iter().all(|s| s.planned_duration == 25));
    }

    #[tokio::test]
    async fn failed_schedule_replacement_keeps_pending_rows() {
        let repo = InMemoryRepository::new();
        let user = build_user("frank");
        repo.insert_user(&user).await.unwrap();
        let today = fixed_today();
        let plan = build_plan(user.id, FocusDuration::Minutes25);
        let drafts =
            SessionGenerator::with_horizon_weeks(1).generate_for_plan(&plan, today, fixed_now());
        repo.activate_plan(&plan, &drafts, today).await.unwrap();
        let before = repo.find_sessions_by_user(user.id, None).await.unwrap();

        // Drafts pointing at a plan that was never stored fail on insert,
        // after the patch and the pending delete have run.
        let orphan = build_plan(user.id, FocusDuration::Minutes25);
        let orphan_drafts =
            SessionGenerator::with_horizon_weeks(1).generate_for_plan(&orphan, today, fixed_now());
        let patch = PlanPatch {
            days_per_week: Some(5),
            work_days: Some(WorkDays::from_indices([1, 2, 3, 4, 5]).unwrap()),
            ..PlanPatch::touch(fixed_now())
        };
        let err = repo
            .replace_schedule(plan.id(), &patch, &orphan_drafts, today)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        assert_eq!(repo.get_plan(plan.id()).await.unwrap().days_per_week(), 4);
        let after = repo.find_sessions_by_user(user.id, None).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let repo = InMemoryRepository::new();
        let user = build_user("dave");
        repo.insert_user(&user).await.unwrap();
        let plan = build_plan(user.id, FocusDuration::Minutes15);
        let drafts = SessionGenerator::new().generate_for_plan(&plan, fixed_today(), fixed_now());
        repo.activate_plan(&plan, &drafts, fixed_today()).await.unwrap();

        repo.delete_user(user.id).await.unwrap();
        assert!(repo.find_active_plan(user.id).await.unwrap().is_none());
        assert!(repo.find_sessions_by_user(user.id, None).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_user(user.id).await,
            Err(StorageError::NotFound)
        ));
    }
}
