use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::input::{ValidationError, normalize_notes, validate_actual_duration};
use crate::model::{
    DifficultyRating, PlanId, SessionId, SessionPatch, SessionStatus, UserId, WorkSession,
};

/// What the user reports when finishing a focus block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    actual_duration: u32,
    difficulty_rating: DifficultyRating,
    notes: Option<String>,
}

impl Completion {
    /// Notes are trimmed; blank notes are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the duration is outside `1..=600` minutes
    /// or the notes are too long.
    pub fn new(
        actual_duration: u32,
        difficulty_rating: DifficultyRating,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            actual_duration: validate_actual_duration(actual_duration)?,
            difficulty_rating,
            notes: normalize_notes(notes)?,
        })
    }

    #[must_use]
    pub fn actual_duration(&self) -> u32 {
        self.actual_duration
    }

    #[must_use]
    pub fn difficulty_rating(&self) -> DifficultyRating {
        self.difficulty_rating
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Patch marking an existing ledger row completed.
    #[must_use]
    pub fn patch(&self, now: DateTime<Utc>) -> SessionPatch {
        SessionPatch {
            status: Some(SessionStatus::Completed),
            actual_duration: Some(self.actual_duration),
            completed_at: Some(now),
            difficulty_rating: Some(self.difficulty_rating),
            notes: Some(self.notes.clone()),
            ..SessionPatch::touch(now)
        }
    }

    /// Completed row for a day with no ledger entry. The planned duration
    /// equals what was actually done.
    #[must_use]
    pub fn ad_hoc_session(
        &self,
        user_id: UserId,
        plan_id: PlanId,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> WorkSession {
        let mut session =
            WorkSession::scheduled(user_id, plan_id, today, self.actual_duration, false, now);
        session.apply_patch(&self.patch(now));
        session
    }
}

/// Which row a completion lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTarget {
    UpdateExisting(SessionId),
    CreateAdHoc { plan_id: PlanId },
}

impl CompletionTarget {
    /// A present session id always means an update.
    #[must_use]
    pub fn select(session_id: Option<SessionId>, plan_id: PlanId) -> Self {
        match session_id {
            Some(id) => CompletionTarget::UpdateExisting(id),
            None => CompletionTarget::CreateAdHoc { plan_id },
        }
    }
}

/// Storage write produced by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionWrite {
    Update { id: SessionId, patch: SessionPatch },
    Create(WorkSession),
}

/// Turn a completion into the single write it requires.
#[must_use]
pub fn resolve(
    target: CompletionTarget,
    completion: &Completion,
    user_id: UserId,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CompletionWrite {
    match target {
        CompletionTarget::UpdateExisting(id) => CompletionWrite::Update {
            id,
            patch: completion.patch(now),
        },
        CompletionTarget::CreateAdHoc { plan_id } => {
            CompletionWrite::Create(completion.ad_hoc_session(user_id, plan_id, today, now))
        }
    }
}

/// Today's entry as shown to the user: a real ledger row, or a placeholder
/// that becomes an ad-hoc row once completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TodaySession {
    Existing(WorkSession),
    AdHoc { plan_id: PlanId, planned_duration: u32 },
}

impl TodaySession {
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            TodaySession::Existing(session) => Some(session.id),
            TodaySession::AdHoc { .. } => None,
        }
    }

    #[must_use]
    pub fn plan_id(&self) -> PlanId {
        match self {
            TodaySession::Existing(session) => session.plan_id,
            TodaySession::AdHoc { plan_id, .. } => *plan_id,
        }
    }

    #[must_use]
    pub fn planned_duration(&self) -> u32 {
        match self {
            TodaySession::Existing(session) => session.planned_duration,
            TodaySession::AdHoc {
                planned_duration, ..
            } => *planned_duration,
        }
    }

    #[must_use]
    pub fn is_rest_day(&self) -> bool {
        matches!(self, TodaySession::Existing(s) if s.is_rest_day)
    }

    #[must_use]
    pub fn target(&self) -> CompletionTarget {
        CompletionTarget::select(self.session_id(), self.plan_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_now, fixed_today};

    fn completion() -> Completion {
        Completion::new(30, DifficultyRating::JustRight, Some(" good ".into())).unwrap()
    }

    #[test]
    fn completion_validates_duration_and_notes() {
        assert!(Completion::new(0, DifficultyRating::Easy, None).is_err());
        assert!(Completion::new(601, DifficultyRating::Easy, None).is_err());
        assert!(Completion::new(600, DifficultyRating::Easy, None).is_ok());

        let blank = Completion::new(25, DifficultyRating::Easy, Some("   ".into())).unwrap();
        assert_eq!(blank.notes(), None);

        let long = "x".repeat(2001);
        let err = Completion::new(25, DifficultyRating::Easy, Some(long)).unwrap_err();
        assert_eq!(err.field, "notes");
    }

    #[test]
    fn target_follows_session_id_presence() {
        let plan_id = PlanId::generate();
        let id = SessionId::generate();
        assert_eq!(
            CompletionTarget::select(Some(id), plan_id),
            CompletionTarget::UpdateExisting(id)
        );
        assert_eq!(
            CompletionTarget::select(None, plan_id),
            CompletionTarget::CreateAdHoc { plan_id }
        );
    }

    #[test]
    fn update_patch_marks_completed() {
        let id = SessionId::generate();
        let write = resolve(
            CompletionTarget::UpdateExisting(id),
            &completion(),
            UserId::generate(),
            fixed_today(),
            fixed_now(),
        );
        let CompletionWrite::Update { id: got, patch } = write else {
            panic!("expected update");
        };
        assert_eq!(got, id);
        assert_eq!(patch.status, Some(SessionStatus::Completed));
        assert_eq!(patch.actual_duration, Some(30));
        assert_eq!(patch.completed_at, Some(fixed_now()));
        assert_eq!(patch.notes, Some(Some("good".to_owned())));
        assert_eq!(patch.planned_duration, None);
    }

    #[test]
    fn ad_hoc_row_plans_what_was_done() {
        let plan_id = PlanId::generate();
        let user_id = UserId::generate();
        let write = resolve(
            CompletionTarget::CreateAdHoc { plan_id },
            &completion(),
            user_id,
            fixed_today(),
            fixed_now(),
        );
        let CompletionWrite::Create(session) = write else {
            panic!("expected create");
        };
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.plan_id, plan_id);
        assert_eq!(session.scheduled_date, fixed_today());
        assert_eq!(session.planned_duration, 30);
        assert_eq!(session.actual_duration, Some(30));
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(!session.is_rest_day);
        assert_eq!(session.difficulty_rating, Some(DifficultyRating::JustRight));
    }

    #[test]
    fn today_placeholder_targets_ad_hoc() {
        let plan_id = PlanId::generate();
        let today = TodaySession::AdHoc {
            plan_id,
            planned_duration: 45,
        };
        assert_eq!(today.session_id(), None);
        assert_eq!(today.planned_duration(), 45);
        assert!(!today.is_rest_day());
        assert_eq!(today.target(), CompletionTarget::CreateAdHoc { plan_id });
    }
}
