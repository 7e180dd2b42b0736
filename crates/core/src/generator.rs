use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{FocusDuration, Plan, PlanId, UserId, WorkDays, WorkSession};

/// Default number of weeks generated ahead of today.
pub const DEFAULT_HORIZON_WEEKS: u32 = 4;

/// Expands a recurring plan into dated ledger drafts.
///
/// Every calendar day from `today` through `today + horizon_weeks * 7` is
/// emitted exactly once, in ascending order. Days outside the plan's work
/// days become rest-day drafts rather than being dropped.
///
/// # Examples
///
/// ```
/// # use focus_core::generator::SessionGenerator;
/// # use focus_core::model::{FocusDuration, Plan, PlanId, UserId, WorkDays};
/// # use focus_core::time::{fixed_now, fixed_today};
/// let plan = Plan::new(
///     PlanId::generate(),
///     UserId::generate(),
///     FocusDuration::Minutes25,
///     3,
///     WorkDays::from_indices([1, 3, 5])?,
///     fixed_now(),
/// )?;
/// let drafts = SessionGenerator::new().generate_for_plan(&plan, fixed_today(), fixed_now());
/// assert_eq!(drafts.len(), 29);
/// # Ok::<(), focus_core::model::PlanError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGenerator {
    horizon_weeks: u32,
}

impl SessionGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_horizon_weeks(DEFAULT_HORIZON_WEEKS)
    }

    #[must_use]
    pub fn with_horizon_weeks(horizon_weeks: u32) -> Self {
        Self { horizon_weeks }
    }

    #[must_use]
    pub fn horizon_weeks(&self) -> u32 {
        self.horizon_weeks
    }

    /// Drafts for the plan's current settings.
    #[must_use]
    pub fn generate_for_plan(
        &self,
        plan: &Plan,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<WorkSession> {
        generate(
            plan.user_id(),
            plan.id(),
            plan.focus_duration(),
            plan.work_days(),
            self.horizon_weeks,
            today,
            now,
        )
    }
}

impl Default for SessionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Produce `horizon_weeks * 7 + 1` drafts starting at `today`.
#[must_use]
pub fn generate(
    user_id: UserId,
    plan_id: PlanId,
    focus_duration: FocusDuration,
    work_days: WorkDays,
    horizon_weeks: u32,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<WorkSession> {
    let days = usize::try_from(horizon_weeks)
        .unwrap_or(usize::MAX)
        .saturating_mul(7)
        .saturating_add(1);

    today
        .iter_days()
        .take(days)
        .map(|date| {
            WorkSession::scheduled(
                user_id,
                plan_id,
                date,
                focus_duration.minutes(),
                !work_days.contains_date(date),
                now,
            )
        })
        .collect()
}
