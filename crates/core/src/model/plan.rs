use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{PlanId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("focus duration must be one of 15, 25, 45, 60 or 90 minutes, got {0}")]
    InvalidDuration(u32),

    #[error("days per week must be between 1 and 7, got {0}")]
    InvalidDaysPerWeek(u8),

    #[error("weekday index must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidWeekday(u8),

    #[error("work days must include at least one day")]
    EmptyWorkDays,

    #[error("progression week must be >= 1, got {0}")]
    InvalidProgressionWeek(u32),
}

//
// ─── FOCUS DURATION ────────────────────────────────────────────────────────────
//

/// Length of a focus block, restricted to the difficulty ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FocusDuration {
    Minutes15,
    Minutes25,
    Minutes45,
    Minutes60,
    Minutes90,
}

impl FocusDuration {
    /// Ordered duration ladder, easiest first.
    pub const LADDER: [FocusDuration; 5] = [
        FocusDuration::Minutes15,
        FocusDuration::Minutes25,
        FocusDuration::Minutes45,
        FocusDuration::Minutes60,
        FocusDuration::Minutes90,
    ];

    #[must_use]
    pub fn minutes(self) -> u32 {
        match self {
            FocusDuration::Minutes15 => 15,
            FocusDuration::Minutes25 => 25,
            FocusDuration::Minutes45 => 45,
            FocusDuration::Minutes60 => 60,
            FocusDuration::Minutes90 => 90,
        }
    }

    /// Maps a minute count back onto the ladder.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidDuration` for values that are not a tier.
    pub fn from_minutes(minutes: u32) -> Result<Self, PlanError> {
        Self::LADDER
            .into_iter()
            .find(|tier| tier.minutes() == minutes)
            .ok_or(PlanError::InvalidDuration(minutes))
    }

    /// The next harder tier, or `None` at the top of the ladder.
    #[must_use]
    pub fn next_tier(self) -> Option<Self> {
        let idx = Self::LADDER.iter().position(|tier| *tier == self)?;
        Self::LADDER.get(idx + 1).copied()
    }

    #[must_use]
    pub fn is_top_tier(self) -> bool {
        self.next_tier().is_none()
    }
}

impl TryFrom<u32> for FocusDuration {
    type Error = PlanError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
    }
}

impl From<FocusDuration> for u32 {
    fn from(value: FocusDuration) -> Self {
        value.minutes()
    }
}

impl fmt::Display for FocusDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

//
// ─── WORK DAYS ─────────────────────────────────────────────────────────────────
//

/// Set of weekdays on which focus sessions are scheduled.
///
/// Stored as a bitmask where bit `n` is the weekday with index `n`
/// (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "Vec<u8>")]
pub struct WorkDays(u8);

impl WorkDays {
    const ALL_BITS: u8 = 0b0111_1111;

    /// Build a set from weekday indices. Duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidWeekday` for an index outside `0..=6`, or
    /// `PlanError::EmptyWorkDays` when no index is given.
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self, PlanError> {
        let mut bits = 0_u8;
        for idx in indices {
            if idx > 6 {
                return Err(PlanError::InvalidWeekday(idx));
            }
            bits |= 1 << idx;
        }
        Self::from_bits(bits)
    }

    /// Rehydrate from a stored bitmask.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::EmptyWorkDays` if the mask selects no valid day.
    pub fn from_bits(bits: u8) -> Result<Self, PlanError> {
        let bits = bits & Self::ALL_BITS;
        if bits == 0 {
            return Err(PlanError::EmptyWorkDays);
        }
        Ok(Self(bits))
    }

    #[must_use]
    pub fn every_day() -> Self {
        Self(Self::ALL_BITS)
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        let idx = day.num_days_from_sunday();
        self.0 & (1 << idx) != 0
    }

    #[must_use]
    pub fn contains_date(self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    /// Weekday indices in ascending order.
    #[must_use]
    pub fn indices(self) -> Vec<u8> {
        (0..7_u8).filter(|idx| self.0 & (1 << idx) != 0).collect()
    }

    #[must_use]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<WorkDays> for Vec<u8> {
    fn from(value: WorkDays) -> Self {
        value.indices()
    }
}

//
// ─── PLAN ──────────────────────────────────────────────────────────────────────
//

/// A user's recurring focus schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    id: PlanId,
    user_id: UserId,
    focus_duration: FocusDuration,
    days_per_week: u8,
    work_days: WorkDays,
    current_progression_week: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn validate_days_per_week(days_per_week: u8) -> Result<u8, PlanError> {
    if (1..=7).contains(&days_per_week) {
        Ok(days_per_week)
    } else {
        Err(PlanError::InvalidDaysPerWeek(days_per_week))
    }
}

impl Plan {
    /// Create a fresh, active plan at progression week 1.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidDaysPerWeek` if `days_per_week` is outside `1..=7`.
    pub fn new(
        id: PlanId,
        user_id: UserId,
        focus_duration: FocusDuration,
        days_per_week: u8,
        work_days: WorkDays,
        now: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            id,
            user_id,
            focus_duration,
            days_per_week: validate_days_per_week(days_per_week)?,
            work_days,
            current_progression_week: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a plan from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the stored values violate plan invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: PlanId,
        user_id: UserId,
        focus_duration: FocusDuration,
        days_per_week: u8,
        work_days: WorkDays,
        current_progression_week: u32,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        if current_progression_week == 0 {
            return Err(PlanError::InvalidProgressionWeek(current_progression_week));
        }
        Ok(Self {
            id,
            user_id,
            focus_duration,
            days_per_week: validate_days_per_week(days_per_week)?,
            work_days,
            current_progression_week,
            is_active,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> PlanId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn focus_duration(&self) -> FocusDuration {
        self.focus_duration
    }

    #[must_use]
    pub fn days_per_week(&self) -> u8 {
        self.days_per_week
    }

    #[must_use]
    pub fn work_days(&self) -> WorkDays {
        self.work_days
    }

    #[must_use]
    pub fn current_progression_week(&self) -> u32 {
        self.current_progression_week
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace the schedule settings. The progression week is left as is.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidDaysPerWeek` if `days_per_week` is outside `1..=7`.
    pub fn apply_settings(
        &mut self,
        focus_duration: FocusDuration,
        days_per_week: u8,
        work_days: WorkDays,
        now: DateTime<Utc>,
    ) -> Result<(), PlanError> {
        self.days_per_week = validate_days_per_week(days_per_week)?;
        self.focus_duration = focus_duration;
        self.work_days = work_days;
        self.updated_at = now;
        Ok(())
    }

    /// Move to a new duration/frequency tier and restart the week counter.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidDaysPerWeek` if `frequency` is outside `1..=7`.
    pub fn apply_progression(
        &mut self,
        focus_duration: FocusDuration,
        frequency: u8,
        now: DateTime<Utc>,
    ) -> Result<(), PlanError> {
        self.days_per_week = validate_days_per_week(frequency)?;
        self.focus_duration = focus_duration;
        self.current_progression_week = 1;
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    /// Apply a storage patch in place.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the patch would break a plan invariant; the plan
    /// is left unchanged in that case.
    pub fn apply_patch(&mut self, patch: &PlanPatch) -> Result<(), PlanError> {
        if let Some(days) = patch.days_per_week {
            validate_days_per_week(days)?;
        }
        if patch.current_progression_week == Some(0) {
            return Err(PlanError::InvalidProgressionWeek(0));
        }

        if let Some(duration) = patch.focus_duration {
            self.focus_duration = duration;
        }
        if let Some(days) = patch.days_per_week {
            self.days_per_week = days;
        }
        if let Some(work_days) = patch.work_days {
            self.work_days = work_days;
        }
        if let Some(week) = patch.current_progression_week {
            self.current_progression_week = week;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = patch.updated_at;
        Ok(())
    }
}

/// Partial update for a stored plan. `None` leaves a column unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPatch {
    pub focus_duration: Option<FocusDuration>,
    pub days_per_week: Option<u8>,
    pub work_days: Option<WorkDays>,
    pub current_progression_week: Option<u32>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl PlanPatch {
    #[must_use]
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            focus_duration: None,
            days_per_week: None,
            work_days: None,
            current_progression_week: None,
            is_active: None,
            updated_at,
        }
    }

    /// Patch that overwrites every mutable column with the plan's values.
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            focus_duration: Some(plan.focus_duration),
            days_per_week: Some(plan.days_per_week),
            work_days: Some(plan.work_days),
            current_progression_week: Some(plan.current_progression_week),
            is_active: Some(plan.is_active),
            updated_at: plan.updated_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
