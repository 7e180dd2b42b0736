use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{
    FocusDuration, Plan, PlanError, Progression, ProgressionId, ProgressionType,
};

/// Weeks a plan must spend at its current tier before it is eligible to progress.
pub const ELIGIBILITY_WEEKS: u32 = 2;

/// Highest supported sessions per week.
pub const MAX_FREQUENCY: u8 = 7;

/// Proposed next tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub duration: FocusDuration,
    pub frequency: u8,
}

/// Advisory result of [`evaluate`]. Never mutates the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub weeks_at_level: u32,
    pub is_eligible: bool,
    pub suggestion: Suggestion,
}

impl Evaluation {
    /// True when the suggestion equals the current tier (both axes maxed out).
    #[must_use]
    pub fn is_at_ceiling(&self, plan: &Plan) -> bool {
        self.suggestion.duration == plan.focus_duration()
            && self.suggestion.frequency == plan.days_per_week()
    }
}

/// Decide eligibility and the next tier for a plan.
///
/// Duration advances first along [`FocusDuration::LADDER`]; once duration is
/// at the top, frequency grows by one up to [`MAX_FREQUENCY`]; past that the
/// suggestion is the current tier.
#[must_use]
pub fn evaluate(plan: &Plan) -> Evaluation {
    let weeks_at_level = plan.current_progression_week();
    let suggestion = match plan.focus_duration().next_tier() {
        Some(duration) => Suggestion {
            duration,
            frequency: plan.days_per_week(),
        },
        None if plan.days_per_week() < MAX_FREQUENCY => Suggestion {
            duration: plan.focus_duration(),
            frequency: plan.days_per_week() + 1,
        },
        None => Suggestion {
            duration: plan.focus_duration(),
            frequency: plan.days_per_week(),
        },
    };

    Evaluation {
        weeks_at_level,
        is_eligible: weeks_at_level >= ELIGIBILITY_WEEKS,
        suggestion,
    }
}

/// Build the audit record and the updated plan for a tier change.
///
/// The input plan is not modified; the caller persists both results (and the
/// matching future-session update) in one transaction.
///
/// # Errors
///
/// Returns `PlanError::InvalidDaysPerWeek` if `new_frequency` is outside `1..=7`.
pub fn commit(
    plan: &Plan,
    new_duration: FocusDuration,
    new_frequency: u8,
    progression_type: ProgressionType,
    now: DateTime<Utc>,
) -> Result<(Progression, Plan), PlanError> {
    let mut updated = plan.clone();
    updated.apply_progression(new_duration, new_frequency, now)?;

    let progression = Progression {
        id: ProgressionId::generate(),
        user_id: plan.user_id(),
        previous_duration: plan.focus_duration(),
        previous_frequency: plan.days_per_week(),
        new_duration,
        new_frequency,
        progression_type,
        created_at: now,
    };

    Ok((progression, updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanId, UserId, WorkDays};
    use crate::time::fixed_now;

    fn plan_at(duration: FocusDuration, days: u8, week: u32) -> Plan {
        Plan::from_persisted(
            PlanId::generate(),
            UserId::generate(),
            duration,
            days,
            WorkDays::every_day(),
            week,
            true,
            fixed_now(),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn eligibility_needs_two_weeks() {
        assert!(!evaluate(&plan_at(FocusDuration::Minutes25, 3, 1)).is_eligible);
        assert!(evaluate(&plan_at(FocusDuration::Minutes25, 3, 2)).is_eligible);
        assert!(evaluate(&plan_at(FocusDuration::Minutes25, 3, 9)).is_eligible);
    }

    #[test]
    fn duration_advances_before_frequency() {
        let eval = evaluate(&plan_at(FocusDuration::Minutes45, 3, 2));
        assert_eq!(
            eval.suggestion,
            Suggestion {
                duration: FocusDuration::Minutes60,
                frequency: 3,
            }
        );
    }

    #[test]
    fn frequency_advances_at_top_duration() {
        let eval = evaluate(&plan_at(FocusDuration::Minutes90, 5, 2));
        assert_eq!(
            eval.suggestion,
            Suggestion {
                duration: FocusDuration::Minutes90,
                frequency: 6,
            }
        );
    }

    #[test]
    fn ceiling_suggests_no_change() {
        let plan = plan_at(FocusDuration::Minutes90, 7, 1);
        let eval = evaluate(&plan);
        assert!(!eval.is_eligible);
        assert_eq!(
            eval.suggestion,
            Suggestion {
                duration: FocusDuration::Minutes90,
                frequency: 7,
            }
        );
        assert!(eval.is_at_ceiling(&plan));

        let eval = evaluate(&plan_at(FocusDuration::Minutes90, 7, 4));
        assert!(eval.is_eligible);
        assert_eq!(eval.suggestion.frequency, 7);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let plan = plan_at(FocusDuration::Minutes15, 2, 3);
        assert_eq!(evaluate(&plan), evaluate(&plan));
    }

    #[test]
    fn commit_records_before_and_after() {
        let plan = plan_at(FocusDuration::Minutes25, 4, 3);
        let later = fixed_now() + chrono::Duration::hours(1);
        let (progression, updated) = commit(
            &plan,
            FocusDuration::Minutes45,
            4,
            ProgressionType::Auto,
            later,
        )
        .unwrap();

        assert_eq!(progression.previous_duration, FocusDuration::Minutes25);
        assert_eq!(progression.previous_frequency, 4);
        assert_eq!(progression.new_duration, FocusDuration::Minutes45);
        assert_eq!(progression.new_frequency, 4);
        assert_eq!(progression.user_id, plan.user_id());
        assert_eq!(progression.created_at, later);

        assert_eq!(updated.id(), plan.id());
        assert_eq!(updated.focus_duration(), FocusDuration::Minutes45);
        assert_eq!(updated.current_progression_week(), 1);
        assert_eq!(updated.updated_at(), later);
        // Input untouched.
        assert_eq!(plan.current_progression_week(), 3);
    }

    #[test]
    fn commit_rejects_out_of_range_frequency() {
        let plan = plan_at(FocusDuration::Minutes90, 7, 2);
        let err = commit(
            &plan,
            FocusDuration::Minutes90,
            8,
            ProgressionType::Custom,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, PlanError::InvalidDaysPerWeek(8));
    }
}
