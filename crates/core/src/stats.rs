//! Streaks, totals and rating distributions computed from the session ledger.
//!
//! All functions are pure: callers pass the ledger slice and the reference
//! date explicitly.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::model::{DifficultyRating, SessionStatus, WorkSession};

/// Days in the rolling weekly window, today included.
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Live streak ending at `today`.
///
/// `sessions` must be ordered by `scheduled_date` descending. The scan keeps
/// an expected date starting at `today`:
/// - a completed session on the expected date extends the streak and moves
///   the expected date back one day;
/// - a still-scheduled session on the expected date is passed over without
///   counting or moving the expected date;
/// - a missed or skipped session on the expected date ends the scan;
/// - sessions on any other date are ignored.
#[must_use]
pub fn compute_streak(sessions: &[WorkSession], today: NaiveDate) -> u32 {
    let mut streak = 0_u32;
    let mut expected = today;

    for session in sessions {
        if session.scheduled_date != expected {
            continue;
        }
        match session.status {
            SessionStatus::Completed => {
                streak = streak.saturating_add(1);
                match expected.pred_opt() {
                    Some(prev) => expected = prev,
                    None => break,
                }
            }
            SessionStatus::Scheduled => {}
            SessionStatus::Missed | SessionStatus::Skipped => break,
        }
    }

    streak
}

/// Completed work inside the last seven days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WeeklyStats {
    pub sessions_completed: u32,
    pub total_focus_minutes: u32,
}

/// Inclusive `[today - 6, today]` window.
#[must_use]
pub fn week_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(WEEK_WINDOW_DAYS - 1), today)
}

#[must_use]
pub fn compute_weekly_stats(sessions: &[WorkSession], today: NaiveDate) -> WeeklyStats {
    let (start, end) = week_window(today);
    sessions
        .iter()
        .filter(|s| s.is_completed() && (start..=end).contains(&s.scheduled_date))
        .fold(WeeklyStats::default(), |mut acc, s| {
            acc.sessions_completed = acc.sessions_completed.saturating_add(1);
            acc.total_focus_minutes = acc
                .total_focus_minutes
                .saturating_add(s.actual_duration.unwrap_or(0));
            acc
        })
}

/// Sum of `actual_duration` over every completed session.
#[must_use]
pub fn compute_all_time_minutes(sessions: &[WorkSession]) -> u64 {
    sessions
        .iter()
        .filter(|s| s.is_completed())
        .map(|s| u64::from(s.actual_duration.unwrap_or(0)))
        .sum()
}

/// Minutes to whole hours, rounding half up.
#[must_use]
pub fn minutes_to_hours(minutes: u64) -> u64 {
    minutes.saturating_add(30) / 60
}

/// Longest run of completed sessions on consecutive days.
///
/// `completed` must hold completed sessions ordered by date descending.
/// Two sessions on the same date do not extend a run.
#[must_use]
pub fn compute_longest_streak(completed: &[WorkSession]) -> u32 {
    let mut longest = 0_u32;
    let mut current = 0_u32;
    let mut last_date: Option<NaiveDate> = None;

    for session in completed {
        let date = session.scheduled_date;
        match last_date {
            Some(last) if (last - date).num_days() == 1 => current += 1,
            Some(_) => {
                longest = longest.max(current);
                current = 1;
            }
            None => current = 1,
        }
        last_date = Some(date);
    }

    longest.max(current)
}

/// Count of completed sessions per difficulty rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DifficultyDistribution {
    pub easy: u32,
    pub just_right: u32,
    pub challenging: u32,
}

impl DifficultyDistribution {
    #[must_use]
    pub fn get(&self, rating: DifficultyRating) -> u32 {
        match rating {
            DifficultyRating::Easy => self.easy,
            DifficultyRating::JustRight => self.just_right,
            DifficultyRating::Challenging => self.challenging,
        }
    }

    fn bump(&mut self, rating: DifficultyRating) {
        let slot = match rating {
            DifficultyRating::Easy => &mut self.easy,
            DifficultyRating::JustRight => &mut self.just_right,
            DifficultyRating::Challenging => &mut self.challenging,
        };
        *slot = slot.saturating_add(1);
    }

    /// Every rating with its count, zero counts included.
    pub fn iter(&self) -> impl Iterator<Item = (DifficultyRating, u32)> + '_ {
        DifficultyRating::ALL.into_iter().map(|r| (r, self.get(r)))
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.easy + self.just_right + self.challenging
    }
}

#[must_use]
pub fn compute_difficulty_distribution(completed: &[WorkSession]) -> DifficultyDistribution {
    let mut dist = DifficultyDistribution::default();
    for rating in completed
        .iter()
        .filter(|s| s.is_completed())
        .filter_map(|s| s.difficulty_rating)
    {
        dist.bump(rating);
    }
    dist
}

/// Numbers shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub streak: u32,
    pub sessions_this_week: u32,
    pub total_focus_minutes: u32,
    pub total_focus_hours: u64,
}

impl DashboardStats {
    /// `sessions` is the user's whole ledger ordered by date descending.
    #[must_use]
    pub fn compute(sessions: &[WorkSession], today: NaiveDate) -> Self {
        let weekly = compute_weekly_stats(sessions, today);
        Self {
            streak: compute_streak(sessions, today),
            sessions_this_week: weekly.sessions_completed,
            total_focus_minutes: weekly.total_focus_minutes,
            total_focus_hours: minutes_to_hours(compute_all_time_minutes(sessions)),
        }
    }
}

/// All-time numbers shown on the history page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_sessions: u32,
    pub total_hours: u64,
    pub longest_streak: u32,
    pub ratings: DifficultyDistribution,
}

impl HistoryStats {
    /// `sessions` is the user's whole ledger ordered by date descending.
    #[must_use]
    pub fn compute(sessions: &[WorkSession]) -> Self {
        let completed: Vec<WorkSession> =
            sessions.iter().filter(|s| s.is_completed()).cloned().collect();
        Self {
            total_sessions: u32::try_from(completed.len()).unwrap_or(u32::MAX),
            total_hours: minutes_to_hours(compute_all_time_minutes(&completed)),
            longest_streak: compute_longest_streak(&completed),
            ratings: compute_difficulty_distribution(&completed),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanId, UserId};
    use crate::time::{fixed_now, fixed_today};

    fn session(days_ago: i64, status: SessionStatus, minutes: u32) -> WorkSession {
        let mut s = WorkSession::scheduled(
            UserId::generate(),
            PlanId::generate(),
            fixed_today() - Duration::days(days_ago),
            25,
            false,
            fixed_now(),
        );
        s.status = status;
        if status == SessionStatus::Completed {
            s.actual_duration = Some(minutes);
            s.completed_at = Some(fixed_now());
        }
        s
    }

    fn completed_run(days: std::ops::Range<i64>) -> Vec<WorkSession> {
        days.map(|d| session(d, SessionStatus::Completed, 25)).collect()
    }

    #[test]
    fn streak_counts_consecutive_completed_days() {
        let sessions = completed_run(0..5);
        assert_eq!(compute_streak(&sessions, fixed_today()), 5);
    }

    #[test]
    fn missed_session_truncates_streak_at_its_position() {
        for k in 0..5 {
            let mut sessions = completed_run(0..6);
            sessions[k] = session(k as i64, SessionStatus::Missed, 0);
            assert_eq!(compute_streak(&sessions, fixed_today()), k as u32, "k = {k}");
        }
    }

    #[test]
    fn missed_session_on_third_day_back_leaves_streak_of_two() {
        let mut sessions = completed_run(0..13);
        sessions[2] = session(2, SessionStatus::Missed, 0);
        assert_eq!(sessions.iter().filter(|s| s.is_completed()).count(), 12);
        assert_eq!(compute_streak(&sessions, fixed_today()), 2);
    }

    #[test]
    fn pending_session_today_neither_counts_nor_breaks() {
        let mut sessions = vec![session(0, SessionStatus::Scheduled, 0)];
        sessions.extend(completed_run(1..4));
        // Expected date stays on today, so yesterday's completion never matches.
        assert_eq!(compute_streak(&sessions, fixed_today()), 0);

        let sessions = completed_run(0..3);
        let mut with_pending = vec![session(0, SessionStatus::Scheduled, 0)];
        with_pending.extend(sessions);
        // A completed row for today after the pending one still counts.
        assert_eq!(compute_streak(&with_pending, fixed_today()), 3);
    }

    #[test]
    fn skipped_session_ends_streak() {
        let mut sessions = completed_run(0..2);
        sessions.push(session(2, SessionStatus::Skipped, 0));
        sessions.extend(completed_run(3..6));
        assert_eq!(compute_streak(&sessions, fixed_today()), 2);
    }

    #[test]
    fn gap_is_skipped_over_without_counting() {
        let sessions = vec![
            session(0, SessionStatus::Completed, 25),
            session(3, SessionStatus::Completed, 25),
        ];
        assert_eq!(compute_streak(&sessions, fixed_today()), 1);
        assert_eq!(compute_streak(&[], fixed_today()), 0);
    }

    #[test]
    fn weekly_window_covers_last_seven_days() {
        let sessions = vec![
            session(0, SessionStatus::Completed, 25),
            session(3, SessionStatus::Completed, 25),
            session(6, SessionStatus::Completed, 25),
            session(7, SessionStatus::Completed, 25),
            session(2, SessionStatus::Missed, 0),
        ];
        let stats = compute_weekly_stats(&sessions, fixed_today());
        assert_eq!(
            stats,
            WeeklyStats {
                sessions_completed: 3,
                total_focus_minutes: 75,
            }
        );
    }

    #[test]
    fn future_sessions_are_outside_weekly_window() {
        let mut tomorrow = session(0, SessionStatus::Completed, 40);
        tomorrow.scheduled_date = fixed_today() + Duration::days(1);
        let stats = compute_weekly_stats(&[tomorrow], fixed_today());
        assert_eq!(stats, WeeklyStats::default());
    }

    #[test]
    fn all_time_minutes_and_hour_rounding() {
        let sessions = vec![
            session(0, SessionStatus::Completed, 45),
            session(1, SessionStatus::Completed, 45),
            session(2, SessionStatus::Missed, 0),
        ];
        assert_eq!(compute_all_time_minutes(&sessions), 90);
        assert_eq!(minutes_to_hours(90), 2);
        assert_eq!(minutes_to_hours(89), 1);
        assert_eq!(minutes_to_hours(29), 0);
        assert_eq!(minutes_to_hours(0), 0);
    }

    #[test]
    fn longest_streak_picks_best_run() {
        let mut completed = completed_run(0..3);
        completed.extend(completed_run(5..8));
        assert_eq!(compute_longest_streak(&completed), 3);

        let mut completed = completed_run(0..2);
        completed.extend(completed_run(4..9));
        assert_eq!(compute_longest_streak(&completed), 5);

        assert_eq!(compute_longest_streak(&[]), 0);
        assert_eq!(compute_longest_streak(&completed_run(10..11)), 1);
    }

    #[test]
    fn same_day_duplicates_restart_run() {
        let completed = vec![
            session(0, SessionStatus::Completed, 25),
            session(0, SessionStatus::Completed, 25),
            session(1, SessionStatus::Completed, 25),
        ];
        assert_eq!(compute_longest_streak(&completed), 2);
    }

    #[test]
    fn distribution_has_every_rating() {
        let mut sessions = completed_run(0..4);
        sessions[0].difficulty_rating = Some(DifficultyRating::Easy);
        sessions[1].difficulty_rating = Some(DifficultyRating::Easy);
        sessions[2].difficulty_rating = Some(DifficultyRating::Challenging);

        let dist = compute_difficulty_distribution(&sessions);
        assert_eq!(dist.easy, 2);
        assert_eq!(dist.just_right, 0);
        assert_eq!(dist.challenging, 1);
        assert_eq!(dist.total(), 3);
        assert_eq!(dist.iter().count(), 3);
        assert_eq!(
            compute_difficulty_distribution(&[]),
            DifficultyDistribution::default()
        );
    }

    #[test]
    fn dashboard_and_history_compose() {
        let mut sessions = completed_run(0..3);
        sessions.push(session(3, SessionStatus::Missed, 0));
        sessions.extend(completed_run(4..10));
        sessions[0].difficulty_rating = Some(DifficultyRating::JustRight);

        let dash = DashboardStats::compute(&sessions, fixed_today());
        assert_eq!(dash.streak, 3);
        assert_eq!(dash.sessions_this_week, 6);
        assert_eq!(dash.total_focus_minutes, 150);
        assert_eq!(dash.total_focus_hours, 4);

        let history = HistoryStats::compute(&sessions);
        assert_eq!(history.total_sessions, 9);
        assert_eq!(history.longest_streak, 6);
        assert_eq!(history.ratings.just_right, 1);
        assert_eq!(history.total_hours, 4);
    }
}
