use std::str::FromStr;

use focus_core::model::{
    FocusDuration, Plan, Progression, User, WorkDays, WorkSession,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) const SESSION_COLUMNS: &str = r"
    id, user_id, plan_id, scheduled_date, planned_duration, actual_duration,
    is_rest_day, status, completed_at, difficulty_rating, notes, created_at, updated_at
";

pub(crate) const PLAN_COLUMNS: &str = r"
    id, user_id, focus_duration, days_per_week, work_days, current_progression_week,
    is_active, created_at, updated_at
";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors; unique violations become `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn parse_col<T>(row: &SqliteRow, column: &'static str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(ser)?;
    raw.parse::<T>()
        .map_err(|e| StorageError::Serialization(format!("{column}: {e}")))
}

fn parse_opt_col<T>(row: &SqliteRow, column: &'static str) -> Result<Option<T>, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw: Option<String> = row.try_get(column).map_err(ser)?;
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| StorageError::Serialization(format!("{column}: {e}")))
    })
    .transpose()
}

fn duration_col(row: &SqliteRow, column: &'static str) -> Result<FocusDuration, StorageError> {
    let minutes = u32_from_i64(column, row.try_get::<i64, _>(column).map_err(ser)?)?;
    FocusDuration::from_minutes(minutes).map_err(ser)
}

/// Work days persist as a JSON array of weekday indices, e.g. `[1,2,3,4]`.
pub(crate) fn work_days_to_json(days: WorkDays) -> Result<String, StorageError> {
    serde_json::to_string(&days.indices()).map_err(ser)
}

pub(crate) fn work_days_from_json(raw: &str) -> Result<WorkDays, StorageError> {
    let indices: Vec<u8> = serde_json::from_str(raw).map_err(ser)?;
    WorkDays::from_indices(indices).map_err(ser)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    Ok(User {
        id: parse_col(row, "id")?,
        username: row.try_get("username").map_err(ser)?,
        password_hash: row.try_get("password_hash").map_err(ser)?,
    })
}

pub(crate) fn map_plan_row(row: &SqliteRow) -> Result<Plan, StorageError> {
    let work_days: String = row.try_get("work_days").map_err(ser)?;
    Plan::from_persisted(
        parse_col(row, "id")?,
        parse_col(row, "user_id")?,
        duration_col(row, "focus_duration")?,
        u8_from_i64(
            "days_per_week",
            row.try_get::<i64, _>("days_per_week").map_err(ser)?,
        )?,
        work_days_from_json(&work_days)?,
        u32_from_i64(
            "current_progression_week",
            row.try_get::<i64, _>("current_progression_week")
                .map_err(ser)?,
        )?,
        row.try_get::<bool, _>("is_active").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<WorkSession, StorageError> {
    Ok(WorkSession {
        id: parse_col(row, "id")?,
        user_id: parse_col(row, "user_id")?,
        plan_id: parse_col(row, "plan_id")?,
        scheduled_date: row.try_get("scheduled_date").map_err(ser)?,
        planned_duration: u32_from_i64(
            "planned_duration",
            row.try_get::<i64, _>("planned_duration").map_err(ser)?,
        )?,
        actual_duration: row
            .try_get::<Option<i64>, _>("actual_duration")
            .map_err(ser)?
            .map(|v| u32_from_i64("actual_duration", v))
            .transpose()?,
        is_rest_day: row.try_get::<bool, _>("is_rest_day").map_err(ser)?,
        status: parse_col(row, "status")?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        difficulty_rating: parse_opt_col(row, "difficulty_rating")?,
        notes: row.try_get("notes").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_progression_row(row: &SqliteRow) -> Result<Progression, StorageError> {
    Ok(Progression {
        id: parse_col(row, "id")?,
        user_id: parse_col(row, "user_id")?,
        previous_duration: duration_col(row, "previous_duration")?,
        previous_frequency: u8_from_i64(
            "previous_frequency",
            row.try_get::<i64, _>("previous_frequency").map_err(ser)?,
        )?,
        new_duration: duration_col(row, "new_duration")?,
        new_frequency: u8_from_i64(
            "new_frequency",
            row.try_get::<i64, _>("new_frequency").map_err(ser)?,
        )?,
        progression_type: parse_col(row, "progression_type")?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_days_json_is_sorted_indices() {
        let days = WorkDays::from_indices([4, 1, 3]).unwrap();
        assert_eq!(work_days_to_json(days).unwrap(), "[1,3,4]");
        assert_eq!(work_days_from_json("[4,1,3,3]").unwrap(), days);
        assert!(work_days_from_json("[]").is_err());
        assert!(work_days_from_json("[7]").is_err());
    }
}
