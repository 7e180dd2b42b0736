use chrono::NaiveDate;
use focus_core::model::{SessionId, SessionPatch, UserId, WorkSession};
use sqlx::SqliteConnection;

use super::{
    SqliteRepository,
    mapping::{SESSION_COLUMNS, db_err, map_session_row},
};
use crate::repository::{DateRange, StorageError, WorkSessionRepository};

/// Insert ledger rows, leaving any existing row for the same user and date
/// untouched. Returns the number of rows written.
pub(super) async fn insert_missing(
    conn: &mut SqliteConnection,
    sessions: &[WorkSession],
) -> Result<u64, StorageError> {
    let mut written = 0;
    for session in sessions {
        let res = sqlx::query(
            r"
            INSERT INTO work_sessions (
                id, user_id, plan_id, scheduled_date, planned_duration, actual_duration,
                is_rest_day, status, completed_at, difficulty_rating, notes,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(user_id, scheduled_date) DO NOTHING
            ",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(session.plan_id.to_string())
        .bind(session.scheduled_date)
        .bind(i64::from(session.planned_duration))
        .bind(session.actual_duration.map(i64::from))
        .bind(session.is_rest_day)
        .bind(session.status.as_str())
        .bind(session.completed_at)
        .bind(session.difficulty_rating.map(|r| r.as_str()))
        .bind(session.notes.as_deref())
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
        written += res.rows_affected();
    }
    Ok(written)
}

/// Delete the user's pending rows dated `from` or later.
pub(super) async fn delete_pending_from(
    conn: &mut SqliteConnection,
    user_id: UserId,
    from: NaiveDate,
) -> Result<u64, StorageError> {
    let res = sqlx::query(
        r"
        DELETE FROM work_sessions
        WHERE user_id = ?1
          AND status = 'scheduled'
          AND scheduled_date >= ?2
        ",
    )
    .bind(user_id.to_string())
    .bind(from)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(res.rows_affected())
}

#[async_trait::async_trait]
impl WorkSessionRepository for SqliteRepository {
    async fn find_sessions_by_user(
        &self,
        user_id: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<WorkSession>, StorageError> {
        let sql = format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM work_sessions
            WHERE user_id = ?1
              AND (?2 IS NULL OR scheduled_date >= ?2)
              AND (?3 IS NULL OR scheduled_date <= ?3)
            ORDER BY scheduled_date ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(range.map(|r| r.start))
            .bind(range.map(|r| r.end))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }

    async fn find_session_on(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<WorkSession>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions WHERE user_id = ?1 AND scheduled_date = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn get_session(
        &self,
        user_id: UserId,
        id: SessionId,
    ) -> Result<WorkSession, StorageError> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM work_sessions WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => map_session_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn insert_sessions(&self, sessions: &[WorkSession]) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let written = insert_missing(&mut *tx, sessions).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(written)
    }

    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> Result<WorkSession, StorageError> {
        let sql = format!(
            r"
            UPDATE work_sessions SET
                status = COALESCE(?2, status),
                planned_duration = COALESCE(?3, planned_duration),
                actual_duration = COALESCE(?4, actual_duration),
                completed_at = COALESCE(?5, completed_at),
                difficulty_rating = COALESCE(?6, difficulty_rating),
                notes = CASE WHEN ?9 THEN ?7 ELSE notes END,
                updated_at = ?8
            WHERE id = ?1
            RETURNING {SESSION_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.planned_duration.map(i64::from))
            .bind(patch.actual_duration.map(i64::from))
            .bind(patch.completed_at)
            .bind(patch.difficulty_rating.map(|r| r.as_str()))
            .bind(patch.notes.as_ref().and_then(Option::as_deref))
            .bind(patch.updated_at)
            .bind(patch.notes.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => map_session_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn upsert_completed(&self, session: &WorkSession) -> Result<WorkSession, StorageError> {
        let sql = format!(
            r"
            INSERT INTO work_sessions (
                id, user_id, plan_id, scheduled_date, planned_duration, actual_duration,
                is_rest_day, status, completed_at, difficulty_rating, notes,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(user_id, scheduled_date) DO UPDATE SET
                status = excluded.status,
                actual_duration = excluded.actual_duration,
                completed_at = excluded.completed_at,
                difficulty_rating = excluded.difficulty_rating,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            RETURNING {SESSION_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(session.id.to_string())
            .bind(session.user_id.to_string())
            .bind(session.plan_id.to_string())
            .bind(session.scheduled_date)
            .bind(i64::from(session.planned_duration))
            .bind(session.actual_duration.map(i64::from))
            .bind(session.is_rest_day)
            .bind(session.status.as_str())
            .bind(session.completed_at)
            .bind(session.difficulty_rating.map(|r| r.as_str()))
            .bind(session.notes.as_deref())
            .bind(session.created_at)
            .bind(session.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        map_session_row(&row)
    }
}
