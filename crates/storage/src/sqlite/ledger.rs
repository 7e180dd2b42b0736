use chrono::NaiveDate;
use focus_core::model::{Plan, PlanId, PlanPatch, Progression, UserId, WorkSession};
use sqlx::{Row, SqliteConnection};

use super::{
    SqliteRepository,
    mapping::{db_err, ser, work_days_to_json},
    work_session_repo::{delete_pending_from, insert_missing},
};
use crate::repository::{LedgerPersistence, StorageError};

/// Apply a plan patch and return the owning user.
async fn patch_plan(
    conn: &mut SqliteConnection,
    plan_id: PlanId,
    patch: &PlanPatch,
) -> Result<UserId, StorageError> {
    let work_days = patch.work_days.map(work_days_to_json).transpose()?;
    let row = sqlx::query(
        r"
        UPDATE plans SET
            focus_duration = COALESCE(?2, focus_duration),
            days_per_week = COALESCE(?3, days_per_week),
            work_days = COALESCE(?4, work_days),
            current_progression_week = COALESCE(?5, current_progression_week),
            is_active = COALESCE(?6, is_active),
            updated_at = ?7
        WHERE id = ?1
        RETURNING user_id
        ",
    )
    .bind(plan_id.to_string())
    .bind(patch.focus_duration.map(|d| i64::from(d.minutes())))
    .bind(patch.days_per_week.map(i64::from))
    .bind(work_days)
    .bind(patch.current_progression_week.map(i64::from))
    .bind(patch.is_active)
    .bind(patch.updated_at)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    let row = row.ok_or(StorageError::NotFound)?;
    let raw: String = row.try_get("user_id").map_err(ser)?;
    raw.parse().map_err(ser)
}

#[async_trait::async_trait]
impl LedgerPersistence for SqliteRepository {
    async fn activate_plan(
        &self,
        plan: &Plan,
        drafts: &[WorkSession],
        from: NaiveDate,
    ) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            UPDATE plans SET is_active = 0, updated_at = ?2
            WHERE user_id = ?1 AND is_active = 1
            ",
        )
        .bind(plan.user_id().to_string())
        .bind(plan.created_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO plans (
                id, user_id, focus_duration, days_per_week, work_days,
                current_progression_week, is_active, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(plan.id().to_string())
        .bind(plan.user_id().to_string())
        .bind(i64::from(plan.focus_duration().minutes()))
        .bind(i64::from(plan.days_per_week()))
        .bind(work_days_to_json(plan.work_days())?)
        .bind(i64::from(plan.current_progression_week()))
        .bind(plan.is_active())
        .bind(plan.created_at())
        .bind(plan.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let dropped = delete_pending_from(&mut tx, plan.user_id(), from).await?;
        let written = insert_missing(&mut tx, drafts).await?;

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(plan_id = %plan.id(), dropped, written, "plan activated");
        Ok(written)
    }

    async fn replace_schedule(
        &self,
        plan_id: PlanId,
        patch: &PlanPatch,
        drafts: &[WorkSession],
        from: NaiveDate,
    ) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let user_id = patch_plan(&mut tx, plan_id, patch).await?;
        let dropped = delete_pending_from(&mut tx, user_id, from).await?;
        let written = insert_missing(&mut tx, drafts).await?;

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(%plan_id, dropped, written, "schedule replaced");
        Ok(written)
    }

    async fn commit_progression(
        &self,
        progression: &Progression,
        plan_id: PlanId,
        patch: &PlanPatch,
        planned_duration: u32,
        from: NaiveDate,
    ) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO progressions (
                id, user_id, previous_duration, previous_frequency,
                new_duration, new_frequency, progression_type, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(progression.id.to_string())
        .bind(progression.user_id.to_string())
        .bind(i64::from(progression.previous_duration.minutes()))
        .bind(i64::from(progression.previous_frequency))
        .bind(i64::from(progression.new_duration.minutes()))
        .bind(i64::from(progression.new_frequency))
        .bind(progression.progression_type.as_str())
        .bind(progression.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        patch_plan(&mut tx, plan_id, patch).await?;

        let res = sqlx::query(
            r"
            UPDATE work_sessions SET planned_duration = ?2, updated_at = ?3
            WHERE plan_id = ?1
              AND status = 'scheduled'
              AND scheduled_date >= ?4
            ",
        )
        .bind(plan_id.to_string())
        .bind(i64::from(planned_duration))
        .bind(patch.updated_at)
        .bind(from)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(res.rows_affected())
    }
}
