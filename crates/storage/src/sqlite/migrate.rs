use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs versioned migrations for the current schema.
///
/// Creates users, plans, the work session ledger, the progression audit
/// trail and their indexes. Child rows cascade when a user is deleted.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS plans (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    focus_duration INTEGER NOT NULL CHECK (focus_duration IN (15, 25, 45, 60, 90)),
                    days_per_week INTEGER NOT NULL CHECK (days_per_week BETWEEN 1 AND 7),
                    work_days TEXT NOT NULL,
                    current_progression_week INTEGER NOT NULL DEFAULT 1
                        CHECK (current_progression_week >= 1),
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS work_sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    plan_id TEXT NOT NULL,
                    scheduled_date TEXT NOT NULL,
                    planned_duration INTEGER NOT NULL CHECK (planned_duration >= 0),
                    actual_duration INTEGER CHECK (actual_duration >= 0),
                    is_rest_day INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'scheduled'
                        CHECK (status IN ('scheduled', 'completed', 'missed', 'skipped')),
                    completed_at TEXT,
                    difficulty_rating TEXT
                        CHECK (difficulty_rating IN ('easy', 'just_right', 'challenging')),
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                    FOREIGN KEY (plan_id) REFERENCES plans(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progressions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    previous_duration INTEGER NOT NULL,
                    previous_frequency INTEGER NOT NULL,
                    new_duration INTEGER NOT NULL,
                    new_frequency INTEGER NOT NULL,
                    progression_type TEXT NOT NULL
                        CHECK (progression_type IN ('auto', 'manual', 'custom')),
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // One ledger row per user per day.
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_work_sessions_user_date
                    ON work_sessions (user_id, scheduled_date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_work_sessions_user_status
                    ON work_sessions (user_id, status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_work_sessions_plan
                    ON work_sessions (plan_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        // At most one active plan per user.
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_plans_user_active
                    ON plans (user_id) WHERE is_active = 1;
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progressions_user_created
                    ON progressions (user_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
