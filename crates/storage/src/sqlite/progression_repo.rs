use focus_core::model::{Progression, UserId};

use super::{
    SqliteRepository,
    mapping::{db_err, map_progression_row},
};
use crate::repository::{ProgressionRepository, StorageError};

#[async_trait::async_trait]
impl ProgressionRepository for SqliteRepository {
    async fn list_progressions(&self, user_id: UserId) -> Result<Vec<Progression>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                id, user_id, previous_duration, previous_frequency,
                new_duration, new_frequency, progression_type, created_at
            FROM progressions
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progression_row(&row)?);
        }
        Ok(out)
    }
}
