use focus_core::model::{Plan, PlanId, UserId};

use super::{
    SqliteRepository,
    mapping::{PLAN_COLUMNS, db_err, map_plan_row},
};
use crate::repository::{PlanRepository, StorageError};

#[async_trait::async_trait]
impl PlanRepository for SqliteRepository {
    async fn find_active_plan(&self, user_id: UserId) -> Result<Option<Plan>, StorageError> {
        let sql = format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = ?1 AND is_active = 1 LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_plan_row).transpose()
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan, StorageError> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => map_plan_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
