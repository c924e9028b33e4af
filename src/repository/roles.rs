/// Role data access

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{RoleDetail, RoleRequest};
use crate::response::Pagination;

#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: Pagination) -> Result<(Vec<RoleDetail>, i64), AppError> {
        let roles = sqlx::query_as::<_, RoleDetail>(
            r#"
            SELECT id, name, description, created_at
            FROM roles
            ORDER BY name
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await?;

        Ok((roles, total))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<RoleDetail>, AppError> {
        let role = sqlx::query_as::<_, RoleDetail>(
            "SELECT id, name, description, created_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// # Errors
    /// `Conflict` when the name is taken
    pub async fn create(&self, req: &RoleRequest) -> Result<RoleDetail, AppError> {
        let role = sqlx::query_as::<_, RoleDetail>(
            r#"
            INSERT INTO roles (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }

    /// `None` when no role has this id
    pub async fn update(&self, id: Uuid, req: &RoleRequest) -> Result<Option<RoleDetail>, AppError> {
        let role = sqlx::query_as::<_, RoleDetail>(
            r#"
            UPDATE roles SET name = $2, description = $3
            WHERE id = $1
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Memberships cascade; returns `false` when nothing was deleted
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
