/// User data access
///
/// Uniqueness of username and email is enforced by the table constraints
/// (email compared case-insensitively); a violation surfaces as
/// `AppError::Conflict` through the sqlx conversion.
/// There is no application-level pre-check.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::{AuthUser, UserDirectory};
use crate::error::AppError;
use crate::models::{UpdateUserRequest, UserDetail};
use crate::response::Pagination;

const USER_DETAIL_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.created_at,
           ARRAY_REMOVE(ARRAY_AGG(r.name::text ORDER BY r.name), NULL) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

const AUTH_USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.password_hash,
           ARRAY_REMOVE(ARRAY_AGG(r.name::text ORDER BY r.name), NULL) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

/// Everything needed to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AuthUserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
}

impl From<AuthUserRow> for AuthUser {
    fn from(row: AuthUserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: Pagination) -> Result<(Vec<UserDetail>, i64), AppError> {
        let users = sqlx::query_as::<_, UserDetail>(&format!(
            "{} GROUP BY u.id ORDER BY u.created_at, u.username LIMIT $1 OFFSET $2",
            USER_DETAIL_SELECT
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<UserDetail>, AppError> {
        let user = sqlx::query_as::<_, UserDetail>(&format!(
            "{} WHERE u.id = $1 GROUP BY u.id",
            USER_DETAIL_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a user holding the roles in `role_ids`; unknown ids are ignored
    ///
    /// # Errors
    /// `Conflict` when the username or email is taken
    pub async fn create(&self, user: &NewUser, role_ids: &[Uuid]) -> Result<UserDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = insert_user(&mut tx, user).await?;
        assign_roles(&mut tx, id, role_ids).await?;

        tx.commit().await?;
        self.fetch_created(id).await
    }

    /// Insert a user holding the role called `role_name`
    pub async fn create_with_role(
        &self,
        user: &NewUser,
        role_name: &str,
    ) -> Result<UserDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = insert_user(&mut tx, user).await?;
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = $2
            "#,
        )
        .bind(id)
        .bind(role_name)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        self.fetch_created(id).await
    }

    /// Replace profile fields and the whole role set; `None` when absent
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<Option<UserDetail>, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(Utc::now())
        .execute(&mut tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut tx)
            .await?;
        assign_roles(&mut tx, id, &req.role_ids).await?;

        tx.commit().await?;
        self.find(id).await
    }

    /// Hard delete; role memberships and refresh tokens cascade
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn fetch_created(&self, id: Uuid) -> Result<UserDetail, AppError> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("user {} vanished after insert", id)))
    }
}

async fn insert_user(tx: &mut Transaction<'_, Postgres>, user: &NewUser) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, first_name, last_name, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    Ok(id)
}

async fn assign_roles(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    role_ids: &[Uuid],
) -> Result<(), AppError> {
    if role_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        SELECT $1, id FROM roles WHERE id = ANY($2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(role_ids)
    .execute(&mut *tx)
    .await?;

    Ok(())
}

impl UserDirectory for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, AppError> {
        let row = sqlx::query_as::<_, AuthUserRow>(&format!(
            "{} WHERE lower(u.email) = lower($1) GROUP BY u.id",
            AUTH_USER_SELECT
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthUser::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AppError> {
        let row = sqlx::query_as::<_, AuthUserRow>(&format!(
            "{} WHERE u.id = $1 GROUP BY u.id",
            AUTH_USER_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthUser::from))
    }
}
