/// User management routes (`/api/users`)
///
/// Reads are open to any authenticated caller. Update and delete require
/// the `Admin` role.

use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditLog;
use crate::auth::{spawn_hash_password, Claims};
use crate::error::{ApiError, AppError, Resource};
use crate::localization::Locale;
use crate::models::{CreateUserRequest, UpdateUserRequest, UserDetail, ADMIN_ROLE};
use crate::repository::{NewUser, PgUserRepository};
use crate::response::{ApiListResponse, ApiResponse, PageQuery, Pagination};

/// GET /api/users?pageNumber=&pageSize=
pub async fn list_users(
    query: web::Query<PageQuery>,
    users: web::Data<PgUserRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let page = Pagination::from(query.into_inner());
    let (data, total) = users.list(page).await.map_err(|e| locale.fail(e))?;

    Ok(HttpResponse::Ok().json(ApiListResponse::page(
        locale.message("users_loaded"),
        data,
        total,
        page,
    )))
}

/// GET /api/users/{id}
pub async fn get_user(
    path: web::Path<Uuid>,
    users: web::Data<PgUserRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let user = users
        .find(path.into_inner())
        .await
        .map_err(|e| locale.fail(e))?
        .ok_or_else(|| locale.fail(AppError::NotFound(Resource::User)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locale.message("users_loaded"), user)))
}

/// POST /api/users
///
/// Unknown role ids are ignored.
pub async fn create_user(
    body: web::Json<CreateUserRequest>,
    claims: web::ReqData<Claims>,
    users: web::Data<PgUserRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    req.validate().map_err(|e| locale.fail(e))?;

    let new_user = NewUser {
        password_hash: spawn_hash_password(req.password)
            .await
            .map_err(|e| locale.fail(e))?,
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
    };

    let user = match users.create(&new_user, &req.role_ids).await {
        Ok(user) => user,
        Err(e) => {
            AuditLog::failure("CREATE", "user", &e)
                .with_user_id(claims.sub.clone())
                .emit();
            return Err(locale.fail(e));
        }
    };

    AuditLog::new("CREATE", "user", "SUCCESS", "User created")
        .with_resource_id(user.id.to_string())
        .with_user_id(claims.sub.clone())
        .emit();

    Ok(HttpResponse::Created().json(ApiResponse::ok(locale.message("user_created"), user)))
}

/// PUT /api/users/{id} (Admin)
///
/// Replaces profile fields and the whole role set.
pub async fn update_user(
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
    claims: web::ReqData<Claims>,
    users: web::Data<PgUserRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let user = match apply_update(&claims, &users, id, &body).await {
        Ok(user) => user,
        Err(e) => {
            AuditLog::failure("UPDATE", "user", &e)
                .with_resource_id(id.to_string())
                .with_user_id(claims.sub.clone())
                .emit();
            return Err(locale.fail(e));
        }
    };

    AuditLog::new("UPDATE", "user", "SUCCESS", "User updated")
        .with_resource_id(id.to_string())
        .with_user_id(claims.sub.clone())
        .emit();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locale.message("user_updated"), user)))
}

async fn apply_update(
    claims: &Claims,
    users: &PgUserRepository,
    id: Uuid,
    req: &UpdateUserRequest,
) -> Result<UserDetail, AppError> {
    claims.require_role(ADMIN_ROLE)?;
    req.validate()?;

    users
        .update(id, req)
        .await?
        .ok_or(AppError::NotFound(Resource::User))
}

/// DELETE /api/users/{id} (Admin)
pub async fn delete_user(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    users: web::Data<PgUserRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    if let Err(e) = apply_delete(&claims, &users, id).await {
        AuditLog::failure("DELETE", "user", &e)
            .with_resource_id(id.to_string())
            .with_user_id(claims.sub.clone())
            .emit();
        return Err(locale.fail(e));
    }

    AuditLog::new("DELETE", "user", "SUCCESS", "User deleted")
        .with_resource_id(id.to_string())
        .with_user_id(claims.sub.clone())
        .emit();

    Ok(HttpResponse::Ok().json(ApiResponse::message(true, locale.message("user_deleted"))))
}

async fn apply_delete(claims: &Claims, users: &PgUserRepository, id: Uuid) -> Result<(), AppError> {
    claims.require_role(ADMIN_ROLE)?;

    if users.delete(id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(Resource::User))
    }
}
