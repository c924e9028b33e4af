/// Role management routes (`/api/roles`)
///
/// Reads are open to any authenticated caller; writes require `Admin`.

use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditLog;
use crate::auth::Claims;
use crate::error::{ApiError, AppError, Resource};
use crate::localization::Locale;
use crate::models::{RoleDetail, RoleRequest, ADMIN_ROLE};
use crate::repository::PgRoleRepository;
use crate::response::{ApiListResponse, ApiResponse, PageQuery, Pagination};

/// GET /api/roles?pageNumber=&pageSize=
pub async fn list_roles(
    query: web::Query<PageQuery>,
    roles: web::Data<PgRoleRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let page = Pagination::from(query.into_inner());
    let (data, total) = roles.list(page).await.map_err(|e| locale.fail(e))?;

    Ok(HttpResponse::Ok().json(ApiListResponse::page(
        locale.message("roles_loaded"),
        data,
        total,
        page,
    )))
}

/// GET /api/roles/{id}
pub async fn get_role(
    path: web::Path<Uuid>,
    roles: web::Data<PgRoleRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let role = roles
        .find(path.into_inner())
        .await
        .map_err(|e| locale.fail(e))?
        .ok_or_else(|| locale.fail(AppError::NotFound(Resource::Role)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locale.message("roles_loaded"), role)))
}

/// POST /api/roles (Admin)
pub async fn create_role(
    body: web::Json<RoleRequest>,
    claims: web::ReqData<Claims>,
    roles: web::Data<PgRoleRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let role = match apply_create(&claims, &roles, &body).await {
        Ok(role) => role,
        Err(e) => {
            AuditLog::failure("CREATE", "role", &e)
                .with_user_id(claims.sub.clone())
                .emit();
            return Err(locale.fail(e));
        }
    };

    AuditLog::new("CREATE", "role", "SUCCESS", format!("Role '{}' created", role.name))
        .with_resource_id(role.id.to_string())
        .with_user_id(claims.sub.clone())
        .emit();

    Ok(HttpResponse::Created().json(ApiResponse::ok(locale.message("role_created"), role)))
}

async fn apply_create(
    claims: &Claims,
    roles: &PgRoleRepository,
    req: &RoleRequest,
) -> Result<RoleDetail, AppError> {
    claims.require_role(ADMIN_ROLE)?;
    req.validate()?;

    roles.create(req).await
}

/// PUT /api/roles/{id} (Admin)
pub async fn update_role(
    path: web::Path<Uuid>,
    body: web::Json<RoleRequest>,
    claims: web::ReqData<Claims>,
    roles: web::Data<PgRoleRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let role = match apply_update(&claims, &roles, id, &body).await {
        Ok(role) => role,
        Err(e) => {
            AuditLog::failure("UPDATE", "role", &e)
                .with_resource_id(id.to_string())
                .with_user_id(claims.sub.clone())
                .emit();
            return Err(locale.fail(e));
        }
    };

    AuditLog::new("UPDATE", "role", "SUCCESS", format!("Role '{}' updated", role.name))
        .with_resource_id(id.to_string())
        .with_user_id(claims.sub.clone())
        .emit();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locale.message("role_updated"), role)))
}

async fn apply_update(
    claims: &Claims,
    roles: &PgRoleRepository,
    id: Uuid,
    req: &RoleRequest,
) -> Result<RoleDetail, AppError> {
    claims.require_role(ADMIN_ROLE)?;
    req.validate()?;

    roles
        .update(id, req)
        .await?
        .ok_or(AppError::NotFound(Resource::Role))
}

/// DELETE /api/roles/{id} (Admin)
pub async fn delete_role(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    roles: web::Data<PgRoleRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    if let Err(e) = apply_delete(&claims, &roles, id).await {
        AuditLog::failure("DELETE", "role", &e)
            .with_resource_id(id.to_string())
            .with_user_id(claims.sub.clone())
            .emit();
        return Err(locale.fail(e));
    }

    AuditLog::new("DELETE", "role", "SUCCESS", "Role deleted")
        .with_resource_id(id.to_string())
        .with_user_id(claims.sub.clone())
        .emit();

    Ok(HttpResponse::Ok().json(ApiResponse::message(true, locale.message("role_deleted"))))
}

async fn apply_delete(claims: &Claims, roles: &PgRoleRepository, id: Uuid) -> Result<(), AppError> {
    claims.require_role(ADMIN_ROLE)?;

    if roles.delete(id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(Resource::Role))
    }
}
