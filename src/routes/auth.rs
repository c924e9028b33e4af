/// Authentication Routes
///
/// Login, token refresh, token revocation, self-registration and the
/// current user's profile.

use actix_web::{web, HttpResponse};

use crate::audit::AuditLog;
use crate::auth::{spawn_hash_password, AuthService, Claims};
use crate::error::{ApiError, AppError, Resource};
use crate::localization::Locale;
use crate::models::{LoginRequest, RefreshRequest, RegisterRequest, DEFAULT_ROLE};
use crate::repository::{NewUser, PgRefreshTokenStore, PgUserRepository};
use crate::response::{ApiResponse, AuthResponse};
use validator::Validate;

pub type PgAuthService = AuthService<PgUserRepository, PgRefreshTokenStore>;

/// POST /auth/login
///
/// # Errors
/// - 400: email or password missing
/// - 401: invalid credentials (unknown email and wrong password look the same)
pub async fn login(
    body: web::Json<LoginRequest>,
    auth: web::Data<PgAuthService>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    body.ensure_present().map_err(|e| locale.fail(e))?;

    let result = auth
        .login(&body.email, &body.password)
        .await
        .map_err(|e| locale.fail(e))?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(locale.message("login_success"), result)))
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair. The presented token is revoked;
/// presenting it again fails.
///
/// # Errors
/// - 400: refreshToken missing
/// - 401: unknown, revoked or expired refresh token
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    auth: web::Data<PgAuthService>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    body.ensure_present().map_err(|e| locale.fail(e))?;

    let result = auth
        .refresh(&body.refresh_token)
        .await
        .map_err(|e| locale.fail(e))?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(locale.message("token_refreshed"), result)))
}

/// POST /auth/revoke
///
/// Always 200; `success` tells whether the token was known.
pub async fn revoke(
    body: web::Json<RefreshRequest>,
    auth: web::Data<PgAuthService>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    body.ensure_present().map_err(|e| locale.fail(e))?;

    let success = auth
        .revoke(&body.refresh_token)
        .await
        .map_err(|e| locale.fail(e))?;

    let key = if success { "token_revoked" } else { "revoke_failed" };
    Ok(HttpResponse::Ok().json(ApiResponse::message(success, locale.message(key))))
}

/// POST /auth/register
///
/// Creates a user holding the default role.
///
/// # Errors
/// - 400: field-level validation errors
/// - 409: username or email already taken
pub async fn register(
    body: web::Json<RegisterRequest>,
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

    let user = match users.create_with_role(&new_user, DEFAULT_ROLE).await {
        Ok(user) => user,
        Err(e) => {
            AuditLog::failure("REGISTER", "user", &e).emit();
            return Err(locale.fail(e));
        }
    };

    AuditLog::new("REGISTER", "user", "SUCCESS", "User registered")
        .with_resource_id(user.id.to_string())
        .with_user_id(user.id.to_string())
        .emit();

    Ok(HttpResponse::Created().json(ApiResponse::ok(locale.message("registration_success"), user)))
}

/// GET /api/me
///
/// Requires a valid access token; claims are injected by the JWT middleware.
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    users: web::Data<PgUserRepository>,
    locale: Locale,
) -> Result<HttpResponse, ApiError> {
    let user_id = claims.user_id().map_err(|e| locale.fail(e))?;

    let user = users
        .find(user_id)
        .await
        .map_err(|e| locale.fail(e))?
        .ok_or_else(|| locale.fail(AppError::NotFound(Resource::User)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locale.message("profile_loaded"), user)))
}
