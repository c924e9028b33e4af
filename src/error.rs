/// Error Handling Module
///
/// One taxonomy for the whole service:
/// 1. Domain errors (`AppError`, `AuthError`, `ConfigError`) used for control flow
/// 2. Conversions from sqlx and validator errors
/// 3. HTTP mapping (status, machine code, localization key)
/// 4. `ApiError`, the localized response rendered at the boundary

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use thiserror::Error;

/// ============================================================================
/// 1. DOMAIN ERROR TYPES
/// ============================================================================

/// A single failed validation rule on a request field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Authentication and authorization errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are never distinguished
    #[error("Invalid credentials")]
    AuthenticationFailed,
    /// Refresh token absent, revoked or expired
    #[error("Invalid or expired refresh token")]
    InvalidToken,
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid or expired access token")]
    InvalidAccessToken,
    #[error("Insufficient permissions")]
    Forbidden,
}

/// Configuration errors detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Entities addressed by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Role,
    Form,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::User => write!(f, "user"),
            Resource::Role => write!(f, "role"),
            Resource::Form => write!(f, "form"),
        }
    }
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0} not found")]
    NotFound(Resource),

    #[error("Duplicate entry: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Unavailable(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        AppError::Validation(fields)
    }
}

// ============================================================================
// 3. HTTP MAPPING
// ============================================================================

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for client-side handling
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Auth(AuthError::AuthenticationFailed) => "INVALID_CREDENTIALS",
            AppError::Auth(AuthError::InvalidToken) => "TOKEN_INVALID",
            AppError::Auth(AuthError::MissingToken | AuthError::InvalidAccessToken) => {
                "UNAUTHORIZED"
            }
            AppError::Auth(AuthError::Forbidden) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "DUPLICATE_ENTRY",
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Config(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Localization key of the user-facing message
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_failed",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Auth(AuthError::AuthenticationFailed) => "login_failed",
            AppError::Auth(AuthError::InvalidToken) => "invalid_token",
            AppError::Auth(AuthError::MissingToken | AuthError::InvalidAccessToken) => {
                "unauthorized"
            }
            AppError::Auth(AuthError::Forbidden) => "forbidden",
            AppError::NotFound(Resource::User) => "user_not_found",
            AppError::NotFound(Resource::Role) => "role_not_found",
            AppError::NotFound(Resource::Form) => "form_not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Unavailable(_) => "service_unavailable",
            AppError::Config(_) | AppError::Internal(_) => "internal_error",
        }
    }

    /// Details that are safe to echo back to the caller
    pub fn details(&self) -> Vec<String> {
        match self {
            AppError::Validation(fields) => fields.iter().map(ToString::to_string).collect(),
            AppError::InvalidRequest(reason) => vec![reason.clone()],
            _ => Vec::new(),
        }
    }

    pub fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(_) | AppError::InvalidRequest(_) => {
                tracing::warn!(error_id = error_id, error = %self, "Validation error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::NotFound(resource) => {
                tracing::info!(error_id = error_id, resource = %resource, "Resource not found");
            }
            AppError::Conflict(_) => {
                tracing::warn!(error_id = error_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Unavailable(_) => {
                tracing::error!(error_id = error_id, error = %self, "Dependency unavailable");
            }
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error_id = error_id, error = %self, "Internal error");
            }
        }
    }
}

// ============================================================================
// 4. BOUNDARY RESPONSE
// ============================================================================

/// Error body returned to clients
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
    /// Correlates the response with the server-side log entry
    pub error_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub timestamp: String,
}

/// An `AppError` paired with the message already translated for the caller
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub message: String,
}

impl ApiError {
    pub fn new(error: AppError, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Untranslated fallback; handlers go through `Locale::fail` instead
impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let message = error.to_string();
        Self { error, message }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.error.log(&error_id);

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            message: self.message.clone(),
            code: self.error.code().to_string(),
            error_id,
            errors: self.error.details(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(email(message = "invalid email"))]
        email: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Auth(AuthError::AuthenticationFailed).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::Forbidden).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound(Resource::Role).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unavailable("db".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_keys() {
        assert_eq!(
            AppError::Auth(AuthError::AuthenticationFailed).message_key(),
            "login_failed"
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidToken).message_key(),
            "invalid_token"
        );
        assert_eq!(
            AppError::NotFound(Resource::User).message_key(),
            "user_not_found"
        );
    }

    #[test]
    fn test_validation_errors_are_field_level() {
        let probe = Probe {
            name: "ab".to_string(),
            email: "not-an-email".to_string(),
        };
        let err: AppError = probe.validate().unwrap_err().into();

        assert_eq!(
            err.details(),
            vec![
                "email: invalid email".to_string(),
                "name: too short".to_string()
            ]
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string with password".to_string());
        assert!(err.details().is_empty());
    }

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[test]
    fn test_api_error_response_status() {
        let api_error = ApiError::new(
            AppError::Auth(AuthError::InvalidToken),
            "Invalid or expired refresh token",
        );
        let response = api_error.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
