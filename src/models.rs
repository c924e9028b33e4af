/// Domain rows and request bodies
///
/// Request types carry their field rules as `validator` attributes; handlers
/// call `.validate()?` and get field-level `AppError::Validation` back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;

pub const ADMIN_ROLE: &str = "Admin";
pub const DEFAULT_ROLE: &str = "User";

/// User as returned by the API; never carries the password hash
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(rename = "createdDate")]
    pub created_at: DateTime<Utc>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "createdDate")]
    pub created_at: DateTime<Utc>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Surrounding whitespace is dropped before validation, so the length rules
/// apply to exactly what gets stored
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|value| value.trim().to_string())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 20, message = "must be between 3 and 20 characters"),
        custom(function = "not_blank")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub username: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 256, message = "must be at most 256 characters")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

/// Public self-registration; the new user always gets the default role
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 20, message = "must be between 3 and 20 characters"),
        custom(function = "not_blank")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub username: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 256, message = "must be at most 256 characters")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: Option<String>,
}

/// Full replacement of a user's profile and role set
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 3, max = 20, message = "must be between 3 and 20 characters"),
        custom(function = "not_blank")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub username: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 256, message = "must be at most 256 characters")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub email: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

/// Body of both role create and role update
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    #[validate(
        length(min = 3, max = 50, message = "must be between 3 and 50 characters"),
        custom(function = "not_blank")
    )]
    #[serde(deserialize_with = "trimmed")]
    pub name: String,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Missing fields deserialize as empty and are rejected by `ensure_present`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

fn ensure_present(fields: &[(&str, &str)]) -> Result<(), AppError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )))
    }
}

impl LoginRequest {
    pub fn ensure_present(&self) -> Result<(), AppError> {
        ensure_present(&[
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ])
    }
}

impl RefreshRequest {
    pub fn ensure_present(&self) -> Result<(), AppError> {
        ensure_present(&[("refreshToken", self.refresh_token.as_str())])
    }
}
