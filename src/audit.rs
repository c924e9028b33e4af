/// Audit Trail
///
/// Structured records of every state-changing operation (user and role
/// CRUD, registration, refresh-token rotation, revocation and the expiry
/// sweep). Entries are emitted through `tracing` so they land in the same
/// JSON stream as the rest of the service logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// One audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    /// CREATE, UPDATE, DELETE, REGISTER, ROTATE, REVOKE, PURGE
    pub action: String,
    /// user, role, refresh_token
    pub resource_type: String,
    pub resource_id: Option<String>,
    /// Who performed the action, when known
    pub user_id: Option<String>,
    /// SUCCESS or FAILURE
    pub status: String,
    pub message: String,
}

impl AuditLog {
    pub fn new(
        action: &str,
        resource_type: &str,
        status: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: None,
            user_id: None,
            status: status.to_string(),
            message: message.into(),
        }
    }

    /// FAILURE entry carrying the error that stopped the operation
    pub fn failure(action: &str, resource_type: &str, error: &AppError) -> Self {
        Self::new(action, resource_type, "FAILURE", error.to_string())
    }

    pub fn with_resource_id(mut self, id: String) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == "FAILURE"
    }

    /// Write the entry; failures at `warn`, everything else at `info`
    pub fn emit(&self) {
        if self.is_failure() {
            tracing::warn!(
                log_id = %self.log_id,
                action = %self.action,
                resource_type = %self.resource_type,
                resource_id = ?self.resource_id,
                user_id = ?self.user_id,
                status = %self.status,
                message = %self.message,
                "Audit log entry"
            );
        } else {
            tracing::info!(
                log_id = %self.log_id,
                action = %self.action,
                resource_type = %self.resource_type,
                resource_id = ?self.resource_id,
                user_id = ?self.user_id,
                status = %self.status,
                message = %self.message,
                "Audit log entry"
            );
        }
    }
}
