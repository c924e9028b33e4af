/// Startup seeding of the default administrator
///
/// Roles themselves are seeded by the migrations.

use crate::audit::AuditLog;
use crate::auth::spawn_hash_password;
use crate::configuration::SeedSettings;
use crate::error::AppError;
use crate::models::ADMIN_ROLE;
use crate::repository::{NewUser, PgUserRepository};

/// Create the administrator unless a user with the seed email exists
///
/// Returns `true` when a user was created. Losing a unique-constraint race
/// against another instance seeding at the same time counts as "exists".
pub async fn seed_admin(users: &PgUserRepository, seed: &SeedSettings) -> Result<bool, AppError> {
    if users.exists_by_email(&seed.admin_email).await? {
        tracing::debug!("Administrator already present, skipping seed");
        return Ok(false);
    }

    let admin = NewUser {
        username: seed.admin_username.clone(),
        email: seed.admin_email.clone(),
        password_hash: spawn_hash_password(seed.admin_password.clone()).await?,
        first_name: Some("System".to_string()),
        last_name: Some("Administrator".to_string()),
    };

    match users.create_with_role(&admin, ADMIN_ROLE).await {
        Ok(user) => {
            AuditLog::new("CREATE", "user", "SUCCESS", "Administrator seeded")
                .with_resource_id(user.id.to_string())
                .emit();
            Ok(true)
        }
        Err(AppError::Conflict(_)) => {
            tracing::info!("Administrator seeded concurrently by another instance");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
