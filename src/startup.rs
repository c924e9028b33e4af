use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::TokenIssuer;
use crate::error::AppError;
use crate::localization::{localized_error, Localization};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::repository::{PgRefreshTokenStore, PgRoleRepository, PgUserRepository};
use crate::routes::{
    create_role, create_user, delete_role, delete_user, get_current_user, get_role, get_user,
    health_check, list_roles, list_users, login, login_form, refresh, register, register_form,
    revoke, update_role, update_user, PgAuthService,
};

pub fn build_auth_service(pool: &PgPool, issuer: TokenIssuer) -> Arc<PgAuthService> {
    Arc::new(PgAuthService::new(
        PgUserRepository::new(pool.clone()),
        PgRefreshTokenStore::new(pool.clone()),
        issuer,
    ))
}

fn invalid_request(reason: String, req: &HttpRequest) -> actix_web::Error {
    localized_error(req, AppError::InvalidRequest(reason)).into()
}

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    auth: Arc<PgAuthService>,
    localization: Localization,
) -> Result<Server, std::io::Error> {
    let jwt_issuer = Arc::new(auth.issuer().clone());
    let auth = web::Data::from(auth);
    let users = web::Data::new(PgUserRepository::new(connection.clone()));
    let roles = web::Data::new(PgRoleRepository::new(connection));
    let localization = web::Data::new(localization);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())
            .wrap(Cors::permissive())

            // Malformed bodies, queries and ids become localized 400s
            .app_data(web::JsonConfig::default().error_handler(|err, req| {
                invalid_request(err.to_string(), req)
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, req| {
                invalid_request(err.to_string(), req)
            }))
            .app_data(web::PathConfig::default().error_handler(|err, req| {
                invalid_request(err.to_string(), req)
            }))

            // Shared state
            .app_data(localization.clone())
            .app_data(auth.clone())
            .app_data(users.clone())
            .app_data(roles.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .route("/register", web::post().to(register)),
            )

            // Protected routes (require JWT authentication)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt_issuer.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .service(
                        web::resource("/users")
                            .route(web::get().to(list_users))
                            .route(web::post().to(create_user)),
                    )
                    .service(
                        web::resource("/users/{id}")
                            .route(web::get().to(get_user))
                            .route(web::put().to(update_user))
                            .route(web::delete().to(delete_user)),
                    )
                    .service(
                        web::resource("/roles")
                            .route(web::get().to(list_roles))
                            .route(web::post().to(create_role)),
                    )
                    .service(
                        web::resource("/roles/{id}")
                            .route(web::get().to(get_role))
                            .route(web::put().to(update_role))
                            .route(web::delete().to(delete_role)),
                    )
                    .route("/forms/login-form", web::get().to(login_form))
                    .route("/forms/register-form", web::get().to(register_form)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Periodically delete expired refresh tokens
///
/// A zero interval disables the sweep. A failed run is logged and retried
/// on the next tick.
pub fn spawn_refresh_token_sweeper(
    auth: Arc<PgAuthService>,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        tracing::info!("Refresh token sweeper disabled");
        return None;
    }

    tracing::info!(interval_secs = every.as_secs(), "Starting refresh token sweeper");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match auth.purge_expired().await {
                Ok(removed) => tracing::info!(removed, "Expired refresh tokens purged"),
                Err(e) => tracing::error!(error = %e, "Refresh token sweep failed"),
            }
        }
    }))
}
