use novo_api::auth::TokenIssuer;
use novo_api::configuration::get_configuration;
use novo_api::localization::Localization;
use novo_api::repository::PgUserRepository;
use novo_api::seed::seed_admin;
use novo_api::startup::{build_auth_service, run, spawn_refresh_token_sweeper};
use novo_api::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::time::Duration;

fn startup_error(kind: std::io::ErrorKind, context: &str) -> std::io::Error {
    std::io::Error::new(kind, context.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Without a signing secret nothing can be authenticated; refuse to start
    let issuer = TokenIssuer::from_settings(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid JWT configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "JWT configuration error")
    })?;

    let localization = Localization::load().map_err(|e| {
        tracing::error!("Failed to load localization catalogs: {}", e);
        startup_error(std::io::ErrorKind::InvalidData, "Localization error")
    })?;

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;
    tracing::info!("Database connection pool created successfully");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            startup_error(std::io::ErrorKind::Other, "Migration error")
        })?;

    if let Some(seed) = &configuration.seed {
        let users = PgUserRepository::new(pool.clone());
        match seed_admin(&users, seed).await {
            Ok(true) => tracing::info!(email = %seed.admin_email, "Administrator seeded"),
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to seed administrator: {}", e),
        }
    }

    let auth = build_auth_service(&pool, issuer);
    spawn_refresh_token_sweeper(
        auth.clone(),
        Duration::from_secs(configuration.application.refresh_token_purge_interval_minutes * 60),
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, pool, auth, localization)?;
    tracing::info!("Server started successfully");

    server.await
}
