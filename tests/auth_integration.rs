use chrono::{Duration, Utc};
use novo_api::auth::{generate_refresh_token, RefreshTokenRecord, TokenIssuer};
use novo_api::configuration::{get_configuration, DatabaseSettings, Settings};
use novo_api::localization::Localization;
use novo_api::repository::PgUserRepository;
use novo_api::seed::seed_admin;
use novo_api::startup::{build_auth_service, run};
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;
use uuid::Uuid;

const ADMIN_EMAIL: &str = "admin@novo.com";
const ADMIN_PASSWORD: &str = "Admin@123456";

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub configuration: Settings,
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/auth/login", &json!({"email": email, "password": password}))
            .await
    }

    async fn admin_session(&self) -> Value {
        let response = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }
}

/// `None` when no Postgres is reachable; the caller skips the test
async fn spawn_app() -> Option<TestApp> {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await?;

    if let Some(seed) = &configuration.seed {
        seed_admin(&PgUserRepository::new(connection_pool.clone()), seed)
            .await
            .expect("Failed to seed administrator");
    }

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let issuer = TokenIssuer::from_settings(&configuration.jwt).expect("Invalid JWT settings");
    let auth = build_auth_service(&connection_pool, issuer);
    let localization = Localization::load().expect("Failed to load localization");

    let server = run(listener, connection_pool.clone(), auth, localization)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    Some(TestApp {
        address: format!("http://127.0.0.1:{}", port),
        db_pool: connection_pool,
        configuration,
    })
}

pub async fn configure_database(config: &DatabaseSettings) -> Option<PgPool> {
    // Create database
    let mut connection = match PgConnection::connect(&config.connection_string_without_db()).await
    {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Skipping database test, Postgres unavailable: {}", e);
            return None;
        }
    };
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    Some(connection_pool)
}

macro_rules! app_or_skip {
    () => {
        match spawn_app().await {
            Some(app) => app,
            None => return,
        }
    };
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_and_roles_for_seeded_admin() {
    let app = app_or_skip!();

    let body = app.admin_session().await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["roles"], json!(["Admin"]));
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["expiresAt"].is_string());

    // Only the digest of the refresh token is persisted
    let refresh_token = body["refreshToken"].as_str().unwrap();
    let row = sqlx::query(
        "SELECT t.token_hash, t.is_revoked FROM refresh_tokens t \
         JOIN users u ON u.id = t.user_id WHERE u.email = $1",
    )
    .bind(ADMIN_EMAIL)
    .fetch_one(&app.db_pool)
    .await
    .expect("Failed to fetch refresh token");

    assert_ne!(row.get::<String, _>("token_hash"), refresh_token);
    assert!(!row.get::<bool, _>("is_revoked"));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = app_or_skip!();

    let wrong_password = app.login(ADMIN_EMAIL, "not-the-password").await;
    let unknown_email = app.login("nobody@novo.com", ADMIN_PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);

    let tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(tokens, 0);
}

#[tokio::test]
async fn login_failure_message_is_localized() {
    let app = app_or_skip!();

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", app.address))
        .header("X-Culture", "hi")
        .json(&json!({"email": ADMIN_EMAIL, "password": "wrong"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "अमान्य ईमेल या पासवर्ड");
}

// --- Refresh ---

#[tokio::test]
async fn refresh_rotates_and_rejects_reuse() {
    let app = app_or_skip!();
    let session = app.admin_session().await;
    let original = session["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .post("/auth/refresh", &json!({"refreshToken": original}))
        .await;
    assert_eq!(200, response.status().as_u16());
    let rotated: Value = response.json().await.unwrap();
    assert_ne!(rotated["refreshToken"], json!(original));
    assert_eq!(rotated["roles"], json!(["Admin"]));

    let reuse = app
        .post("/auth/refresh", &json!({"refreshToken": original}))
        .await;
    assert_eq!(401, reuse.status().as_u16());
    let body: Value = reuse.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_INVALID");

    // The replacement keeps working
    let again = app
        .post("/auth/refresh", &json!({"refreshToken": rotated["refreshToken"]}))
        .await;
    assert_eq!(200, again.status().as_u16());
}

#[tokio::test]
async fn concurrent_refresh_of_one_token_succeeds_once() {
    let app = app_or_skip!();
    let session = app.admin_session().await;
    let body = json!({"refreshToken": session["refreshToken"]});

    let (a, b) = tokio::join!(
        app.post("/auth/refresh", &body),
        app.post("/auth/refresh", &body)
    );

    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 401]);

    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE is_revoked = false")
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn refresh_rejects_expired_and_unknown_tokens() {
    let app = app_or_skip!();
    let admin_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(ADMIN_EMAIL)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    // Issued ten days ago with the default seven-day lifetime
    let token = generate_refresh_token();
    let mut record = RefreshTokenRecord::new(admin_id, &token, Utc::now() - Duration::days(3));
    record.created_at = Utc::now() - Duration::days(10);
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, is_revoked, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(&record.token_hash)
    .bind(record.expires_at)
    .bind(record.is_revoked)
    .bind(record.created_at)
    .execute(&app.db_pool)
    .await
    .expect("Failed to insert expired token");

    let expired = app.post("/auth/refresh", &json!({"refreshToken": token})).await;
    assert_eq!(401, expired.status().as_u16());

    let unknown = app
        .post("/auth/refresh", &json!({"refreshToken": generate_refresh_token()}))
        .await;
    assert_eq!(401, unknown.status().as_u16());
}

#[tokio::test]
async fn purge_removes_only_expired_tokens() {
    let app = app_or_skip!();
    app.admin_session().await;

    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
         SELECT $1, id, 'stale-digest', now() - interval '1 day' FROM users WHERE email = $2",
    )
    .bind(Uuid::new_v4())
    .bind(ADMIN_EMAIL)
    .execute(&app.db_pool)
    .await
    .unwrap();

    let issuer = TokenIssuer::from_settings(&app.configuration.jwt).unwrap();
    let removed = build_auth_service(&app.db_pool, issuer)
        .purge_expired()
        .await
        .expect("Purge failed");
    assert_eq!(removed, 1);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

// --- Revoke ---

#[tokio::test]
async fn revoke_is_idempotent_and_reports_unknown_tokens() {
    let app = app_or_skip!();
    let session = app.admin_session().await;
    let body = json!({"refreshToken": session["refreshToken"]});

    for _ in 0..2 {
        let response = app.post("/auth/revoke", &body).await;
        assert_eq!(200, response.status().as_u16());
        let result: Value = response.json().await.unwrap();
        assert_eq!(result["success"], true);
    }

    let refresh = app.post("/auth/refresh", &body).await;
    assert_eq!(401, refresh.status().as_u16());

    let unknown = app
        .post("/auth/revoke", &json!({"refreshToken": generate_refresh_token()}))
        .await;
    assert_eq!(200, unknown.status().as_u16());
    let result: Value = unknown.json().await.unwrap();
    assert_eq!(result["success"], false);
}

// --- Registration ---

#[tokio::test]
async fn register_creates_user_with_default_role() {
    let app = app_or_skip!();

    let response = app
        .post(
            "/auth/register",
            &json!({
                "username": "jdoe",
                "email": "jdoe@novo.com",
                "password": "Secret@123",
                "firstName": "John"
            }),
        )
        .await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], "jdoe");
    assert_eq!(body["data"]["roles"], json!(["User"]));
    assert!(body["data"].get("passwordHash").is_none());

    let login = app.login("jdoe@novo.com", "Secret@123").await;
    assert_eq!(200, login.status().as_u16());
    let session: Value = login.json().await.unwrap();
    assert_eq!(session["roles"], json!(["User"]));
}

#[tokio::test]
async fn register_rejects_duplicates() {
    let app = app_or_skip!();
    let user = json!({
        "username": "jdoe",
        "email": "jdoe@novo.com",
        "password": "Secret@123"
    });

    assert_eq!(201, app.post("/auth/register", &user).await.status().as_u16());

    let duplicate = app.post("/auth/register", &user).await;
    assert_eq!(409, duplicate.status().as_u16());
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn email_is_unique_and_matched_regardless_of_case() {
    let app = app_or_skip!();

    let taken = app
        .post(
            "/auth/register",
            &json!({"username": "impostor", "email": "ADMIN@novo.com", "password": "Secret@123"}),
        )
        .await;
    assert_eq!(409, taken.status().as_u16());

    let login = app.login("Admin@Novo.com", ADMIN_PASSWORD).await;
    assert_eq!(200, login.status().as_u16());
    let session: Value = login.json().await.unwrap();
    assert_eq!(session["roles"], json!(["Admin"]));
}

#[tokio::test]
async fn register_stores_trimmed_identity() {
    let app = app_or_skip!();

    let response = app
        .post(
            "/auth/register",
            &json!({"username": "  jdoe  ", "email": " jdoe@novo.com ", "password": "Secret@123"}),
        )
        .await;
    assert_eq!(201, response.status().as_u16());

    let row = sqlx::query("SELECT username, email FROM users WHERE username = 'jdoe'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch registered user");
    assert_eq!(row.get::<String, _>("email"), "jdoe@novo.com");
}

#[tokio::test]
async fn concurrent_registrations_with_same_username_create_one_user() {
    let app = app_or_skip!();

    let first = json!({"username": "racer", "email": "racer1@novo.com", "password": "Secret@123"});
    let second = json!({"username": "racer", "email": "racer2@novo.com", "password": "Secret@123"});

    let (a, b) = tokio::join!(
        app.post("/auth/register", &first),
        app.post("/auth/register", &second)
    );

    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 409]);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = 'racer'")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// --- Protected resources ---

#[tokio::test]
async fn me_returns_the_caller_profile() {
    let app = app_or_skip!();
    let session = app.admin_session().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/me", app.address))
        .bearer_auth(session["token"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["firstName"], "System");
    assert!(body["data"]["createdDate"].is_string());
}

#[tokio::test]
async fn admin_manages_roles() {
    let app = app_or_skip!();
    let session = app.admin_session().await;
    let token = session["token"].as_str().unwrap();
    let client = reqwest::Client::new();

    let created = client
        .post(&format!("{}/api/roles", app.address))
        .bearer_auth(token)
        .json(&json!({"name": "Auditor", "description": "Read-only access"}))
        .send()
        .await
        .unwrap();
    assert_eq!(201, created.status().as_u16());
    let role: Value = created.json().await.unwrap();
    let id = role["data"]["id"].as_str().unwrap().to_string();

    let updated = client
        .put(&format!("{}/api/roles/{}", app.address, id))
        .bearer_auth(token)
        .json(&json!({"name": "Auditor", "description": "Audit trail access"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, updated.status().as_u16());
    let role: Value = updated.json().await.unwrap();
    assert_eq!(role["data"]["description"], "Audit trail access");

    let duplicate = client
        .post(&format!("{}/api/roles", app.address))
        .bearer_auth(token)
        .json(&json!({"name": "Admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(409, duplicate.status().as_u16());

    let list = client
        .get(&format!("{}/api/roles?pageNumber=1&pageSize=2", app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let page: Value = list.json().await.unwrap();
    assert_eq!(page["totalCount"], 3);
    assert_eq!(page["pageSize"], 2);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);

    let deleted = client
        .delete(&format!("{}/api/roles/{}", app.address, id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, deleted.status().as_u16());

    let missing = client
        .get(&format!("{}/api/roles/{}", app.address, id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(404, missing.status().as_u16());
}

#[tokio::test]
async fn non_admin_cannot_modify_users() {
    let app = app_or_skip!();
    app.post(
        "/auth/register",
        &json!({"username": "jdoe", "email": "jdoe@novo.com", "password": "Secret@123"}),
    )
    .await;
    let session: Value = app
        .login("jdoe@novo.com", "Secret@123")
        .await
        .json()
        .await
        .unwrap();
    let token = session["token"].as_str().unwrap();

    let admin_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(ADMIN_EMAIL)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .delete(&format!("{}/api/users/{}", app.address, admin_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    // Reads stay open to any authenticated caller
    let response = reqwest::Client::new()
        .get(&format!("{}/api/users/{}", app.address, admin_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn deleting_a_user_invalidates_their_refresh_tokens() {
    let app = app_or_skip!();
    let admin = app.admin_session().await;

    app.post(
        "/auth/register",
        &json!({"username": "jdoe", "email": "jdoe@novo.com", "password": "Secret@123"}),
    )
    .await;
    let session: Value = app
        .login("jdoe@novo.com", "Secret@123")
        .await
        .json()
        .await
        .unwrap();
    let user_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = 'jdoe@novo.com'")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    let deleted = reqwest::Client::new()
        .delete(&format!("{}/api/users/{}", app.address, user_id))
        .bearer_auth(admin["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(200, deleted.status().as_u16());

    let refresh = app
        .post("/auth/refresh", &json!({"refreshToken": session["refreshToken"]}))
        .await;
    assert_eq!(401, refresh.status().as_u16());
}
