use actix_web::HttpResponse;

/// Liveness probe; does not touch the database
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().finish()
}
