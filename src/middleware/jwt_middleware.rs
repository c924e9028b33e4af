/// JWT Authentication Middleware
///
/// Validates the bearer token from the Authorization header and injects the
/// claims into request extensions for handlers (`web::ReqData<Claims>`).
/// Rejections are rendered as localized 401 responses.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::error::{AppError, AuthError};
use crate::localization::localized_error;

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    issuer: Arc<TokenIssuer>,
}

impl JwtMiddleware {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            issuer: self.issuer.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    issuer: Arc<TokenIssuer>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn reject(req: &ServiceRequest, error: AuthError) -> Error {
    localized_error(req.request(), AppError::Auth(error)).into()
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(token) = bearer_token(&req) else {
            tracing::warn!(path = %req.path(), "Missing or invalid Authorization header");
            let error = reject(&req, AuthError::MissingToken);
            return Box::pin(async move { Err(error) });
        };

        match self.issuer.validate_access_token(&token) {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.sub, "JWT validated successfully");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let error = reject(&req, e);
                Box::pin(async move { Err(error) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthUser, Claims};
    use crate::configuration::JwtSettings;
    use crate::localization::Localization;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use uuid::Uuid;

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(
            TokenIssuer::from_settings(&JwtSettings {
                secret: Some("test-secret-key-at-least-32-characters-long".to_string()),
                issuer: "test".to_string(),
                audience: "test-clients".to_string(),
                access_token_expiry_minutes: 15,
                refresh_token_expiry_days: 7,
            })
            .unwrap(),
        )
    }

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.username.clone())
    }

    async fn status_of(issuer: Arc<TokenIssuer>, req: test::TestRequest) -> (StatusCode, String) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Localization::load().unwrap()))
                .service(
                    web::scope("/api")
                        .wrap(JwtMiddleware::new(issuer))
                        .route("/whoami", web::get().to(whoami)),
                ),
        )
        .await;

        match test::try_call_service(&app, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = test::read_body(res).await;
                (status, String::from_utf8_lossy(&body).to_string())
            }
            Err(err) => {
                let res = err.error_response();
                let status = res.status();
                let body = actix_web::body::to_bytes(res.into_body())
                    .await
                    .unwrap_or_default();
                (status, String::from_utf8_lossy(&body).to_string())
            }
        }
    }

    #[actix_web::test]
    async fn test_valid_token_passes_claims_through() {
        let issuer = issuer();
        let token = issuer
            .issue_access_token(&AuthUser {
                id: Uuid::new_v4(),
                username: "admin".to_string(),
                email: "admin@novo.com".to_string(),
                password_hash: String::new(),
                roles: vec!["Admin".to_string()],
            })
            .unwrap();

        let (status, body) = status_of(
            issuer,
            test::TestRequest::get()
                .uri("/api/whoami")
                .insert_header(("Authorization", format!("Bearer {}", token.value))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[actix_web::test]
    async fn test_missing_header_is_unauthorized() {
        let (status, body) =
            status_of(issuer(), test::TestRequest::get().uri("/api/whoami")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHORIZED"));
    }

    #[actix_web::test]
    async fn test_garbage_token_is_unauthorized_and_localized() {
        let (status, body) = status_of(
            issuer(),
            test::TestRequest::get()
                .uri("/api/whoami?culture=hi")
                .insert_header(("Authorization", "Bearer not.a.jwt")),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("प्रमाणीकरण आवश्यक है"));
    }
}
