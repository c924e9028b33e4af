use actix_web::HttpResponse;

use crate::error::{ApiError, AppError, Resource};
use crate::localization::Locale;
use crate::response::ApiResponse;

fn form_response(name: &str, locale: &Locale) -> Result<HttpResponse, ApiError> {
    let form = locale
        .form(name)
        .cloned()
        .ok_or_else(|| locale.fail(AppError::NotFound(Resource::Form)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locale.message("forms_loaded"), form)))
}

/// GET /api/forms/login-form
pub async fn login_form(locale: Locale) -> Result<HttpResponse, ApiError> {
    form_response("login", &locale)
}

/// GET /api/forms/register-form
pub async fn register_form(locale: Locale) -> Result<HttpResponse, ApiError> {
    form_response("register", &locale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::Localization;
    use actix_web::{http::StatusCode, test, web, App};

    #[actix_web::test]
    async fn test_register_form_is_localized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Localization::load().unwrap()))
                .route("/forms/register-form", web::get().to(register_form)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/forms/register-form")
            .insert_header(("X-Culture", "hi"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["title"], "पंजीकरण करें");
        assert_eq!(body["data"]["fields"][0]["name"], "username");
        assert_eq!(body["data"]["fields"][0]["type"], "text");
    }

    #[actix_web::test]
    async fn test_unknown_form_is_not_found() {
        let catalog = web::Data::new(Localization::load().unwrap());
        let locale = Locale::new("en", catalog);

        let err = form_response("checkout", &locale).unwrap_err();
        assert_eq!(err.error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Form not found");
    }
}
