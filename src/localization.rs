/// Localization
///
/// Message and form catalogs for the supported cultures (`en`, `hi`, `mr`).
/// Both are embedded at compile time and parsed once at startup into an
/// immutable `Localization` shared through `web::Data`.
///
/// Lookup rules:
/// - culture and key are lower-cased
/// - an unknown culture falls back to `en`
/// - an unknown message key returns the key itself

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::{ready, Ready};

use crate::error::{ApiError, AppError, ConfigError};

pub const DEFAULT_CULTURE: &str = "en";
pub const CULTURE_HEADER: &str = "X-Culture";

const MESSAGES: &str = include_str!("../resources/localization/messages.json");
const FORMS: &str = include_str!("../resources/localization/forms.json");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Field layout a client renders for a login or registration screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormStructure {
    pub title: String,
    pub fields: Vec<FormField>,
}

type Catalog<T> = HashMap<String, HashMap<String, T>>;

#[derive(Debug)]
pub struct Localization {
    messages: Catalog<String>,
    forms: Catalog<FormStructure>,
}

impl Localization {
    /// Parse the embedded catalogs
    ///
    /// # Errors
    /// A malformed catalog or one without the default culture is a startup error
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_json(MESSAGES, FORMS)
    }

    fn from_json(messages: &str, forms: &str) -> Result<Self, ConfigError> {
        let messages: Catalog<String> = serde_json::from_str(messages)
            .map_err(|e| ConfigError::InvalidValue(format!("message catalog: {}", e)))?;
        let forms: Catalog<FormStructure> = serde_json::from_str(forms)
            .map_err(|e| ConfigError::InvalidValue(format!("form catalog: {}", e)))?;

        if !messages.contains_key(DEFAULT_CULTURE) || !forms.contains_key(DEFAULT_CULTURE) {
            return Err(ConfigError::MissingRequired(format!(
                "localization culture '{}'",
                DEFAULT_CULTURE
            )));
        }

        Ok(Self { messages, forms })
    }

    pub fn cultures(&self) -> Vec<&str> {
        let mut cultures: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        cultures.sort_unstable();
        cultures
    }

    pub fn message(&self, key: &str, culture: &str) -> String {
        let key = key.to_lowercase();
        self.catalog_for(&self.messages, culture)
            .and_then(|catalog| catalog.get(&key))
            .cloned()
            .unwrap_or(key)
    }

    /// Form structure by name; falls back to the `en` form when the
    /// culture lacks it
    pub fn form(&self, name: &str, culture: &str) -> Option<&FormStructure> {
        let name = name.to_lowercase();
        self.catalog_for(&self.forms, culture)
            .and_then(|catalog| catalog.get(&name))
            .or_else(|| {
                self.forms
                    .get(DEFAULT_CULTURE)
                    .and_then(|catalog| catalog.get(&name))
            })
    }

    fn catalog_for<'a, T>(
        &self,
        catalog: &'a Catalog<T>,
        culture: &str,
    ) -> Option<&'a HashMap<String, T>> {
        catalog
            .get(&culture.to_lowercase())
            .or_else(|| catalog.get(DEFAULT_CULTURE))
    }
}

#[derive(Deserialize)]
struct CultureQuery {
    culture: Option<String>,
}

/// `?culture=` first, then the `X-Culture` header, then `en`
pub fn resolve_culture(req: &HttpRequest) -> String {
    let from_query = web::Query::<CultureQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().culture);
    let from_header = || {
        req.headers()
            .get(CULTURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    };

    from_query
        .filter(|c| !c.trim().is_empty())
        .or_else(|| from_header().filter(|c| !c.trim().is_empty()))
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_else(|| DEFAULT_CULTURE.to_string())
}

/// Translate `error` for the culture of `req`
///
/// Used where no `Locale` extractor is available: middleware and the
/// body/query/path deserialization error handlers.
pub fn localized_error(req: &HttpRequest, error: AppError) -> ApiError {
    match req.app_data::<web::Data<Localization>>() {
        Some(catalog) => {
            let message = catalog.message(error.message_key(), &resolve_culture(req));
            ApiError::new(error, message)
        }
        None => ApiError::from(error),
    }
}

/// The caller's culture together with the shared catalogs
///
/// Handlers take this as an extractor and use it to translate both
/// success messages and errors.
pub struct Locale {
    pub culture: String,
    catalog: web::Data<Localization>,
}

impl Locale {
    pub fn new(culture: impl Into<String>, catalog: web::Data<Localization>) -> Self {
        Self {
            culture: culture.into(),
            catalog,
        }
    }

    pub fn message(&self, key: &str) -> String {
        self.catalog.message(key, &self.culture)
    }

    pub fn form(&self, name: &str) -> Option<&FormStructure> {
        self.catalog.form(name, &self.culture)
    }

    /// Attach the translated message to an error
    pub fn fail(&self, error: impl Into<AppError>) -> ApiError {
        let error = error.into();
        let message = self.message(error.message_key());
        ApiError::new(error, message)
    }
}

impl FromRequest for Locale {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<Localization>>() {
            Some(catalog) => Ok(Locale::new(resolve_culture(req), catalog.clone())),
            None => Err(ApiError::from(AppError::Internal(
                "Localization catalog is not registered".to_string(),
            ))),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn catalog() -> Localization {
        Localization::load().expect("embedded catalogs must parse")
    }

    #[test]
    fn test_all_cultures_share_the_same_keys() {
        let catalog = catalog();
        let en = &catalog.messages["en"];

        assert_eq!(catalog.cultures(), vec!["en", "hi", "mr"]);
        for culture in ["hi", "mr"] {
            let other = &catalog.messages[culture];
            assert_eq!(en.len(), other.len(), "{} is missing keys", culture);
            assert!(en.keys().all(|k| other.contains_key(k)));
        }
    }

    #[test]
    fn test_message_lookup() {
        let catalog = catalog();

        assert_eq!(catalog.message("login_success", "en"), "Login successful");
        assert_eq!(catalog.message("LOGIN_SUCCESS", "EN"), "Login successful");
        assert_eq!(catalog.message("login_success", "hi"), "लॉगिन सफल");
        assert_eq!(catalog.message("login_success", "mr"), "लॉगिन यशस्वी");
    }

    #[test]
    fn test_unknown_culture_falls_back_to_english() {
        assert_eq!(catalog().message("user_not_found", "fr"), "User not found");
    }

    #[test]
    fn test_unknown_key_returns_key() {
        assert_eq!(catalog().message("no_such_key", "hi"), "no_such_key");
    }

    #[test]
    fn test_every_error_key_is_translated() {
        use crate::error::{AuthError, Resource};

        let catalog = catalog();
        let errors = [
            AppError::Validation(vec![]),
            AppError::InvalidRequest(String::new()),
            AppError::Auth(AuthError::AuthenticationFailed),
            AppError::Auth(AuthError::InvalidToken),
            AppError::Auth(AuthError::MissingToken),
            AppError::Auth(AuthError::Forbidden),
            AppError::NotFound(Resource::User),
            AppError::NotFound(Resource::Role),
            AppError::NotFound(Resource::Form),
            AppError::Conflict(String::new()),
            AppError::Unavailable(String::new()),
            AppError::Internal(String::new()),
        ];

        for culture in ["en", "hi", "mr"] {
            for error in &errors {
                let key = error.message_key();
                assert_ne!(catalog.message(key, culture), key, "{}/{}", culture, key);
            }
        }
    }

    #[test]
    fn test_forms() {
        let catalog = catalog();

        let login = catalog.form("login", "en").unwrap();
        assert_eq!(login.title, "Login");
        assert_eq!(
            login.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            vec!["email", "password"]
        );

        let register = catalog.form("register", "mr").unwrap();
        assert_eq!(register.title, "नोंदणी करा");
        assert_eq!(register.fields.len(), 5);
        assert!(!register.fields[3].required);

        assert_eq!(catalog.form("login", "de").unwrap().title, "Login");
        assert!(catalog.form("checkout", "en").is_none());
    }

    #[test]
    fn test_catalog_without_default_culture_is_rejected() {
        let result = Localization::from_json(r#"{"hi": {}}"#, r#"{"en": {}}"#);
        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_culture_resolution_order() {
        let req = TestRequest::with_uri("/auth/login?culture=HI")
            .insert_header((CULTURE_HEADER, "mr"))
            .to_http_request();
        assert_eq!(resolve_culture(&req), "hi");

        let req = TestRequest::with_uri("/auth/login")
            .insert_header((CULTURE_HEADER, "mr"))
            .to_http_request();
        assert_eq!(resolve_culture(&req), "mr");

        let req = TestRequest::with_uri("/auth/login?culture=").to_http_request();
        assert_eq!(resolve_culture(&req), "en");
    }

    #[actix_web::test]
    async fn test_locale_extractor_translates_errors() {
        let req = TestRequest::with_uri("/api/users?culture=hi")
            .app_data(web::Data::new(catalog()))
            .to_http_request();

        let locale = Locale::extract(&req).await.unwrap();
        let error = locale.fail(AppError::NotFound(crate::error::Resource::User));

        assert_eq!(locale.culture, "hi");
        assert_eq!(error.message, "उपयोगकर्ता नहीं मिला");
    }
}
