/// JWT Token Generation and Validation
///
/// `TokenIssuer` owns the signing keys and lifetimes read from `JwtSettings`.
/// It mints HS256 access tokens, opaque refresh-token values, and validates
/// presented access tokens (signature, issuer, audience, expiry, no leeway).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::auth::refresh_token::generate_refresh_token;
use crate::auth::service::AuthUser;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

/// A signed access token and the instant it stops being accepted
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenIssuer {
    /// Build the issuer from configuration
    ///
    /// # Errors
    /// A missing or blank secret and non-positive lifetimes are startup errors.
    pub fn from_settings(config: &JwtSettings) -> Result<Self, ConfigError> {
        let secret = config
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("jwt.secret".to_string()))?;

        if config.access_token_expiry_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry_minutes must be positive".to_string(),
            ));
        }
        if config.refresh_token_expiry_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry_days must be positive".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl: Duration::minutes(config.access_token_expiry_minutes),
            refresh_token_ttl: Duration::days(config.refresh_token_expiry_days),
        })
    }

    /// Sign an access token for `user`, one role claim entry per assigned role
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn issue_access_token(&self, user: &AuthUser) -> Result<AccessToken, AppError> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AccessToken { value, expires_at })
    }

    /// Opaque refresh-token value; carries no claims
    pub fn issue_refresh_token(&self) -> String {
        generate_refresh_token()
    }

    pub fn access_token_expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.access_token_ttl
    }

    pub fn refresh_token_expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.refresh_token_ttl
    }

    /// Validate and extract claims from an access token
    ///
    /// # Errors
    /// `InvalidAccessToken` if the token is malformed, tampered with,
    /// expired, or minted for another issuer or audience
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT validation error: {}", e);
                AuthError::InvalidAccessToken
            })
    }
}
