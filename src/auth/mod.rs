/// Authentication module
///
/// Password hashing, JWT issuing/validation, refresh token management,
/// and the orchestrator that composes them into login, refresh and revoke.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use jwt::{AccessToken, TokenIssuer};
pub use password::{hash_password, spawn_hash_password, spawn_verify_password, verify_password};
pub use refresh_token::{
    generate_refresh_token, hash_token, RefreshTokenRecord, RefreshTokenStore, TokenState,
};
pub use service::{AuthResult, AuthService, AuthUser, UserDirectory};
