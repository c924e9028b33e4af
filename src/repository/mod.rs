/// Typed PostgreSQL data access, one repository per entity

mod refresh_tokens;
mod roles;
mod users;

pub use refresh_tokens::PgRefreshTokenStore;
pub use roles::PgRoleRepository;
pub use users::{NewUser, PgUserRepository};
