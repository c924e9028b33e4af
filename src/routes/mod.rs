mod auth;
mod forms;
mod health_check;
mod roles;
mod users;

pub use auth::{get_current_user, login, refresh, register, revoke, PgAuthService};
pub use forms::{login_form, register_form};
pub use health_check::health_check;
pub use roles::{create_role, delete_role, get_role, list_roles, update_role};
pub use users::{create_user, delete_user, get_user, list_users, update_user};
