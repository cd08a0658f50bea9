mod auth;
mod health_check;
mod users;
mod webhooks;

pub use auth::{login, refresh, revoke, LoginRequest, LoginResponse, RefreshResponse};
pub use health_check::health_check;
pub use users::{create_user, current_user, revoke_sessions, update_user, CredentialsRequest, UserResponse};
pub use webhooks::{payment_webhook, WebhookData, WebhookEvent, USER_UPGRADED};
