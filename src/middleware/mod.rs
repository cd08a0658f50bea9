/// Middleware module
///
/// Request-level credential checks for protected scopes and handlers.

mod credential_guard;

pub use credential_guard::{
    authorize_access_token, authorize_api_key, AuthenticatedUser, CredentialGuard, GuardPolicy,
};
