/// User Routes
///
/// Account creation, credential changes and the "who am I" endpoints.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionManager;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::store::User;
use crate::validators::{is_valid_email, is_valid_password};

/// Email and password, used for both sign-up and credential changes
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_premium: user.is_premium,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email, empty or over-long password
/// - 409: Email already registered
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = session.register(&email, &form.password).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// PUT /api/users
///
/// Replace email and password of the caller. Requires
/// `Authorization: Bearer <access_token>`.
///
/// # Errors
/// - 400: Missing/malformed header or invalid input
/// - 401: Invalid or expired access token
/// - 404: The token's user no longer exists
/// - 409: Email belongs to another user
pub async fn update_user(
    caller: AuthenticatedUser,
    form: web::Json<CredentialsRequest>,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = session
        .change_credentials(caller.user_id, &email, &form.password)
        .await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// GET /api/me
pub async fn current_user(
    caller: AuthenticatedUser,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let user = session.user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// DELETE /api/me/sessions
///
/// Revoke every refresh token of the caller. Access tokens already handed
/// out stay valid until they expire.
pub async fn revoke_sessions(
    caller: AuthenticatedUser,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    session.revoke_all(caller.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
