/// Authentication Routes
///
/// Login, access token refresh and refresh token revocation. Refresh and
/// revoke take the refresh token from `Authorization: Bearer <token>`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_bearer_token, SessionManager};
use crate::error::AppError;
use crate::routes::UserResponse;

const TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// POST /api/login
///
/// # Errors
/// - 400: Invalid credentials; an unknown email and a wrong password get the
///   same body
/// - 500: Hashing or store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let issued = session.login(form.email.trim(), &form.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(&issued.user),
        token: issued.access_token,
        refresh_token: issued.refresh_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: session.access_token_ttl().num_seconds(),
    }))
}

/// POST /api/refresh
///
/// # Errors
/// - 400: Missing or malformed `Authorization` header
/// - 401: Refresh token revoked or expired
/// - 404: Refresh token unknown
pub async fn refresh(
    req: HttpRequest,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_bearer_token(req.headers())?;
    let token = session.refresh(&refresh_token).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: session.access_token_ttl().num_seconds(),
    }))
}

/// POST /api/revoke
///
/// Revoking an already revoked token answers 204 as well.
pub async fn revoke(
    req: HttpRequest,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_bearer_token(req.headers())?;
    session.revoke(&refresh_token).await?;

    Ok(HttpResponse::NoContent().finish())
}
