use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionManager;
use crate::error::{AppError, ValidationError};

pub const USER_UPGRADED: &str = "user.upgraded";

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookData {
    pub user_id: Uuid,
}

/// POST /api/polka/webhooks
///
/// Sits behind the `ApiKey` guard. Events other than `user.upgraded` are
/// acknowledged and ignored.
///
/// # Errors
/// - 400: `user.upgraded` without `data.user_id`
/// - 404: Unknown user
pub async fn payment_webhook(
    payload: web::Json<WebhookEvent>,
    session: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    if payload.event != USER_UPGRADED {
        tracing::debug!(event = %payload.event, "Ignoring webhook event");
        return Ok(HttpResponse::NoContent().finish());
    }

    let data = payload
        .data
        .as_ref()
        .ok_or(ValidationError::EmptyField("data.user_id"))?;
    session.set_premium(data.user_id, true).await?;

    Ok(HttpResponse::NoContent().finish())
}
