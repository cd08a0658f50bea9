use actix_files as fs;
use actix_web::dev::Server;
use actix_web::error::JsonPayloadError;
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::{CredentialGuard, GuardPolicy};
use crate::routes::{
    create_user, current_user, health_check, login, payment_webhook, refresh, revoke,
    revoke_sessions, update_user,
};

/// Bad JSON bodies answer 400 with the usual error envelope.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected request body");
    AppError::from(ValidationError::InvalidFormat("request body")).into()
}

pub fn run(
    listener: TcpListener,
    session: SessionManager,
    api_key: String,
) -> Result<Server, std::io::Error> {
    let codec = session.codec().clone();
    let session = web::Data::new(session);
    let api_key: Arc<str> = api_key.into();

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(session.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            // Public routes; refresh/revoke read the refresh token themselves
            .route("/api/healthz", web::get().to(health_check))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))

            // PUT authenticates through the `AuthenticatedUser` extractor
            .service(
                web::resource("/api/users")
                    .route(web::post().to(create_user))
                    .route(web::put().to(update_user)),
            )

            // Protected routes (require an access token)
            .service(
                web::scope("/api/me")
                    .wrap(CredentialGuard::new(GuardPolicy::AccessToken(codec.clone())))
                    .route("", web::get().to(current_user))
                    .route("/sessions", web::delete().to(revoke_sessions)),
            )

            // Payment provider callbacks (require the API key)
            .service(
                web::scope("/api/polka")
                    .wrap(CredentialGuard::new(GuardPolicy::ApiKey(api_key.clone())))
                    .route("/webhooks", web::post().to(payment_webhook)),
            )

            .service(fs::Files::new("/app", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
