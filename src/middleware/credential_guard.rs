/// Credential Guard Middleware
///
/// Checks the Authorization header of every request entering a scope against
/// a `GuardPolicy`. Access-token scopes get the authenticated user injected
/// into request extensions for `AuthenticatedUser` to pick up.

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{extract_bearer_token, extract_credential, AccessTokenCodec, Credential, SessionManager};
use crate::error::{AppError, AuthError};

/// What a guarded scope requires
#[derive(Clone)]
pub enum GuardPolicy {
    /// A valid access token in `Bearer` form
    AccessToken(AccessTokenCodec),
    /// The shared webhook key in `ApiKey` form
    ApiKey(Arc<str>),
}

/// User proven by a validated access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

pub fn authorize_access_token(
    headers: &HeaderMap,
    codec: &AccessTokenCodec,
) -> Result<AuthenticatedUser, AuthError> {
    let token = extract_bearer_token(headers)?;
    let user_id = codec.validate(&token)?;
    Ok(AuthenticatedUser { user_id })
}

/// Accepts only an `ApiKey` credential equal to `expected`.
pub fn authorize_api_key(headers: &HeaderMap, expected: &str) -> Result<(), AuthError> {
    match extract_credential(headers)? {
        Credential::ApiKey(key) if keys_match(key.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(AuthError::Unauthorized),
    }
}

/// Comparison time depends only on the lengths.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

pub struct CredentialGuard {
    policy: GuardPolicy,
}

impl CredentialGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CredentialGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CredentialGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CredentialGuardService {
            service: Rc::new(service),
            policy: self.policy.clone(),
        }))
    }
}

pub struct CredentialGuardService<S> {
    service: Rc<S>,
    policy: GuardPolicy,
}

impl<S, B> Service<ServiceRequest> for CredentialGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = match &self.policy {
            GuardPolicy::AccessToken(codec) => {
                authorize_access_token(req.headers(), codec).map(|user| {
                    tracing::debug!(user_id = %user.user_id, "Access token accepted");
                    req.extensions_mut().insert(user);
                })
            }
            GuardPolicy::ApiKey(expected) => authorize_api_key(req.headers(), expected),
        };

        match outcome {
            Ok(()) => {
                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), error = %e, "Request rejected by credential guard");
                Box::pin(async move { Err(AppError::from(e).into()) })
            }
        }
    }
}

/// Handlers outside a guarded scope validate the header themselves through
/// the codec held by the shared `SessionManager`.
impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            return ready(Ok(*user));
        }

        let result = match req.app_data::<web::Data<SessionManager>>() {
            Some(session) => authorize_access_token(req.headers(), session.codec()).map_err(|e| {
                tracing::warn!(path = %req.path(), error = %e, "Access token rejected");
                AppError::from(e)
            }),
            None => Err(AppError::Internal("session manager not registered".to_string())),
        };

        ready(result)
    }
}
