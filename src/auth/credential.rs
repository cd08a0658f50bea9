/// Credential extraction from the `Authorization` header
///
/// Two schemes are recognized: `Bearer <token>` for access and refresh
/// tokens, and `ApiKey <key>` for service-to-service calls.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    BearerToken(String),
    ApiKey(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::BearerToken(_) => write!(f, "BearerToken(<redacted>)"),
            Credential::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
        }
    }
}

/// Read the single `Authorization` header of a request.
///
/// # Errors
/// - `MissingCredential` if there is no `Authorization` header
/// - `MalformedCredential` if the header is repeated, not visible ASCII, uses
///   an unknown scheme, or has nothing after the scheme
pub fn extract_credential(headers: &HeaderMap) -> Result<Credential, AuthError> {
    let mut values = headers.get_all(AUTHORIZATION);
    let value = values.next().ok_or(AuthError::MissingCredential)?;
    if values.next().is_some() {
        return Err(AuthError::MalformedCredential);
    }

    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;
    parse_credential(value)
}

/// Parse a raw `Authorization` value.
pub fn parse_credential(value: &str) -> Result<Credential, AuthError> {
    if let Some(rest) = value.strip_prefix(BEARER_PREFIX) {
        Ok(Credential::BearerToken(scheme_value(rest)?))
    } else if let Some(rest) = value.strip_prefix(API_KEY_PREFIX) {
        Ok(Credential::ApiKey(scheme_value(rest)?))
    } else {
        Err(AuthError::MalformedCredential)
    }
}

fn scheme_value(rest: &str) -> Result<String, AuthError> {
    let value = rest.trim();
    if value.is_empty() || value.contains(char::is_whitespace) {
        return Err(AuthError::MalformedCredential);
    }
    Ok(value.to_string())
}

/// Shortcut for routes that only accept a bearer token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    match extract_credential(headers)? {
        Credential::BearerToken(token) => Ok(token),
        Credential::ApiKey(_) => Err(AuthError::Unauthorized),
    }
}
