/// Access token minting and validation
///
/// Compact HS256 tokens carrying `{iss, sub, iat, exp}`. Validation needs only
/// the shared secret, never a store lookup, so an access token cannot be
/// revoked before it expires; keep the TTL short.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::AuthSettings;
use crate::error::AuthError;

/// Mints and validates access tokens with one symmetric key.
///
/// `leeway_seconds` extends the expiry check for clock skew between
/// processes sharing the secret; it defaults to zero.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    leeway_seconds: u64,
}

impl AccessTokenCodec {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            leeway_seconds: 0,
        }
    }

    pub fn with_leeway(mut self, leeway_seconds: u64) -> Self {
        self.leeway_seconds = leeway_seconds;
        self
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(&settings.jwt_secret, settings.issuer.clone()).with_leeway(settings.leeway_seconds)
    }

    /// Mint a token for `user_id` that expires `ttl` from now.
    ///
    /// # Errors
    /// `HashFailure` (the credential-primitive bucket) if the MAC cannot be computed
    pub fn mint(&self, user_id: Uuid, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims::new(user_id, &self.issuer, ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::HashFailure(format!("token signing failed: {}", e)))
    }

    /// Validate a token and return its subject.
    ///
    /// # Errors
    /// - `MalformedCredential` if the token cannot be parsed or lacks claims
    /// - `InvalidSignature` if the MAC does not verify under this secret, the
    ///   algorithm is not HS256, or the issuer is foreign
    /// - `Expired` if `exp <= now` (minus leeway)
    pub fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        self.decode_claims(token)?.user_id()
    }

    /// Verify signature and expiry, returning the full claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // exp is checked below: the library treats exp == now as still valid
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {}", e);
                match e.kind() {
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAlgorithm
                    | ErrorKind::InvalidIssuer => AuthError::InvalidSignature,
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::MalformedCredential,
                }
            })?;

        if claims.is_expired_at(Utc::now().timestamp(), self.leeway_seconds) {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}
