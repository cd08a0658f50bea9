/// Authentication module
///
/// Password hashing, access token minting/validation, refresh token
/// lifecycle, credential extraction and the session manager tying them
/// together.

mod claims;
mod credential;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::Claims;
pub use credential::{extract_bearer_token, extract_credential, parse_credential, Credential};
pub use jwt::AccessTokenCodec;
pub use password::{PasswordHasher, MAX_BCRYPT_COST, MAX_PASSWORD_BYTES, MIN_BCRYPT_COST};
pub use refresh_token::digest_token;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::{RefreshTokenRecord, RefreshTokenState};
pub use session::{AccountError, IssuedSession, SessionManager};
