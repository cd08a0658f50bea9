use config::ConfigError;

use crate::auth::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 3600;
const MAX_REFRESH_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 3600;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Credential and session-token settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,   // 1 hour
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_seconds: i64,  // 60 days
    #[serde(default)]
    pub leeway_seconds: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Shared secret for service-to-service calls (`Authorization: ApiKey <key>`)
    pub api_key: String,
}

impl AuthSettings {
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_issuer() -> String {
    "yapper".to_string()
}

fn default_access_token_ttl() -> i64 {
    3600
}

fn default_refresh_token_ttl() -> i64 {
    60 * 24 * 3600
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_store_timeout_ms() -> u64 {
    2000
}

impl Settings {
    /// Reject configurations the credential core cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;

        if auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must be set".into()));
        }
        if auth.api_key.trim().is_empty() {
            return Err(ConfigError::Message("auth.api_key must be set".into()));
        }
        if auth.access_token_ttl_seconds <= 0 || auth.refresh_token_ttl_seconds <= 0 {
            return Err(ConfigError::Message("token lifetimes must be positive".into()));
        }
        if auth.access_token_ttl_seconds > MAX_ACCESS_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Message(format!(
                "auth.access_token_ttl_seconds must not exceed {}",
                MAX_ACCESS_TOKEN_TTL_SECONDS
            )));
        }
        if auth.refresh_token_ttl_seconds > MAX_REFRESH_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Message(format!(
                "auth.refresh_token_ttl_seconds must not exceed {}",
                MAX_REFRESH_TOKEN_TTL_SECONDS
            )));
        }
        if auth.refresh_token_ttl_seconds <= auth.access_token_ttl_seconds {
            return Err(ConfigError::Message(
                "refresh tokens must outlive access tokens".into(),
            ));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&auth.bcrypt_cost) {
            return Err(ConfigError::Message(format!(
                "auth.bcrypt_cost must be within {}..={}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }
        if auth.store_timeout_ms == 0 {
            return Err(ConfigError::Message("auth.store_timeout_ms must be positive".into()));
        }

        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional) and `APP_*` environment
/// variables, e.g. `APP_AUTH__JWT_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
