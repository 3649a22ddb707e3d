use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Deployment environment. Controls the `Secure` flag of the refresh cookie.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    #[default]
    Production,
}

impl Environment {
    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Local)
    }
}

/// Which store implementation backs the application.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server-level connection, for creating databases.
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
///
/// Access and refresh tokens are signed with different secrets so that a
/// leaked access secret cannot be used to mint refresh tokens.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    /// seconds (e.g., 30)
    pub access_token_expiry: i64,
    /// seconds; absent means refresh tokens carry no `exp` and live until revoked
    #[serde(default)]
    pub refresh_token_expiry: Option<i64>,
    pub issuer: String,
}

impl JwtSettings {
    /// Reject settings the signer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.access_secret".to_string()));
        }
        if self.refresh_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.refresh_secret".to_string()));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if matches!(self.refresh_token_expiry, Some(ttl) if ttl <= 0) {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional) overlaid with
/// `APP_`-prefixed environment variables, e.g. `APP_JWT__ACCESS_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    settings.jwt.validate()?;
    Ok(settings)
}
