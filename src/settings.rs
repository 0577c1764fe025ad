use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub listen: String,
    pub cors_origin: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            cors_origin: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Postgres {
    pub url: String,
    pub max_connections: u32,
}

impl Default for Postgres {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/numbet".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Auth {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub secure_cookie: bool,
    pub bcrypt_cost: u32,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: 7,
            secure_cookie: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Otp {
    pub ttl_minutes: i64,
}

impl Default for Otp {
    fn default() -> Self {
        Self { ttl_minutes: 10 }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    None,
    Memory,
    Redis,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub prefix: String,
    pub ttl_seconds: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            backend: CacheBackend::None,
            redis_url: None,
            prefix: "numbet:".to_string(),
            ttl_seconds: 60,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Mailer {
    pub webhook_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Wallet {
    pub currency: String,
    pub signup_bonus: Decimal,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            currency: "BDT".to_string(),
            signup_bonus: Decimal::ZERO,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub postgres: Postgres,
    pub auth: Auth,
    pub otp: Otp,
    pub cache: Cache,
    pub mailer: Mailer,
    pub wallet: Wallet,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("NUMBET").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        if settings.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must be set".to_string()));
        }

        Ok(settings)
    }
}
