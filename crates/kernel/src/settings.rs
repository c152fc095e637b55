use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use vidly_db::DbConfig;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "VIDLY_ENV";
const CONFIG_DIR_ENV: &str = "VIDLY_CONFIG_DIR";
const ENV_PREFIX: &str = "VIDLY";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// `VIDLY__*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let cfg = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = environment.parse()?;

        Ok(settings)
    }

    /// Fail fast on settings the service cannot run without.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_private_key.trim().is_empty() {
            return Err(anyhow!(
                "auth.jwt_private_key is not defined; set VIDLY__AUTH__JWT_PRIVATE_KEY"
            ));
        }
        if self.database.operation_timeout_ms == 0 {
            return Err(anyhow!("database.operation_timeout_ms must be positive"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://vidly.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_operation_timeout_ms() -> u64 {
        5000
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .operation_timeout(self.operation_timeout())
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            operation_timeout_ms: Self::default_operation_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_private_key: String,
    #[serde(default = "AuthSettings::default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

impl AuthSettings {
    fn default_token_ttl_secs() -> i64 {
        60 * 60 * 24
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_private_key: String::new(),
            token_ttl_secs: Self::default_token_ttl_secs(),
        }
    }
}
