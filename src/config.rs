use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// City treated as the delivery hub: destinations inside it get the
/// same-day/next-day estimate.
const DEFAULT_LOCAL_HUB_CITY: &str = "Quezon City";

/// Application configuration, layered from `config/default.toml` (if
/// present) and `APP_`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Create missing tables on startup (development/SQLite).
    #[serde(default)]
    pub bootstrap_schema: bool,

    #[serde(default = "default_local_hub_city")]
    pub local_hub_city: String,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_local_hub_city() -> String {
    DEFAULT_LOCAL_HUB_CITY.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            bootstrap_schema: false,
            local_hub_city: default_local_hub_city(),
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads configuration: optional `config/default` file, then
/// environment variables with the `APP_` prefix on top.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("APP"))
        .build()?
        .try_deserialize()
}

/// Initializes the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
