// Configuration module entry point
// Loads configuration and holds the shared runtime state

mod state;
mod types;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use std::net::SocketAddr;
use tracing::level_filters::LevelFilter;

// Re-export public types
pub use state::AppState;
pub use types::{AppConfig, Config, LoggingConfig};

/// Prefix for environment overrides, e.g. `HELLO_ADD_SERVER__PORT=9000`
const ENV_PREFIX: &str = "HELLO_ADD";

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// A missing file is not an error; defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = apply_defaults(config::Config::builder())?
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from inline TOML on top of the defaults
    #[cfg(test)]
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings = apply_defaults(config::Config::builder())?
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.get_socket_addr().map_err(ConfigError::Message)?;

        self.logging
            .level
            .parse::<LevelFilter>()
            .map_err(|_| {
                ConfigError::Message(format!("Invalid log level: '{}'", self.logging.level))
            })?;

        if self.server.workers == Some(0) {
            return Err(ConfigError::Message(
                "server.workers must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn apply_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("app.name", env!("CARGO_PKG_NAME"))?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5000)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.request_timeout", 30)?
        .set_default("performance.shutdown_grace", 5)?
        .set_default(
            "http.server_name",
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
        )?
        .set_default("http.max_body_size", 10_485_760) // 10MB
}
