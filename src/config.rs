use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{
    constants::{MAX_RECIPE_COUNT_PER_PAGE, RECIPE_COUNT_PER_PAGE},
    cryptography::generate_secret,
};

const DEFAULT_CONFIG_FILE: &str = "foodgram.toml";
const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub pagination: PaginationSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Public origin used when building short links.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub token_lifetime_hours: i64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PaginationSettings {
    pub page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

impl Settings {
    /// Defaults, then the TOML file, then `FOODGRAM__SECTION__KEY` variables.
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.base_url", "http://localhost:8000")?
            .set_default("database.url", "sqlite:foodgram.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.secret", "")?
            .set_default("auth.token_lifetime_hours", 24)?
            .set_default("pagination.page_size", RECIPE_COUNT_PER_PAGE)?
            .set_default("pagination.max_page_size", MAX_RECIPE_COUNT_PER_PAGE)?
            .set_default("log.level", "info")?;

        match config_path {
            Some(path) => builder = builder.add_source(File::with_name(&path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE))
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("FOODGRAM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Fills an empty session secret with a random one. Returns whether it did.
    pub fn ensure_secret(&mut self) -> bool {
        if !self.auth.secret.is_empty() {
            return false;
        }

        self.auth.secret = generate_secret(64);
        true
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be at least 1".to_string());
        }
        if self.pagination.page_size <= 0 {
            return Err("Page size must be at least 1".to_string());
        }
        if self.pagination.page_size > self.pagination.max_page_size {
            return Err("Page size cannot exceed max_page_size".to_string());
        }
        if self.auth.secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "Session secret must be at least {MIN_SECRET_LENGTH} bytes long"
            ));
        }
        if self.auth.token_lifetime_hours <= 0 {
            return Err("Token lifetime must be at least one hour".to_string());
        }
        Ok(())
    }
}
