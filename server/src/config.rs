//! Process configuration.
//!
//! Only the listen port comes from the environment (`PORT`, default 3000).
//! The snapshot lives in `todos.json` under the working directory.

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_FILE: &str = "todos.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_port_var(std::env::var("PORT").ok())
    }

    fn from_port_var(port: Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = port {
            let parsed = value.trim().parse::<u16>();
            config.port = parsed.map_err(|source| ConfigError::InvalidPort { value, source })?;
        }
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}
