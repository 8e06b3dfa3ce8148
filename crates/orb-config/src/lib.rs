//! Layered configuration: built-in defaults, then a TOML file, then a small
//! set of environment overrides for the oracle endpoint, model and key.

pub mod config;
pub mod error;

pub use config::{
    Config, DEFAULT_ENDPOINT, DEFAULT_MODEL, OracleConfig, RenderConfig, ServerConfig,
    default_config_path,
};
pub use error::{ConfigError, Result};
