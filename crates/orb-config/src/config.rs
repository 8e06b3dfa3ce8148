use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use orb_core::constants::MAX_PIXEL_RATIO;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const ENV_CONFIG_DIR: &str = "ORB_CONFIG_DIR";
const ENV_ENDPOINT: &str = "ORB_ENDPOINT";
const ENV_MODEL: &str = "ORB_MODEL";
const ENV_API_KEY: &str = "ORB_API_KEY";

const REDACTED: &str = "********";

/// Default location: `$ORB_CONFIG_DIR/config.toml`, else `~/.orb/config.toml`.
pub fn default_config_path() -> PathBuf {
    env::var(ENV_CONFIG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".orb"))
        .join("config.toml")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Chat-completion endpoint and sampling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
            max_tokens: 600,
            temperature: 0.7,
            frequency_penalty: 0.2,
        }
    }
}

impl OracleConfig {
    /// The credential, or `MissingApiKey` when unset or blank.
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Headless render loop and drawing surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            width: 800,
            height: 800,
            pixel_ratio: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub oracle: OracleConfig,
    pub render: RenderConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Resolve the file (explicit path, else the default location), layer the
    /// process environment on top, and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, &default_config_path(), |key| env::var(key).ok())
    }

    /// `load` with the fallback path and environment supplied by the caller.
    /// An explicit path must exist; a missing fallback file means defaults.
    pub fn load_with(
        explicit: Option<&Path>,
        fallback: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::read(path)?,
            None if fallback.exists() => Self::read(fallback)?,
            None => {
                tracing::debug!(path = %fallback.display(), "no config file, using defaults");
                Self::default()
            }
        };
        config.apply_env(lookup);
        config.validate()?;
        config.render.pixel_ratio = config.render.pixel_ratio.min(MAX_PIXEL_RATIO);
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&content)
    }

    /// Override endpoint, model and key from the environment. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            tracing::debug!(%endpoint, "endpoint from {ENV_ENDPOINT}");
            self.oracle.endpoint = endpoint;
        }
        if let Some(model) = get(ENV_MODEL) {
            tracing::debug!(%model, "model from {ENV_MODEL}");
            self.oracle.model = model;
        }
        if let Some(key) = get(ENV_API_KEY) {
            tracing::debug!("api key from {ENV_API_KEY}");
            self.oracle.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let o = &self.oracle;
        if !(o.endpoint.starts_with("http://") || o.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "oracle.endpoint must be an http(s) URL, got {:?}",
                o.endpoint
            )));
        }
        if o.model.trim().is_empty() {
            return Err(ConfigError::Invalid("oracle.model is empty".into()));
        }
        if o.timeout_secs == 0 {
            return Err(ConfigError::Invalid("oracle.timeout_secs must be > 0".into()));
        }
        if o.max_tokens == 0 {
            return Err(ConfigError::Invalid("oracle.max_tokens must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&o.temperature) {
            return Err(ConfigError::Invalid(format!(
                "oracle.temperature must be in [0, 2], got {}",
                o.temperature
            )));
        }

        let r = &self.render;
        if !(1..=240).contains(&r.fps) {
            return Err(ConfigError::Invalid(format!(
                "render.fps must be in [1, 240], got {}",
                r.fps
            )));
        }
        if r.width == 0 || r.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render surface must be non-empty, got {}x{}",
                r.width, r.height
            )));
        }
        if !(r.pixel_ratio.is_finite() && r.pixel_ratio > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "render.pixel_ratio must be positive, got {}",
                r.pixel_ratio
            )));
        }

        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind is empty".into()));
        }
        Ok(())
    }

    /// Copy safe to print: the key, if any, is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.oracle.api_key.is_some() {
            copy.oracle.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    /// TOML rendering of the redacted config.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}
