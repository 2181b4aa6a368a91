use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_CT_MODEL_PATH: &str = "best_model.pt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY environment variable is not set")]
    MissingApiKey,
    #[error("Invalid PORT value '{0}'")]
    InvalidPort(String),
    #[error("Invalid GEMINI_TIMEOUT_SECS value '{0}'")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: Option<PathBuf>,
    pub gemini: GeminiConfig,
}

impl ServiceConfig {
    /// X-ray service settings. The API key is required up front.
    pub fn xray_from_env() -> Result<Self, ConfigError> {
        Self::xray_from_lookup(|key| env::var(key).ok())
    }

    /// CT service settings. A missing API key only surfaces when a report is requested.
    pub fn ctscan_from_env() -> Result<Self, ConfigError> {
        Self::ctscan_from_lookup(|key| env::var(key).ok())
    }

    pub fn xray_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::from_lookup(&lookup, "0.0.0.0", 4000)?;
        if config.gemini.api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            model_path: non_empty(lookup("XRAY_WEIGHTS_PATH")).map(PathBuf::from),
            ..config
        })
    }

    pub fn ctscan_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::from_lookup(&lookup, "127.0.0.1", 4001)?;
        let model_path = non_empty(lookup("CT_MODEL_PATH"))
            .unwrap_or_else(|| DEFAULT_CT_MODEL_PATH.to_string());
        Ok(Self {
            model_path: Some(PathBuf::from(model_path)),
            ..config
        })
    }

    fn from_lookup<F>(lookup: &F, default_host: &str, default_port: u16) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = non_empty(lookup("HOST")).unwrap_or_else(|| default_host.to_string());
        let port = match non_empty(lookup("PORT")) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => default_port,
        };
        let timeout = match non_empty(lookup("GEMINI_TIMEOUT_SECS")) {
            Some(raw) => Some(Duration::from_secs(
                raw.parse().map_err(|_| ConfigError::InvalidTimeout(raw))?,
            )),
            None => None,
        };

        Ok(Self {
            host,
            port,
            model_path: None,
            gemini: GeminiConfig {
                api_key: non_empty(lookup("GOOGLE_API_KEY")),
                model: non_empty(lookup("GEMINI_MODEL"))
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: non_empty(lookup("GEMINI_API_BASE"))
                    .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
                timeout,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
