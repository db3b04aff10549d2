//! Runtime configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `DOCSMITH_BIND` | `127.0.0.1` |
//! | `DOCSMITH_PORT` | `8000` |
//! | `DOCSMITH_BACKEND_TIMEOUT_SECS` | `60` |
//! | `DOCSMITH_AI_PROVIDER` | `deepseek` (`openai`, `qwen-vl`, `custom`) |
//! | `DOCSMITH_AI_BASE_URL` | provider default, required for `custom` |
//! | `DOCSMITH_AI_MODEL` | provider default |
//! | `DOCSMITH_AI_API_KEY` | none |
//! | `DOCSMITH_AI_MULTIMODAL` | `true` for `qwen-vl`, `false` otherwise |
//! | `DOCSMITH_DOCS_URL` | `https://open.feishu.cn/open-apis` |
//! | `DOCSMITH_DOCS_TOKEN` | none |
//!
//! API key and CORS settings are read by [`SecurityConfig`].

use std::time::Duration;

use thiserror::Error;

use crate::api::SecurityConfig;

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_DOCS_URL: &str = "https://open.feishu.cn/open-apis";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be true or false, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },

    #[error("Unknown AI provider: {0} (expected deepseek, openai, qwen-vl or custom)")]
    UnknownProvider(String),

    #[error("DOCSMITH_AI_BASE_URL is required for the custom provider")]
    MissingBaseUrl,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Upper bound for every generation or document call made by the workspace.
    pub backend_timeout: Duration,
    pub generator: GeneratorConfig,
    pub documents: DocumentsConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    DeepSeek,
    OpenAi,
    QwenVl,
    Custom,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "openai" => Ok(Self::OpenAi),
            "qwen-vl" | "qwen_vl" | "qwen" => Ok(Self::QwenVl),
            "custom" => Ok(Self::Custom),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::DeepSeek => Some("https://api.deepseek.com"),
            Self::OpenAi => Some("https://api.openai.com"),
            Self::QwenVl => Some("https://dashscope.aliyuncs.com/compatible-mode"),
            Self::Custom => None,
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek-chat",
            Self::QwenVl => "qwen-vl-plus",
            Self::OpenAi | Self::Custom => "gpt-4o-mini",
        }
    }

    /// Whether the preset model accepts images.
    pub fn multimodal(&self) -> bool {
        matches!(self, Self::QwenVl)
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value }),
    }
}

/// Chat-completions endpoint settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Send resolved images with every request.
    pub multimodal: bool,
}

#[derive(Debug, Clone)]
pub struct DocumentsConfig {
    pub base_url: String,
    pub access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.security = SecurityConfig::from_env();
        Ok(config)
    }

    /// Build a config from an arbitrary variable source. Security settings
    /// start disabled.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("DOCSMITH_PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: "DOCSMITH_PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match var("DOCSMITH_BACKEND_TIMEOUT_SECS") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: "DOCSMITH_BACKEND_TIMEOUT_SECS",
                value: v,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let provider = match var("DOCSMITH_AI_PROVIDER") {
            Some(v) => Provider::parse(&v)?,
            None => Provider::DeepSeek,
        };
        let base_url = match var("DOCSMITH_AI_BASE_URL") {
            Some(url) => url,
            None => provider
                .default_base_url()
                .ok_or(ConfigError::MissingBaseUrl)?
                .to_string(),
        };
        let multimodal = match var("DOCSMITH_AI_MULTIMODAL") {
            Some(v) => parse_flag("DOCSMITH_AI_MULTIMODAL", v)?,
            None => provider.multimodal(),
        };

        Ok(Self {
            bind: var("DOCSMITH_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port,
            backend_timeout: Duration::from_secs(timeout_secs),
            generator: GeneratorConfig {
                provider,
                base_url: base_url.trim_end_matches('/').to_string(),
                model: var("DOCSMITH_AI_MODEL")
                    .unwrap_or_else(|| provider.default_model().to_string()),
                api_key: var("DOCSMITH_AI_API_KEY"),
                multimodal,
            },
            documents: DocumentsConfig {
                base_url: var("DOCSMITH_DOCS_URL")
                    .unwrap_or_else(|| DEFAULT_DOCS_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                access_token: var("DOCSMITH_DOCS_TOKEN"),
            },
            security: SecurityConfig::disabled(),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
