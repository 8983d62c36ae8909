//! Configuration module for the Talkback gateway.
//!
//! Configuration is layered: defaults, then `.env` / environment variables,
//! then an optional YAML file. Priority: YAML > ENV vars > .env values >
//! defaults. The `.env` file is loaded in main.rs at startup, so by the time
//! this module runs, its values are ordinary environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub mod remote;

pub use remote::{PromptConfig, PromptStore, RemoteConfigError};

use crate::core::llm::OPENAI_API_URL;
use crate::core::tts::DEEPGRAM_SPEAK_URL;

/// Default system instruction sent ahead of every transcript.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Respond very briefly.";

/// Default generation model identifier.
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4";

/// Default synthesis voice model.
pub const DEFAULT_SYNTHESIS_MODEL: &str = "aura-asteria-en";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 60;

/// Configuration loading/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Everything needed to run the gateway: listen address, optional TLS,
/// collaborator endpoints and credentials, pipeline deadlines, and the
/// initial prompt/model pair (hot-swappable at runtime, see
/// [`remote::PromptStore`]).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Collaborator credentials
    /// API key for the text-generation backend (bearer auth)
    pub openai_api_key: Option<String>,
    /// API key for the speech-synthesis backend (`Token` auth)
    pub deepgram_api_key: Option<String>,

    // Collaborator endpoints (overridable for self-hosted or test backends)
    pub generation_base_url: String,
    pub synthesis_base_url: String,

    // Pipeline settings
    /// Generation model identifier; initial value for the prompt store
    pub generation_model: String,
    /// Synthesis voice model, passed as the `model` query parameter
    pub synthesis_model: String,
    /// System instruction; initial value for the prompt store
    pub system_prompt: String,
    /// Remote JSON endpoint serving `{prompt, model}` for hot reloads
    pub remote_config_url: Option<String>,
    /// Deadline for one generation call, in seconds
    pub generation_timeout_seconds: u64,
    /// Deadline for one synthesis call including the streamed body, in seconds
    pub synthesis_timeout_seconds: u64,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            openai_api_key: None,
            deepgram_api_key: None,
            generation_base_url: OPENAI_API_URL.to_string(),
            synthesis_base_url: DEEPGRAM_SPEAK_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            remote_config_url: None,
            generation_timeout_seconds: DEFAULT_GENERATION_TIMEOUT_SECS,
            synthesis_timeout_seconds: DEFAULT_SYNTHESIS_TIMEOUT_SECS,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            host: env_opt("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env_parse("PORT", DEFAULT_PORT)?,
            tls: None,
            openai_api_key: env_opt("OPENAI_API_KEY"),
            deepgram_api_key: env_opt("DEEPGRAM_API_KEY"),
            generation_base_url: env_opt("GENERATION_BASE_URL")
                .unwrap_or_else(|| OPENAI_API_URL.to_string()),
            synthesis_base_url: env_opt("SYNTHESIS_BASE_URL")
                .unwrap_or_else(|| DEEPGRAM_SPEAK_URL.to_string()),
            generation_model: env_opt("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            synthesis_model: env_opt("SYNTHESIS_MODEL")
                .unwrap_or_else(|| DEFAULT_SYNTHESIS_MODEL.to_string()),
            system_prompt: env_opt("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            remote_config_url: env_opt("REMOTE_CONFIG_URL"),
            generation_timeout_seconds: env_parse(
                "GENERATION_TIMEOUT_SECONDS",
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )?,
            synthesis_timeout_seconds: env_parse(
                "SYNTHESIS_TIMEOUT_SECONDS",
                DEFAULT_SYNTHESIS_TIMEOUT_SECS,
            )?,
            cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS"),
        };

        if let (Some(cert), Some(key)) = (env_opt("TLS_CERT_PATH"), env_opt("TLS_KEY_PATH")) {
            config.tls = Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base.
    ///
    /// Environment variables (including `.env` values loaded at startup)
    /// provide the base; the YAML file overrides specific values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let yaml: YamlConfig = serde_yaml::from_str(&contents)?;

        let mut config = Self::from_env()?;
        yaml.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Get the server address as a string, in the format "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_seconds)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_seconds)
    }

    /// The initial prompt/model pair handed to the prompt store.
    pub fn initial_prompt_config(&self) -> PromptConfig {
        PromptConfig {
            prompt: self.system_prompt.clone(),
            model: self.generation_model.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("generation_base_url", &self.generation_base_url)?;
        validate_url("synthesis_base_url", &self.synthesis_base_url)?;
        if let Some(ref remote) = self.remote_config_url {
            validate_url("remote_config_url", remote)?;
        }
        if self.generation_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "generation_timeout_seconds".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.synthesis_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "synthesis_timeout_seconds".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Read an environment variable, treating empty values as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

// =============================================================================
// YAML overlay
// =============================================================================

/// YAML configuration file structure. All fields are optional; present
/// values override the environment base.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///
/// providers:
///   openai_api_key: "sk-..."
///   deepgram_api_key: "dg-..."
///
/// pipeline:
///   generation_model: "gpt-4"
///   synthesis_model: "aura-asteria-en"
///   system_prompt: "Respond very briefly."
///   generation_timeout_seconds: 30
///   synthesis_timeout_seconds: 60
///   remote_config_url: "https://config.example.com/prompt.json"
///
/// security:
///   cors_allowed_origins: "*"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct YamlConfig {
    server: Option<ServerYaml>,
    providers: Option<ProvidersYaml>,
    pipeline: Option<PipelineYaml>,
    security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ServerYaml {
    host: Option<String>,
    port: Option<u16>,
    tls: Option<TlsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct TlsYaml {
    cert_path: Option<String>,
    key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ProvidersYaml {
    openai_api_key: Option<String>,
    deepgram_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct PipelineYaml {
    generation_base_url: Option<String>,
    synthesis_base_url: Option<String>,
    generation_model: Option<String>,
    synthesis_model: Option<String>,
    system_prompt: Option<String>,
    remote_config_url: Option<String>,
    generation_timeout_seconds: Option<u64>,
    synthesis_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct SecurityYaml {
    cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = server.tls
                && let (Some(cert), Some(key)) = (tls.cert_path, tls.key_path)
            {
                config.tls = Some(TlsConfig {
                    cert_path: PathBuf::from(cert),
                    key_path: PathBuf::from(key),
                });
            }
        }
        if let Some(providers) = self.providers {
            if let Some(key) = providers.openai_api_key {
                config.openai_api_key = Some(key);
            }
            if let Some(key) = providers.deepgram_api_key {
                config.deepgram_api_key = Some(key);
            }
        }
        if let Some(pipeline) = self.pipeline {
            if let Some(url) = pipeline.generation_base_url {
                config.generation_base_url = url;
            }
            if let Some(url) = pipeline.synthesis_base_url {
                config.synthesis_base_url = url;
            }
            if let Some(model) = pipeline.generation_model {
                config.generation_model = model;
            }
            if let Some(model) = pipeline.synthesis_model {
                config.synthesis_model = model;
            }
            if let Some(prompt) = pipeline.system_prompt {
                config.system_prompt = prompt;
            }
            if let Some(url) = pipeline.remote_config_url {
                config.remote_config_url = Some(url);
            }
            if let Some(secs) = pipeline.generation_timeout_seconds {
                config.generation_timeout_seconds = secs;
            }
            if let Some(secs) = pipeline.synthesis_timeout_seconds {
                config.synthesis_timeout_seconds = secs;
            }
        }
        if let Some(security) = self.security
            && let Some(origins) = security.cors_allowed_origins
        {
            config.cors_allowed_origins = Some(origins);
        }
    }
}
