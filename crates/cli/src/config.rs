//! Configuration loading from chartwise.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use runtime::{AgentConfig, AnthropicAuth, AnthropicBackend, DEFAULT_BASE_URL};
use serde::Deserialize;
use toolwire::ClientConfig;

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub tools: ToolsConfig,
    pub agent: AgentSection,
}

/// Completion service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub model: String,

    /// Standard Anthropic API key (sk-ant-api01-...).
    /// Mutually exclusive with bearer_token.
    pub api_key: Option<String>,

    /// Bearer token for gateways in front of the API.
    /// Mutually exclusive with api_key.
    pub bearer_token: Option<String>,

    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            bearer_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 4096,
        }
    }
}

/// Tool provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub require_token: bool,
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            require_token: false,
            timeout_secs: toolwire::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_iterations: u32,
    pub call_delay_ms: u64,
    /// Replaces the built-in instructions.
    pub instructions_file: Option<PathBuf>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: runtime::DEFAULT_MAX_ITERATIONS,
            call_delay_ms: 0,
            instructions_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the authentication from config, falling back to
    /// `ANTHROPIC_API_KEY` when neither credential is set.
    pub fn auth(&self) -> Result<AnthropicAuth, ConfigError> {
        self.resolve_auth(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_auth(&self, env_key: Option<String>) -> Result<AnthropicAuth, ConfigError> {
        match (&self.backend.api_key, &self.backend.bearer_token) {
            (Some(key), None) => Ok(AnthropicAuth::ApiKey(key.clone())),
            (None, Some(token)) => Ok(AnthropicAuth::Bearer(token.clone())),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousAuth),
            (None, None) => env_key
                .filter(|key| !key.is_empty())
                .map(AnthropicAuth::ApiKey)
                .ok_or(ConfigError::MissingAuth),
        }
    }

    pub fn backend(&self) -> Result<AnthropicBackend, ConfigError> {
        Ok(AnthropicBackend::builder(self.auth()?, &self.backend.model)
            .max_tokens(self.backend.max_tokens)
            .base_url(&self.backend.base_url)
            .build())
    }

    /// Tool client settings; `url_override` wins over `tools.url`.
    pub fn tool_client(&self, url_override: Option<&str>) -> Result<ClientConfig, ConfigError> {
        let url = url_override
            .or(self.tools.url.as_deref())
            .ok_or(ConfigError::MissingToolsUrl)?;

        let mut config = ClientConfig::new(url)
            .require_token(self.tools.require_token)
            .with_timeout(Duration::from_secs(self.tools.timeout_secs));
        if let Some(token) = &self.tools.token {
            config = config.with_token(token);
        }
        Ok(config)
    }

    pub fn agent(&self) -> Result<AgentConfig, ConfigError> {
        let section = &self.agent;
        if section.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        let mut config = AgentConfig::default().with_max_iterations(section.max_iterations);
        if section.call_delay_ms > 0 {
            config = config.with_call_delay(Duration::from_millis(section.call_delay_ms));
        }
        if let Some(path) = &section.instructions_file {
            let instructions =
                std::fs::read_to_string(path).map_err(|source| ConfigError::Instructions {
                    path: path.clone(),
                    source,
                })?;
            config = config.with_instructions(instructions);
        }
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(
        "authentication not configured: set backend.api_key, backend.bearer_token or ANTHROPIC_API_KEY"
    )]
    MissingAuth,

    #[error(
        "ambiguous authentication: set either backend.api_key OR backend.bearer_token, not both"
    )]
    AmbiguousAuth,

    #[error("tool provider not configured: set tools.url or pass --tools-url")]
    MissingToolsUrl,

    #[error("failed to read instructions from {path}: {source}")]
    Instructions {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
