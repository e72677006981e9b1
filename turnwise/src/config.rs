//! The `turnwise.json` configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use turnwise_loop::{ConfigError, LoopConfig, TurnError};
use turnwise_types::{AgentProfile, ComplexityTier};

/// File read when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "turnwise.json";

/// Errors from loading configuration or running the CLI.
#[derive(Debug, thiserror::Error)]
pub enum TurnwiseError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The config file is not valid JSON for [`TurnwiseConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// A section failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No agent with this type is configured.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    /// The API key environment variable is unset.
    #[error("missing API key: set {0}")]
    MissingApiKey(String),
    /// The turn failed.
    #[error(transparent)]
    Turn(#[from] TurnError),
    /// Writing output failed.
    #[error("output error: {0}")]
    Output(String),
}

/// Model backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model used when a request leaves the model empty.
    pub default_model: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".into(),
            api_key_env: "ANTHROPIC_API_KEY".into(),
            default_model: "claude-sonnet-4-20250514".into(),
            connect_timeout_secs: 10,
        }
    }
}

/// Everything loaded from `turnwise.json`.
///
/// Every section has a default, so `{}` is a complete file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnwiseConfig {
    /// Backend connection.
    pub provider: ProviderConfig,
    /// Retry policy, tier table and pricing.
    #[serde(flatten)]
    pub engine: LoopConfig,
    /// Agent catalogue.
    pub agents: Vec<AgentProfile>,
}

impl Default for TurnwiseConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            engine: LoopConfig::default(),
            agents: default_agents(),
        }
    }
}

impl TurnwiseConfig {
    /// Read and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self, TurnwiseError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TurnwiseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| TurnwiseError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), agents = config.agents.len(), "turnwise.config.loaded");
        Ok(config)
    }

    /// `path` if given, else `turnwise.json` if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, TurnwiseError> {
        if let Some(path) = path {
            return Self::from_path(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::from_path(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.agents.is_empty() {
            return Err(ConfigError::Invalid("at least one agent is required".into()));
        }
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.agent_type.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("agents[{i}]: agent_type is empty")));
            }
            if self.agents[..i]
                .iter()
                .any(|other| other.agent_type == agent.agent_type)
            {
                return Err(ConfigError::Invalid(format!(
                    "agents[{i}]: duplicate agent_type {}",
                    agent.agent_type
                )));
            }
        }
        Ok(())
    }

    /// Look up an agent by type.
    pub fn agent(&self, agent_type: &str) -> Result<&AgentProfile, TurnwiseError> {
        self.agents
            .iter()
            .find(|a| a.agent_type == agent_type)
            .ok_or_else(|| TurnwiseError::UnknownAgent(agent_type.to_string()))
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, TurnwiseError> {
        match std::env::var(&self.provider.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(TurnwiseError::MissingApiKey(
                self.provider.api_key_env.clone(),
            )),
        }
    }
}

/// The built-in agent catalogue.
#[must_use]
pub fn default_agents() -> Vec<AgentProfile> {
    let mut grant_cards = AgentProfile::new(
        "grant-cards",
        "You turn grant program guidelines into concise grant cards: eligibility, \
         funding amounts, deadlines and required documents. Use the CRM to check \
         client details and cite the program source for every requirement.",
    );
    grant_cards.display_name = "Grant Cards".into();

    let mut etg_writer = AgentProfile::new(
        "etg-writer",
        "You help employers prepare Employer Training Grant applications: training \
         rationale, eligible costs and participant details. Draft sections the user \
         can paste into the application.",
    );
    etg_writer.display_name = "ETG Writer".into();

    let mut claims = AgentProfile::new(
        "canexport-claims",
        "You audit CanExport SMEs expense claims. Check every expense against the \
         program's eligibility rules, flag missing evidence and explain each \
         decision.",
    )
    .with_default_tier(ComplexityTier::Complex);
    claims.display_name = "CanExport Claims".into();

    let mut general = AgentProfile::new(
        "general",
        "You are a grant consulting assistant. Answer questions about clients, \
         programs and documents, using tools when they help.",
    );
    general.display_name = "General".into();

    vec![grant_cards, etg_writer, claims, general]
}
