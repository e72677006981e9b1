//! Agent profiles and the per-turn run configuration.

use serde::{Deserialize, Serialize};

/// How much capability a turn is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    /// Lookups and status checks: lightweight model, no extended reasoning.
    Simple,
    /// Analysis, compliance, generation: full model with a reasoning budget.
    Complex,
}

impl std::fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityTier::Simple => f.write_str("simple"),
            ComplexityTier::Complex => f.write_str("complex"),
        }
    }
}

/// Resolved settings for one logical turn.
///
/// Computed once by the configuration selector and reused for every
/// round-trip of the turn. `reasoning_budget_tokens == None` disables
/// extended reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Tier the utterance was classified into.
    pub complexity_tier: ComplexityTier,
    /// Backend model identifier.
    pub model_id: String,
    /// Token budget for extended reasoning, if enabled.
    pub reasoning_budget_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens per round-trip.
    pub max_output_tokens: u32,
    /// Maximum round-trips before the turn is truncated.
    pub max_iterations: u32,
}

/// A chat agent as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable identifier (e.g. `"grant-cards"`).
    pub agent_type: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// System prompt sent with every round-trip.
    #[serde(default)]
    pub system_prompt: String,
    /// Tier used when the utterance matches neither pattern set.
    #[serde(default)]
    pub default_tier: Option<ComplexityTier>,
    /// Restricts the tools offered to the model. `None` offers all.
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
}

impl AgentProfile {
    /// Create a profile with no default tier and no tool restrictions.
    #[must_use]
    pub fn new(agent_type: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        let agent_type = agent_type.into();
        Self {
            display_name: agent_type.clone(),
            agent_type,
            system_prompt: system_prompt.into(),
            default_tier: None,
            allowed_tools: None,
        }
    }

    /// Set the fallback tier for ambiguous utterances.
    #[must_use]
    pub fn with_default_tier(mut self, tier: ComplexityTier) -> Self {
        self.default_tier = Some(tier);
        self
    }

    /// Restrict the tools offered to the model.
    #[must_use]
    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }
}
