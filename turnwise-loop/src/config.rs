//! Loop configuration: the tier table, retry policy and pricing.
//!
//! Loaded once at start-up and shared read-only by every turn.

use serde::{Deserialize, Serialize};
use turnwise_types::{ComplexityTier, RunConfiguration};

use crate::retry::RetryPolicy;
use crate::usage::PricingTable;

/// Errors from configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The simple tier asks for more than the complex tier on some axis.
    #[error("tier table: simple {axis} ({simple}) exceeds complex {axis} ({complex})")]
    TierShape {
        /// The offending resource axis.
        axis: &'static str,
        /// Simple tier value.
        simple: String,
        /// Complex tier value.
        complex: String,
    },
    /// A tier allows no round-trips or no output.
    #[error("tier {tier}: {field} must be greater than zero")]
    Zero {
        /// Offending tier.
        tier: ComplexityTier,
        /// Offending field.
        field: &'static str,
    },
    /// The reasoning budget leaves no room for a visible answer.
    #[error("tier {tier}: reasoning budget {budget} must be smaller than max output {max_output}")]
    BudgetExceedsOutput {
        /// Offending tier.
        tier: ComplexityTier,
        /// Reasoning budget.
        budget: u32,
        /// Max output tokens.
        max_output: u32,
    },
    /// Temperature outside `0.0..=1.0`.
    #[error("tier {tier}: temperature {value} is outside 0.0..=1.0")]
    Temperature {
        /// Offending tier.
        tier: ComplexityTier,
        /// Configured value.
        value: f32,
    },
    /// Any other invalid setting.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Resources granted to one complexity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    /// Backend model identifier.
    pub model_id: String,
    /// Extended reasoning budget. `None` disables reasoning.
    #[serde(default)]
    pub reasoning_budget_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens per round-trip.
    pub max_output_tokens: u32,
    /// Maximum round-trips per turn.
    pub max_iterations: u32,
}

/// Tier → settings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    /// Lookups and status checks.
    pub simple: TierSettings,
    /// Analysis, compliance and generation.
    pub complex: TierSettings,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            simple: TierSettings {
                model_id: "claude-haiku-4-5-20251001".into(),
                reasoning_budget_tokens: None,
                temperature: 0.3,
                max_output_tokens: 4096,
                max_iterations: 5,
            },
            complex: TierSettings {
                model_id: "claude-sonnet-4-20250514".into(),
                reasoning_budget_tokens: Some(10_000),
                temperature: 1.0,
                max_output_tokens: 16_000,
                max_iterations: 15,
            },
        }
    }
}

impl TierTable {
    /// Settings for `tier`.
    #[must_use]
    pub fn settings(&self, tier: ComplexityTier) -> &TierSettings {
        match tier {
            ComplexityTier::Simple => &self.simple,
            ComplexityTier::Complex => &self.complex,
        }
    }

    /// The run configuration for `tier`.
    #[must_use]
    pub fn resolve(&self, tier: ComplexityTier) -> RunConfiguration {
        let s = self.settings(tier);
        RunConfiguration {
            complexity_tier: tier,
            model_id: s.model_id.clone(),
            reasoning_budget_tokens: s.reasoning_budget_tokens,
            temperature: s.temperature,
            max_output_tokens: s.max_output_tokens,
            max_iterations: s.max_iterations,
        }
    }

    /// Reject tables where simple outranks complex on any resource axis, or
    /// where a tier is unusable on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in [ComplexityTier::Simple, ComplexityTier::Complex] {
            let s = self.settings(tier);
            if s.model_id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("tier {tier}: model_id is empty")));
            }
            if s.max_iterations == 0 {
                return Err(ConfigError::Zero {
                    tier,
                    field: "max_iterations",
                });
            }
            if s.max_output_tokens == 0 {
                return Err(ConfigError::Zero {
                    tier,
                    field: "max_output_tokens",
                });
            }
            if !(0.0..=1.0).contains(&s.temperature) {
                return Err(ConfigError::Temperature {
                    tier,
                    value: s.temperature,
                });
            }
            if let Some(budget) = s.reasoning_budget_tokens {
                if budget >= s.max_output_tokens {
                    return Err(ConfigError::BudgetExceedsOutput {
                        tier,
                        budget,
                        max_output: s.max_output_tokens,
                    });
                }
            }
        }

        let (simple, complex) = (&self.simple, &self.complex);
        check_axis(
            "reasoning_budget_tokens",
            simple.reasoning_budget_tokens.unwrap_or(0),
            complex.reasoning_budget_tokens.unwrap_or(0),
        )?;
        check_axis("temperature", simple.temperature, complex.temperature)?;
        check_axis(
            "max_output_tokens",
            simple.max_output_tokens,
            complex.max_output_tokens,
        )?;
        check_axis("max_iterations", simple.max_iterations, complex.max_iterations)?;
        Ok(())
    }
}

fn check_axis<T: PartialOrd + ToString>(
    axis: &'static str,
    simple: T,
    complex: T,
) -> Result<(), ConfigError> {
    if simple > complex {
        return Err(ConfigError::TierShape {
            axis,
            simple: simple.to_string(),
            complex: complex.to_string(),
        });
    }
    Ok(())
}

/// Everything the orchestrator is constructed with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Retry policy for opening calls.
    pub retry: RetryPolicy,
    /// Tier table.
    pub tiers: TierTable,
    /// Per-model pricing.
    pub pricing: PricingTable,
}

impl LoopConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tiers.validate()?;
        self.retry.validate()
    }
}
