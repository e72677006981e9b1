//! Usage accounting: token totals, cost and cache efficiency per turn.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use turnwise_types::{UsageReport, UsageStats};

/// USD rates per million tokens for one model family.
///
/// Serialized as decimal strings (`"3.00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Uncached input.
    pub input_per_mtok: Decimal,
    /// Output, including reasoning.
    pub output_per_mtok: Decimal,
    /// Input served from the prompt cache.
    pub cache_read_per_mtok: Decimal,
    /// Input written to the prompt cache.
    pub cache_write_per_mtok: Decimal,
}

impl ModelPricing {
    /// Cost of `usage` at these rates.
    #[must_use]
    pub fn cost(&self, usage: &UsageStats) -> Decimal {
        let per_token = |tokens: u64, rate: Decimal| {
            Decimal::from(tokens) * rate / Decimal::from(1_000_000_u32)
        };
        per_token(usage.input_tokens, self.input_per_mtok)
            + per_token(usage.output_tokens, self.output_per_mtok)
            + per_token(usage.cache_read_tokens, self.cache_read_per_mtok)
            + per_token(usage.cache_write_tokens, self.cache_write_per_mtok)
    }
}

/// Pricing keyed by model id prefix. The longest matching prefix wins, so
/// `claude-sonnet-4` prices `claude-sonnet-4-20250514`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    models: BTreeMap<String, ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "claude-haiku".to_string(),
            ModelPricing {
                input_per_mtok: Decimal::new(1, 0),
                output_per_mtok: Decimal::new(5, 0),
                cache_read_per_mtok: Decimal::new(1, 1),
                cache_write_per_mtok: Decimal::new(125, 2),
            },
        );
        models.insert(
            "claude-sonnet".to_string(),
            ModelPricing {
                input_per_mtok: Decimal::new(3, 0),
                output_per_mtok: Decimal::new(15, 0),
                cache_read_per_mtok: Decimal::new(3, 1),
                cache_write_per_mtok: Decimal::new(375, 2),
            },
        );
        models.insert(
            "claude-opus".to_string(),
            ModelPricing {
                input_per_mtok: Decimal::new(15, 0),
                output_per_mtok: Decimal::new(75, 0),
                cache_read_per_mtok: Decimal::new(15, 1),
                cache_write_per_mtok: Decimal::new(1875, 2),
            },
        );
        Self { models }
    }
}

impl PricingTable {
    /// An empty table. Every model costs zero.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Add or replace rates for a model id prefix.
    pub fn insert(&mut self, prefix: impl Into<String>, pricing: ModelPricing) {
        self.models.insert(prefix.into(), pricing);
    }

    /// Rates for `model_id`, if any prefix matches.
    #[must_use]
    pub fn lookup(&self, model_id: &str) -> Option<&ModelPricing> {
        self.models
            .iter()
            .filter(|(prefix, _)| model_id.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, pricing)| pricing)
    }
}

/// Share of input tokens served from cache, as a percentage.
///
/// Zero when no input was reported.
#[must_use]
pub fn cache_efficiency(usage: &UsageStats) -> f64 {
    let total_input = usage.input_tokens + usage.cache_read_tokens + usage.cache_write_tokens;
    if total_input == 0 {
        return 0.0;
    }
    usage.cache_read_tokens as f64 / total_input as f64 * 100.0
}

/// Folds per-round-trip usage into one report for the turn.
#[derive(Debug, Clone)]
pub struct UsageAccountant {
    model_id: String,
    totals: UsageStats,
    round_trips: u32,
}

impl UsageAccountant {
    /// Start accounting for a turn on `model_id`.
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            totals: UsageStats::default(),
            round_trips: 0,
        }
    }

    /// Add one round-trip's usage.
    pub fn record(&mut self, usage: &UsageStats) {
        self.totals.accumulate(usage);
        self.round_trips += 1;
    }

    /// Totals so far.
    #[must_use]
    pub fn totals(&self) -> &UsageStats {
        &self.totals
    }

    /// Derive the report. Models missing from `pricing` cost zero.
    #[must_use]
    pub fn report(&self, pricing: &PricingTable) -> UsageReport {
        let cost = match pricing.lookup(&self.model_id) {
            Some(rates) => rates.cost(&self.totals),
            None => {
                tracing::warn!(model = %self.model_id, "turnwise.usage.unpriced_model");
                Decimal::ZERO
            }
        };
        let report = UsageReport {
            model_id: self.model_id.clone(),
            totals: self.totals,
            cost,
            cache_efficiency: cache_efficiency(&self.totals),
            round_trips: self.round_trips,
        };
        tracing::debug!(
            model = %report.model_id,
            input_tokens = report.totals.input_tokens,
            output_tokens = report.totals.output_tokens,
            cost = report.cost.to_f64().unwrap_or_default(),
            cache_efficiency = report.cache_efficiency,
            "turnwise.usage.report"
        );
        report
    }
}
