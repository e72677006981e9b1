//! Utterance classification and run configuration selection.
//!
//! Classification is a pure function of the utterance and the agent
//! profile. High-stakes patterns are checked first so that a lookup-shaped
//! question about compliance still gets the complex tier.

use std::sync::LazyLock;

use regex::RegexSet;
use turnwise_types::{AgentProfile, ComplexityTier, RunConfiguration};

use crate::config::TierTable;

static HIGH_STAKES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // analysis and assessment
        r"(?i)\b(analy[sz]\w*|evaluat\w*|assess\w*)\b",
        // eligibility and compliance
        r"(?i)\b(eligib\w*|complian\w*|complies|comply|qualif(y|ies|ied|ication)\w*)\b",
        // audit, verification, validation, review
        r"(?i)\b(audit\w*|verif\w*|validat\w*|review\w*)\b",
        // comparison
        r"(?i)\b(compar\w*|versus|vs\.?|difference between|pros and cons)\b",
        // generation and writing
        r"(?i)\b(generat\w*|writ(e|es|ing)|rewrite|draft\w*|compos(e|ing)|creat(e|ing)|prepar(e|ing))\b",
        // causal why/how
        r"(?i)^\s*why\b",
        r"(?i)^\s*how\s+(should|would|could|can|do|does|did|might|will)\b",
        r"(?i)\b(explain\w*|justif\w*)\b",
        // multi-step conjunctions
        r"(?i)\b(and then|after that|followed by|step[- ]by[- ]step)\b",
        r"(?i)\bfirst\b.+\bthen\b",
    ])
    .expect("valid regex")
});

static LOOKUP: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // status checks: "Has Acme's application been approved?"
        r"(?i)^\s*(has|have|is|are|was|were|did|does|do)\b.*\b(approved|submitted|received|rejected|declined|funded|paid|pending|complete|completed|status|open|closed)\b",
        r"(?i)\b(status of|what'?s the status|current status)\b",
        // imperative retrieval verbs
        r"(?i)^\s*(show|list|find|get|fetch|look\s*up|pull\s*up|search|display|give me|tell me)\b",
        // simple wh-questions
        r"(?i)^\s*(what|when|where|who|which)\b",
    ])
    .expect("valid regex")
});

/// Which rule decided the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierRule {
    /// A high-stakes pattern matched.
    HighStakes,
    /// Only lookup patterns matched.
    Lookup,
    /// Neither matched; the agent's default tier applied.
    AgentDefault,
    /// Neither matched and the agent declares no default.
    Fallback,
}

impl TierRule {
    /// Short name for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TierRule::HighStakes => "high_stakes",
            TierRule::Lookup => "lookup",
            TierRule::AgentDefault => "agent_default",
            TierRule::Fallback => "fallback",
        }
    }
}

/// Classify an utterance.
#[must_use]
pub fn classify(utterance: &str, profile: &AgentProfile) -> (ComplexityTier, TierRule) {
    let text = utterance.trim();
    if !text.is_empty() {
        if HIGH_STAKES.is_match(text) {
            return (ComplexityTier::Complex, TierRule::HighStakes);
        }
        if LOOKUP.is_match(text) {
            return (ComplexityTier::Simple, TierRule::Lookup);
        }
    }
    match profile.default_tier {
        Some(tier) => (tier, TierRule::AgentDefault),
        None => (ComplexityTier::Complex, TierRule::Fallback),
    }
}

/// Maps utterances to run configurations through an injected tier table.
#[derive(Debug, Clone, Default)]
pub struct ConfigSelector {
    tiers: TierTable,
}

impl ConfigSelector {
    /// Create a selector over `tiers`. The table should already be validated.
    #[must_use]
    pub fn new(tiers: TierTable) -> Self {
        Self { tiers }
    }

    /// The tier table in use.
    #[must_use]
    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Resolve the configuration for one logical turn.
    #[must_use]
    pub fn select(&self, utterance: &str, profile: &AgentProfile) -> RunConfiguration {
        let (tier, rule) = classify(utterance, profile);
        tracing::debug!(
            agent = %profile.agent_type,
            tier = %tier,
            rule = rule.as_str(),
            "turnwise.selector.classified"
        );
        self.tiers.resolve(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents() -> Vec<AgentProfile> {
        vec![
            AgentProfile::new("general", ""),
            AgentProfile::new("grant-cards", ""),
            AgentProfile::new("etg-writer", "").with_default_tier(ComplexityTier::Simple),
            AgentProfile::new("canexport-claims", "").with_default_tier(ComplexityTier::Complex),
        ]
    }

    fn tier(utterance: &str, profile: &AgentProfile) -> ComplexityTier {
        classify(utterance, profile).0
    }

    #[test]
    fn status_check_is_simple() {
        let general = AgentProfile::new("general", "");
        assert_eq!(
            classify("Has Acme's application been approved?", &general),
            (ComplexityTier::Simple, TierRule::Lookup)
        );
    }

    #[test]
    fn audit_is_complex_for_every_agent() {
        for agent in agents() {
            assert_eq!(
                tier("Audit this expense for compliance", &agent),
                ComplexityTier::Complex,
                "agent {}",
                agent.agent_type
            );
        }
    }

    #[test]
    fn high_stakes_wins_over_lookup_shape() {
        let general = AgentProfile::new("general", "");
        assert_eq!(
            classify("What makes a company eligible for CanExport?", &general),
            (ComplexityTier::Complex, TierRule::HighStakes)
        );
        assert_eq!(
            tier("Show me and then compare the two applications", &general),
            ComplexityTier::Complex
        );
    }

    #[test]
    fn high_stakes_patterns() {
        let general = AgentProfile::new("general", "");
        for utterance in [
            "Analyze our training budget",
            "Is this expense eligible?",
            "Verify the invoice totals",
            "Compare ETG and CanExport",
            "Write a grant card for Acme",
            "Draft the cover letter",
            "Why was the claim rejected?",
            "How should we structure the budget?",
            "First pull the invoices, then summarize them",
        ] {
            assert_eq!(tier(utterance, &general), ComplexityTier::Complex, "{utterance}");
        }
    }

    #[test]
    fn lookup_patterns() {
        let general = AgentProfile::new("general", "");
        for utterance in [
            "List my conversations",
            "Find Acme in the CRM",
            "Look up the deadline",
            "When is the intake closing?",
            "Who is our contact at Globex?",
            "Is the Globex claim submitted?",
        ] {
            assert_eq!(tier(utterance, &general), ComplexityTier::Simple, "{utterance}");
        }
    }

    #[test]
    fn ambiguous_uses_agent_default_then_complex() {
        let writer = AgentProfile::new("etg-writer", "").with_default_tier(ComplexityTier::Simple);
        assert_eq!(
            classify("thanks!", &writer),
            (ComplexityTier::Simple, TierRule::AgentDefault)
        );
        let general = AgentProfile::new("general", "");
        assert_eq!(
            classify("thanks!", &general),
            (ComplexityTier::Complex, TierRule::Fallback)
        );
    }

    #[test]
    fn lookup_ignores_profile_default() {
        let claims =
            AgentProfile::new("canexport-claims", "").with_default_tier(ComplexityTier::Complex);
        assert_eq!(
            tier("Has Acme's application been approved?", &claims),
            ComplexityTier::Simple
        );
    }

    #[test]
    fn blank_utterance_falls_through() {
        let writer = AgentProfile::new("etg-writer", "").with_default_tier(ComplexityTier::Simple);
        assert_eq!(classify("   \n", &writer).1, TierRule::AgentDefault);
        assert_eq!(
            classify("", &AgentProfile::new("general", "")).1,
            TierRule::Fallback
        );
    }

    #[test]
    fn select_applies_tier_table() {
        let selector = ConfigSelector::default();
        let general = AgentProfile::new("general", "");
        let simple = selector.select("List my conversations", &general);
        assert_eq!(simple.complexity_tier, ComplexityTier::Simple);
        assert_eq!(simple.reasoning_budget_tokens, None);
        let complex = selector.select("Audit this expense for compliance", &general);
        assert!(complex.reasoning_budget_tokens.is_some());
        assert!(complex.max_iterations >= simple.max_iterations);
    }
}
