//! Instrument matcher
//!
//! Resolves dictionary instrument keys against the instrument labels that
//! actually occur in the export. Tiers are tried in order and the first that
//! matches wins:
//! 1. Alias table
//! 2. Exact label
//! 3. Normalized substring (with Form A / Form B exclusion)
//!
//! Each distinct key is resolved once per run and cached.

pub mod aliases;
pub mod strategies;

pub use aliases::AliasTable;
pub use strategies::{
    AliasStrategy, ExactStrategy, MatchStrategy, NormalizedSubstringStrategy,
};

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Tier that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Alias,
    Exact,
    NormalizedSubstring,
}

/// Outcome of resolving one instrument key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResolution {
    Resolved { tier: MatchTier, labels: Vec<String> },
    Unresolved,
}

impl MatchResolution {
    /// Matched labels, `None` when unresolved
    pub fn labels(&self) -> Option<&[String]> {
        match self {
            MatchResolution::Resolved { labels, .. } => Some(labels),
            MatchResolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MatchResolution::Resolved { .. })
    }
}

/// Distinct instrument labels observed in the export, kept sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentLabelSet {
    labels: BTreeSet<String>,
}

impl InstrumentLabelSet {
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Labels in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for InstrumentLabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Tiered, caching instrument matcher
pub struct InstrumentMatcher {
    labels: InstrumentLabelSet,
    strategies: Vec<Box<dyn MatchStrategy>>,
    cache: HashMap<String, MatchResolution>,
}

impl InstrumentMatcher {
    /// Matcher with the standard tier order
    pub fn new(labels: InstrumentLabelSet, aliases: AliasTable) -> Self {
        Self::with_strategies(
            labels,
            vec![
                Box::new(AliasStrategy::new(aliases)),
                Box::new(ExactStrategy),
                Box::new(NormalizedSubstringStrategy),
            ],
        )
    }

    /// Matcher with a custom ordered list of strategies
    pub fn with_strategies(
        labels: InstrumentLabelSet,
        strategies: Vec<Box<dyn MatchStrategy>>,
    ) -> Self {
        Self {
            labels,
            strategies,
            cache: HashMap::new(),
        }
    }

    pub fn labels(&self) -> &InstrumentLabelSet {
        &self.labels
    }

    /// Resolve `key`, computing it on first use
    pub fn resolve(&mut self, key: &str) -> &MatchResolution {
        let key = key.trim();
        if !self.cache.contains_key(key) {
            let resolution = self.compute(key);
            self.cache.insert(key.to_string(), resolution);
        }
        &self.cache[key]
    }

    /// Every resolution computed so far
    pub fn resolutions(&self) -> &HashMap<String, MatchResolution> {
        &self.cache
    }

    fn compute(&self, key: &str) -> MatchResolution {
        for strategy in &self.strategies {
            // An empty label list counts as no match
            let labels = match strategy.try_match(key, &self.labels) {
                Some(labels) if !labels.is_empty() => labels,
                _ => continue,
            };
            let tier = strategy.tier();
            match labels.as_slice() {
                [label] => info!(key = %key, tier = ?tier, matched = %label, "[MATCH] instrument"),
                _ => info!(key = %key, tier = ?tier, matches = ?labels, "[MATCH MULTI] instrument"),
            }
            return MatchResolution::Resolved { tier, labels };
        }

        warn!(key = %key, "[NO MATCH] instrument not found in export");
        MatchResolution::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_set(values: &[&str]) -> InstrumentLabelSet {
        values.iter().copied().collect()
    }

    #[test]
    fn test_tier_order_alias_before_exact() {
        let mut matcher = InstrumentMatcher::new(
            label_set(&["Visual Reasoning", "Visual Reasoning v3.1"]),
            AliasTable::builtin(),
        );

        let resolution = matcher.resolve("Visual Reasoning").clone();
        assert_eq!(
            resolution,
            MatchResolution::Resolved {
                tier: MatchTier::Alias,
                labels: vec!["Visual Reasoning".to_string(), "Visual Reasoning v3.1".to_string()],
            }
        );
    }

    #[test]
    fn test_exact_before_substring() {
        let mut matcher = InstrumentMatcher::new(
            label_set(&["Flanker Age 12+", "Flanker Age 12+ v2.1"]),
            AliasTable::builtin(),
        );

        assert_eq!(
            matcher.resolve("Flanker Age 12+").labels(),
            Some(&["Flanker Age 12+".to_string()][..])
        );
    }

    #[test]
    fn test_unresolved() {
        let mut matcher = InstrumentMatcher::new(label_set(&["Flanker"]), AliasTable::builtin());
        assert_eq!(matcher.resolve("Grip Strength"), &MatchResolution::Unresolved);
        assert!(!matcher.resolve("Grip Strength").is_resolved());
    }

    #[test]
    fn test_resolution_cached_once_per_key() {
        let mut matcher = InstrumentMatcher::new(label_set(&["Flanker v2.1"]), AliasTable::builtin());

        let first = matcher.resolve("Flanker").clone();
        let second = matcher.resolve(" Flanker ").clone();

        assert_eq!(first, second);
        assert_eq!(matcher.resolutions().len(), 1);
    }

    #[test]
    fn test_deterministic_regardless_of_label_order() {
        let forward = label_set(&["Card Sort Age 12+ v2.1", "Card Sort Age 12+ v2.0"]);
        let backward = label_set(&["Card Sort Age 12+ v2.0", "Card Sort Age 12+ v2.1"]);

        let mut a = InstrumentMatcher::new(forward, AliasTable::builtin());
        let mut b = InstrumentMatcher::new(backward, AliasTable::builtin());

        assert_eq!(a.resolve("Card Sort Age 12+"), b.resolve("Card Sort Age 12+"));
        assert_eq!(
            a.resolve("Card Sort Age 12+").labels(),
            Some(&["Card Sort Age 12+ v2.0".to_string()][..])
        );
    }

    #[test]
    fn test_custom_strategy_list() {
        let mut matcher =
            InstrumentMatcher::with_strategies(label_set(&["Flanker v2.1"]), vec![Box::new(ExactStrategy)]);
        assert_eq!(matcher.resolve("Flanker"), &MatchResolution::Unresolved);
    }

    struct EmptyMatch;

    impl MatchStrategy for EmptyMatch {
        fn tier(&self) -> MatchTier {
            MatchTier::Alias
        }

        fn try_match(&self, _key: &str, _labels: &InstrumentLabelSet) -> Option<Vec<String>> {
            Some(Vec::new())
        }
    }

    #[test]
    fn test_empty_label_list_is_not_a_match() {
        let mut matcher = InstrumentMatcher::with_strategies(label_set(&["Flanker"]), vec![Box::new(EmptyMatch)]);
        assert_eq!(matcher.resolve("Flanker"), &MatchResolution::Unresolved);

        let mut matcher = InstrumentMatcher::with_strategies(
            label_set(&["Flanker"]),
            vec![Box::new(EmptyMatch), Box::new(ExactStrategy)],
        );
        assert_eq!(
            matcher.resolve("Flanker"),
            &MatchResolution::Resolved {
                tier: MatchTier::Exact,
                labels: vec!["Flanker".to_string()],
            }
        );
    }

    #[test]
    fn test_resolution_serializes_with_status_tag() {
        let resolved = MatchResolution::Resolved {
            tier: MatchTier::NormalizedSubstring,
            labels: vec!["Flanker v2.1".to_string()],
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["tier"], "normalized_substring");

        let json = serde_json::to_value(MatchResolution::Unresolved).unwrap();
        assert_eq!(json["status"], "unresolved");
    }
}
