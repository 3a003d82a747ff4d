//! Alias table for instruments with inconsistent version-tag formatting
//!
//! Some instruments appear in exports both with and without a version tag,
//! and sometimes with the tag glued to the name. The table lists, per
//! canonical instrument key, every label variant accepted for it.

use std::collections::BTreeMap;

/// Built-in aliases: canonical key → accepted label variants
const BUILTIN_ALIASES: &[(&str, &[&str])] = &[(
    "Visual Reasoning",
    &["Visual Reasoning", "Visual Reasoning v3.1", "Visual Reasoningv3.1"],
)];

/// Canonical instrument key → accepted label variants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    /// Table with only the built-in entries
    pub fn builtin() -> Self {
        let entries = BUILTIN_ALIASES
            .iter()
            .map(|(key, variants)| {
                (
                    key.to_string(),
                    variants.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Add entries from configuration
    ///
    /// Variants for a key already in the table are appended after the
    /// existing ones, skipping repeats.
    pub fn with_extra(mut self, extra: &BTreeMap<String, Vec<String>>) -> Self {
        for (key, variants) in extra {
            let entry = self.entries.entry(key.trim().to_string()).or_default();
            for variant in variants {
                if !entry.contains(variant) {
                    entry.push(variant.clone());
                }
            }
        }
        self
    }

    /// Accepted variants for `key`, in table order
    pub fn variants(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
