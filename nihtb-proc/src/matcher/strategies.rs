//! Match strategies, one per resolution tier
//!
//! Each strategy either returns the labels it accepts for a key or `None`,
//! leaving the decision to the next tier.

use super::aliases::AliasTable;
use super::{InstrumentLabelSet, MatchTier};
use once_cell::sync::Lazy;
use regex::Regex;

/// Filler words removed before substring comparison
const FILLER_WORDS: &[&str] = &["test", "exam"];

/// One tier of instrument resolution
pub trait MatchStrategy: Send + Sync {
    /// Tier reported for matches made by this strategy
    fn tier(&self) -> MatchTier;

    /// Labels accepted for `key`, or `None` when this tier has no match
    fn try_match(&self, key: &str, labels: &InstrumentLabelSet) -> Option<Vec<String>>;
}

/// Tier 1: explicit alias table
pub struct AliasStrategy {
    table: AliasTable,
}

impl AliasStrategy {
    pub fn new(table: AliasTable) -> Self {
        Self { table }
    }
}

impl MatchStrategy for AliasStrategy {
    fn tier(&self) -> MatchTier {
        MatchTier::Alias
    }

    fn try_match(&self, key: &str, labels: &InstrumentLabelSet) -> Option<Vec<String>> {
        let present: Vec<String> = self
            .table
            .variants(key)?
            .iter()
            .filter(|variant| labels.contains(variant))
            .cloned()
            .collect();
        (!present.is_empty()).then_some(present)
    }
}

/// Tier 2: key present verbatim
pub struct ExactStrategy;

impl MatchStrategy for ExactStrategy {
    fn tier(&self) -> MatchTier {
        MatchTier::Exact
    }

    fn try_match(&self, key: &str, labels: &InstrumentLabelSet) -> Option<Vec<String>> {
        labels.contains(key).then(|| vec![key.to_string()])
    }
}

/// Tier 3: containment after normalization, excluding alternate forms
///
/// Labels are scanned in sorted order and the first acceptable one wins.
pub struct NormalizedSubstringStrategy;

impl MatchStrategy for NormalizedSubstringStrategy {
    fn tier(&self) -> MatchTier {
        MatchTier::NormalizedSubstring
    }

    fn try_match(&self, key: &str, labels: &InstrumentLabelSet) -> Option<Vec<String>> {
        let key_simple = normalize_label(key);
        if key_simple.is_empty() {
            return None;
        }

        labels
            .iter()
            .find(|label| {
                let label_simple = normalize_label(label);
                !label_simple.is_empty()
                    && (label_simple.contains(&key_simple) || key_simple.contains(&label_simple))
                    && !is_cross_form(key, label)
            })
            .map(|label| vec![label.to_string()])
    }
}

/// Lower-case, drop filler words, then drop all whitespace (including NBSP)
pub fn normalize_label(s: &str) -> String {
    let mut lowered = s.to_lowercase();
    for filler in FILLER_WORDS {
        lowered = lowered.replace(filler, "");
    }
    lowered.chars().filter(|c| !c.is_whitespace()).collect()
}

static FORM_A: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bform a\b").expect("form pattern is valid"));
static FORM_B: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bform b\b").expect("form pattern is valid"));

/// True when the key asks for Form A and the label is the Form B variant
pub fn is_cross_form(key: &str, label: &str) -> bool {
    FORM_A.is_match(key) && FORM_B.is_match(label)
}
