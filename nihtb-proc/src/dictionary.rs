//! Data dictionary parsing
//!
//! Each dictionary row pairs a target variable name with a free-text
//! definition such as
//! `NIH Toolbox Flanker Inhibitory Control and Attention Test Age 12+ v2.1 Raw Score`.
//! Rows whose definition names a known score kind become [`VariableSpec`]s;
//! everything else (demographics, identifiers) is skipped.

use crate::types::{ScoreKind, VariableSpec, DICT_DEFINITION_COLUMN, DICT_VARIABLE_COLUMN};
use nihtb_common::{Error, Result, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Product name stripped from definitions
const PRODUCT_PREFIX: &str = "NIH Toolbox ";

static VERSION_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v\d+\.\d+").expect("version tag pattern is valid"));

/// Score phrases, longest first, paired with their lower-cased form
static PHRASES_LONGEST_FIRST: Lazy<Vec<(String, ScoreKind)>> = Lazy::new(|| {
    let mut phrases: Vec<(String, ScoreKind)> = ScoreKind::ALL
        .iter()
        .map(|&kind| (kind.phrase().to_lowercase(), kind))
        .collect();
    // Stable sort keeps table order among equal lengths
    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    phrases
});

/// Find the longest score-kind phrase contained in `definition`
pub fn detect_score_kind(definition: &str) -> Option<ScoreKind> {
    let lowered = definition.to_lowercase();
    PHRASES_LONGEST_FIRST
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase.as_str()))
        .map(|&(_, kind)| kind)
}

/// Derive the instrument key from a definition
///
/// Removes the product prefix and every `v<digits>.<digits>` tag, then the
/// trailing score phrase if present.
pub fn extract_instrument_key(definition: &str) -> String {
    let without_prefix = definition.replace(PRODUCT_PREFIX, "");
    let without_version = VERSION_TAG.replace_all(&without_prefix, "");
    let trimmed = without_version.trim();

    let stripped = PHRASES_LONGEST_FIRST
        .iter()
        .find_map(|(phrase, _)| strip_suffix_ignore_case(trimmed, phrase))
        .unwrap_or(trimmed);

    stripped.trim().to_string()
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    let tail = s.get(split..)?;
    if tail.eq_ignore_ascii_case(suffix) {
        Some(&s[..split])
    } else {
        None
    }
}

/// Turn one dictionary row into a spec, or `None` if it has no score phrase
pub fn parse_row(variable: &str, definition: &str) -> Option<VariableSpec> {
    let variable = variable.trim();
    if variable.is_empty() {
        return None;
    }
    let score_kind = detect_score_kind(definition)?;
    Some(VariableSpec {
        target_variable: variable.to_string(),
        instrument_key: extract_instrument_key(definition),
        score_kind,
    })
}

/// Parsed data dictionary
#[derive(Debug, Clone, Default)]
pub struct DataDictionary {
    /// Extractable variables in dictionary row order
    ///
    /// A repeated name stays in the list; the output keeps its first column
    /// position and takes data from the last definition that yields any.
    pub specs: Vec<VariableSpec>,
    /// Rows without a recognised score phrase
    pub discarded: usize,
    /// Variable names repeated after their first definition
    pub duplicates: Vec<String>,
}

impl DataDictionary {
    /// Parse every row of a dictionary table
    ///
    /// The table must have the variable-name and definition columns; any
    /// row-level problem only discards that row.
    pub fn from_table(table: &Table) -> Result<Self> {
        let variable_idx = required_column(table, DICT_VARIABLE_COLUMN)?;
        let definition_idx = required_column(table, DICT_DEFINITION_COLUMN)?;

        let mut dictionary = DataDictionary::default();
        let mut seen = HashSet::new();

        for row in 0..table.len() {
            let variable = table.cell(row, variable_idx).unwrap_or("");
            let definition = table.cell(row, definition_idx).unwrap_or("");

            let Some(spec) = parse_row(variable, definition) else {
                dictionary.discarded += 1;
                continue;
            };

            if !seen.insert(spec.target_variable.clone()) {
                warn!(
                    variable = %spec.target_variable,
                    "Duplicate dictionary variable, later definition overrides"
                );
                dictionary.duplicates.push(spec.target_variable.clone());
            }

            debug!(
                variable = %spec.target_variable,
                instrument = %spec.instrument_key,
                score = spec.score_kind.column(),
                "Dictionary variable"
            );
            dictionary.specs.push(spec);
        }

        Ok(dictionary)
    }

    /// Number of distinct output variables
    pub fn variable_count(&self) -> usize {
        self.specs.len() - self.duplicates.len()
    }
}

fn required_column(table: &Table, column: &str) -> Result<usize> {
    table.column_index(column).ok_or_else(|| Error::MissingColumn {
        table: "dictionary".to_string(),
        column: column.to_string(),
    })
}
