//! Long-format export records
//!
//! Converts the loaded scores table into typed records: one per task
//! administration, in load order, with the timestamp parsed and the visit
//! label normalized.

use crate::dates::DateNormalizer;
use crate::matcher::InstrumentLabelSet;
use crate::types::{ScoreKind, INSTRUMENT_COLUMN, SUBJECT_COLUMN, VISIT_LABEL_COLUMN};
use chrono::{DateTime, NaiveDate, Utc};
use nihtb_common::{Error, Result, Table};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

/// Built-in visit label spellings → canonical label
const BUILTIN_VISIT_LABELS: &[(&str, &str)] = &[
    ("Assessment 1", "Baseline"),
    ("Assessment1", "Baseline"),
    ("assessment 1", "Baseline"),
    ("Visit 1", "Baseline"),
];

/// Exact-match replacement table for visit labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitLabelMap {
    map: HashMap<String, String>,
}

impl Default for VisitLabelMap {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VisitLabelMap {
    pub fn builtin() -> Self {
        Self {
            map: BUILTIN_VISIT_LABELS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// Add or override mappings from configuration
    pub fn with_extra(mut self, extra: &BTreeMap<String, String>) -> Self {
        for (from, to) in extra {
            self.map.insert(from.clone(), to.clone());
        }
        self
    }

    /// Canonical form of `label`; unknown labels pass through unchanged
    pub fn normalize(&self, label: &str) -> String {
        self.map
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

/// One task administration
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    /// Row position in load order
    pub position: usize,
    pub subject_id: Option<String>,
    pub instrument_label: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub visit_date: Option<NaiveDate>,
    pub visit_label: Option<String>,
    pub scores: HashMap<ScoreKind, String>,
}

/// Typed view of the scores export
#[derive(Debug, Clone, Default)]
pub struct LongTable {
    pub records: Vec<LongRecord>,
    /// Timestamp column in use; `None` disables date grouping
    pub date_column: Option<String>,
    /// Visit label column in use
    pub visit_column: Option<String>,
    /// Score columns present in the export
    pub score_columns: BTreeSet<ScoreKind>,
}

impl LongTable {
    /// Build records from a loaded export table
    ///
    /// The subject and instrument columns are required. A missing timestamp
    /// or visit column only reduces what the output can contain.
    pub fn from_table(
        table: &Table,
        dates: &DateNormalizer,
        visit_labels: &VisitLabelMap,
    ) -> Result<Self> {
        let subject_idx = required_column(table, SUBJECT_COLUMN)?;
        let instrument_idx = required_column(table, INSTRUMENT_COLUMN)?;

        let date_column = dates.select_column(table);
        match &date_column {
            Some(column) => info!("Normalizing timestamps in column '{}'", column),
            None => warn!(
                "No timestamp column found; grouping by subject only, without visit dates"
            ),
        }
        let date_idx = date_column.as_deref().and_then(|c| table.column_index(c));

        let visit_column = table
            .has_column(VISIT_LABEL_COLUMN)
            .then(|| VISIT_LABEL_COLUMN.to_string());
        if visit_column.is_none() {
            info!("No visit label column found; eventname will be omitted");
        }
        let visit_idx = table.column_index(VISIT_LABEL_COLUMN);

        let score_idx: Vec<(ScoreKind, usize)> = ScoreKind::ALL
            .iter()
            .filter_map(|&kind| table.column_index(kind.column()).map(|i| (kind, i)))
            .collect();

        let mut unparsed_dates = 0usize;
        let mut records = Vec::with_capacity(table.len());
        for (position, row) in table.rows().iter().enumerate() {
            let cell = move |idx: usize| row[idx].as_deref();

            let timestamp = date_idx.and_then(cell).and_then(DateNormalizer::parse_timestamp);
            if date_idx.and_then(cell).is_some() && timestamp.is_none() {
                unparsed_dates += 1;
            }

            let scores = score_idx
                .iter()
                .filter_map(|&(kind, idx)| cell(idx).map(|v| (kind, v.to_string())))
                .collect();

            records.push(LongRecord {
                position,
                subject_id: cell(subject_idx)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                instrument_label: cell(instrument_idx).map(str::to_string),
                timestamp,
                visit_date: timestamp.map(|t| t.date_naive()),
                visit_label: visit_idx
                    .and_then(cell)
                    .map(|label| visit_labels.normalize(label)),
                scores,
            });
        }

        if unparsed_dates > 0 {
            warn!(
                count = unparsed_dates,
                "Timestamps could not be parsed and were treated as missing"
            );
        }

        Ok(Self {
            records,
            date_column,
            visit_column,
            score_columns: score_idx.iter().map(|&(kind, _)| kind).collect(),
        })
    }

    pub fn date_grouping(&self) -> bool {
        self.date_column.is_some()
    }

    pub fn has_score_column(&self, kind: ScoreKind) -> bool {
        self.score_columns.contains(&kind)
    }

    /// Distinct non-missing instrument labels
    pub fn instrument_labels(&self) -> InstrumentLabelSet {
        self.records
            .iter()
            .filter_map(|r| r.instrument_label.as_deref())
            .collect()
    }
}

fn required_column(table: &Table, column: &str) -> Result<usize> {
    table.column_index(column).ok_or_else(|| Error::MissingColumn {
        table: "scores export".to_string(),
        column: column.to_string(),
    })
}
