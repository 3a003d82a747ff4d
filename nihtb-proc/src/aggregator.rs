//! Long → per-group aggregation
//!
//! Every resolved variable becomes a series keyed by subject (and visit date
//! when date grouping is active). Within a group one value survives,
//! selected by the configured [`TieBreak`] rule. Records with a missing
//! value never win over records that have one.

use crate::records::{LongRecord, LongTable};
use crate::types::ScoreKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Output row key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub subject_id: String,
    /// `None` when date grouping is inactive
    pub date: Option<NaiveDate>,
}

/// Group key → selected value (`None` when no record had one)
pub type Series = BTreeMap<GroupKey, Option<String>>;

/// Rule choosing the surviving value within a group
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Last record in load order
    #[default]
    LoadOrder,
    /// Record with the latest administration timestamp, then load order
    LatestTimestamp,
}

/// Ordering key: higher wins
type Rank = (Option<DateTime<Utc>>, usize);

/// Aggregates a [`LongTable`] into per-variable series
pub struct Aggregator<'a> {
    table: &'a LongTable,
    tie_break: TieBreak,
}

impl<'a> Aggregator<'a> {
    pub fn new(table: &'a LongTable, tie_break: TieBreak) -> Self {
        Self { table, tie_break }
    }

    /// Series for one score kind over records with one of `labels`
    ///
    /// Empty when the export has no column for `kind`.
    pub fn aggregate(&self, labels: &[String], kind: ScoreKind) -> Series {
        if !self.table.has_score_column(kind) {
            debug!(column = kind.column(), "Score column absent from export");
            return Series::new();
        }

        let wanted: HashSet<&str> = labels.iter().map(String::as_str).collect();
        let matching = self.table.records.iter().filter(|r| {
            r.instrument_label
                .as_deref()
                .is_some_and(|label| wanted.contains(label))
        });

        self.collect(matching, |r| r.scores.get(&kind).map(String::as_str))
    }

    /// Visit label series over all records, `None` without a visit column
    pub fn visit_labels(&self) -> Option<Series> {
        self.table.visit_column.as_ref()?;
        Some(self.collect(self.table.records.iter(), |r| r.visit_label.as_deref()))
    }

    /// Group key of a record; `None` when it belongs to no group
    fn group_key(&self, record: &LongRecord) -> Option<GroupKey> {
        let subject_id = record.subject_id.clone()?;
        let date = if self.table.date_grouping() {
            Some(record.visit_date?)
        } else {
            None
        };
        Some(GroupKey { subject_id, date })
    }

    fn rank(&self, record: &LongRecord) -> Rank {
        match self.tie_break {
            TieBreak::LoadOrder => (None, record.position),
            TieBreak::LatestTimestamp => (record.timestamp, record.position),
        }
    }

    fn collect<'r, I, F>(&self, records: I, value: F) -> Series
    where
        I: Iterator<Item = &'r LongRecord>,
        F: Fn(&'r LongRecord) -> Option<&'r str>,
    {
        let mut best: BTreeMap<GroupKey, Option<(Rank, &'r str)>> = BTreeMap::new();

        for record in records {
            let Some(key) = self.group_key(record) else {
                continue;
            };
            let slot = best.entry(key).or_insert(None);
            if let Some(v) = value(record) {
                let rank = self.rank(record);
                if slot.map_or(true, |(current, _)| rank > current) {
                    *slot = Some((rank, v));
                }
            }
        }

        best.into_iter()
            .map(|(key, chosen)| (key, chosen.map(|(_, v)| v.to_string())))
            .collect()
    }
}
