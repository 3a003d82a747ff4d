//! Wide-table assembly
//!
//! Outer-joins the per-variable series on their group keys. Every group
//! present in any series (or in the visit label series) becomes one row,
//! ordered by subject then date.

use crate::aggregator::{GroupKey, Series};
use crate::dates::format_date;
use crate::types::{OUT_DATE_COLUMN, OUT_SUBJECT_COLUMN, OUT_VISIT_COLUMN};
use nihtb_common::{Result, Table};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// One dictionary variable with its aggregated values
///
/// `series` is `None` when the variable has no data source: its instrument
/// did not resolve or the export lacks its score column. The column is
/// still emitted, blank.
#[derive(Debug, Clone)]
pub struct VariableColumn {
    pub name: String,
    pub series: Option<Series>,
}

/// The assembled output: every cell is present, missing data is `""`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WideTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Value of `column` in the first row whose subject is `subject_id`
    pub fn value(&self, subject_id: &str, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.first().map(String::as_str) == Some(subject_id))
            .map(|row| row[col].as_str())
    }

    /// Convert into a [`Table`] for writing (empty cells become missing)
    pub fn into_table(self) -> Result<Table> {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| (!cell.is_empty()).then_some(cell))
                    .collect()
            })
            .collect();
        Table::from_rows(self.headers, rows)
    }
}

/// Builds the wide table from aggregated series
#[derive(Debug, Default)]
pub struct OutputAssembler {
    date_grouping: bool,
    visit_labels: Option<Series>,
    columns: Vec<VariableColumn>,
}

impl OutputAssembler {
    pub fn new(date_grouping: bool, visit_labels: Option<Series>) -> Self {
        Self {
            date_grouping,
            visit_labels,
            columns: Vec::new(),
        }
    }

    /// Append a variable column in dictionary order
    ///
    /// A repeated name keeps its first position; its values are replaced
    /// when the later column has a data source. Names clashing with an
    /// identifier column are dropped.
    pub fn push(&mut self, column: VariableColumn) {
        if self.reserved(&column.name) {
            warn!(variable = %column.name, "Variable clashes with an identifier column, dropped");
            return;
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => {
                if column.series.is_some() {
                    debug!(variable = %column.name, "Repeated variable, later definition fills the column");
                    existing.series = column.series;
                }
            }
            None => self.columns.push(column),
        }
    }

    fn reserved(&self, name: &str) -> bool {
        name == OUT_SUBJECT_COLUMN
            || (self.date_grouping && name == OUT_DATE_COLUMN)
            || (self.visit_labels.is_some() && name == OUT_VISIT_COLUMN)
    }

    pub fn assemble(self) -> WideTable {
        let mut headers = vec![OUT_SUBJECT_COLUMN.to_string()];
        if self.date_grouping {
            headers.push(OUT_DATE_COLUMN.to_string());
        }
        if self.visit_labels.is_some() {
            headers.push(OUT_VISIT_COLUMN.to_string());
        }
        headers.extend(self.columns.iter().map(|c| c.name.clone()));

        let keys = self.row_keys();
        debug!(rows = keys.len(), columns = headers.len(), "Assembling output table");

        let rows = keys
            .iter()
            .map(|key| {
                let mut row = Vec::with_capacity(headers.len());
                row.push(key.subject_id.clone());
                if self.date_grouping {
                    row.push(key.date.map(format_date).unwrap_or_default());
                }
                if let Some(visits) = &self.visit_labels {
                    row.push(lookup(visits, key));
                }
                for column in &self.columns {
                    row.push(column.series.as_ref().map(|s| lookup(s, key)).unwrap_or_default());
                }
                row
            })
            .collect();

        WideTable { headers, rows }
    }

    /// Union of every series' group keys, sorted
    fn row_keys(&self) -> BTreeSet<GroupKey> {
        let mut keys = BTreeSet::new();
        let series = self
            .columns
            .iter()
            .filter_map(|c| c.series.as_ref())
            .chain(self.visit_labels.as_ref());
        for s in series {
            keys.extend(s.keys().cloned());
        }
        keys
    }
}

fn lookup(series: &Series, key: &GroupKey) -> String {
    series.get(key).cloned().flatten().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(subject: &str, day: Option<u32>) -> GroupKey {
        GroupKey {
            subject_id: subject.to_string(),
            date: day.and_then(|d| NaiveDate::from_ymd_opt(2024, 3, d)),
        }
    }

    fn series(entries: &[(GroupKey, Option<&str>)]) -> Series {
        entries
            .iter()
            .map(|(k, v)| (k.clone(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_outer_join_keeps_every_group() {
        let mut assembler = OutputAssembler::new(true, None);
        assembler.push(VariableColumn {
            name: "flanker_raw".to_string(),
            series: Some(series(&[(key("101", Some(5)), Some("92"))])),
        });
        assembler.push(VariableColumn {
            name: "dccs_raw".to_string(),
            series: Some(series(&[(key("102", Some(6)), Some("7"))])),
        });

        let wide = assembler.assemble();
        assert_eq!(wide.headers, vec!["subjectkey", "interview_date", "flanker_raw", "dccs_raw"]);
        assert_eq!(
            wide.rows,
            vec![
                vec!["101", "03/05/2024", "92", ""],
                vec!["102", "03/06/2024", "", "7"],
            ]
        );
    }

    #[test]
    fn test_rows_sorted_by_subject_then_date() {
        let mut assembler = OutputAssembler::new(true, None);
        assembler.push(VariableColumn {
            name: "v".to_string(),
            series: Some(series(&[
                (key("200", Some(1)), Some("a")),
                (key("100", Some(9)), Some("b")),
                (key("100", Some(2)), Some("c")),
            ])),
        });

        let wide = assembler.assemble();
        let order: Vec<(&str, &str)> = wide
            .rows
            .iter()
            .map(|r| (r[0].as_str(), r[1].as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("100", "03/02/2024"), ("100", "03/09/2024"), ("200", "03/01/2024")]
        );
    }

    #[test]
    fn test_unresolved_column_blank_and_duplicates_collapse() {
        let mut assembler = OutputAssembler::new(false, None);
        assembler.push(VariableColumn {
            name: "a".to_string(),
            series: Some(series(&[(key("101", None), Some("1"))])),
        });
        assembler.push(VariableColumn {
            name: "missing".to_string(),
            series: None,
        });
        assembler.push(VariableColumn {
            name: "a".to_string(),
            series: Some(series(&[(key("101", None), Some("other"))])),
        });

        let wide = assembler.assemble();
        assert_eq!(wide.headers, vec!["subjectkey", "a", "missing"]);
        assert_eq!(wide.rows, vec![vec!["101", "other", ""]]);
        assert_eq!(wide.value("101", "missing"), Some(""));
    }

    #[test]
    fn test_repeated_name_without_source_keeps_earlier_values() {
        let mut assembler = OutputAssembler::new(false, None);
        assembler.push(VariableColumn {
            name: "a".to_string(),
            series: Some(series(&[(key("101", None), Some("1"))])),
        });
        assembler.push(VariableColumn {
            name: "a".to_string(),
            series: None,
        });

        let wide = assembler.assemble();
        assert_eq!(wide.headers, vec!["subjectkey", "a"]);
        assert_eq!(wide.rows, vec![vec!["101", "1"]]);
    }

    #[test]
    fn test_identifier_names_not_reused_by_variables() {
        let visits = series(&[(key("101", Some(5)), Some("Baseline"))]);
        let mut assembler = OutputAssembler::new(true, Some(visits));
        for name in ["subjectkey", "interview_date", "eventname"] {
            assembler.push(VariableColumn {
                name: name.to_string(),
                series: Some(series(&[(key("999", Some(1)), Some("x"))])),
            });
        }
        assembler.push(VariableColumn {
            name: "a".to_string(),
            series: Some(series(&[(key("101", Some(5)), Some("7"))])),
        });

        let wide = assembler.assemble();
        assert_eq!(wide.headers, vec!["subjectkey", "interview_date", "eventname", "a"]);
        assert_eq!(wide.rows, vec![vec!["101", "03/05/2024", "Baseline", "7"]]);
    }

    #[test]
    fn test_identifier_names_free_when_column_absent() {
        let mut assembler = OutputAssembler::new(false, None);
        assembler.push(VariableColumn {
            name: "eventname".to_string(),
            series: Some(series(&[(key("101", None), Some("Year 1"))])),
        });

        let wide = assembler.assemble();
        assert_eq!(wide.headers, vec!["subjectkey", "eventname"]);
        assert_eq!(wide.rows, vec![vec!["101", "Year 1"]]);
    }

    #[test]
    fn test_visit_label_column_after_date() {
        let visits = series(&[(key("101", Some(5)), Some("Baseline")), (key("103", Some(5)), None)]);
        let mut assembler = OutputAssembler::new(true, Some(visits));
        assembler.push(VariableColumn {
            name: "x".to_string(),
            series: Some(Series::new()),
        });

        let wide = assembler.assemble();
        assert_eq!(wide.headers, vec!["subjectkey", "interview_date", "eventname", "x"]);
        assert_eq!(wide.rows[0], vec!["101", "03/05/2024", "Baseline", ""]);
        assert_eq!(wide.rows[1], vec!["103", "03/05/2024", "", ""]);
    }

    #[test]
    fn test_into_table_marks_blanks_missing() {
        let wide = WideTable {
            headers: vec!["subjectkey".into(), "a".into()],
            rows: vec![vec!["101".into(), "".into()]],
        };
        let table = wide.into_table().unwrap();
        assert_eq!(table.cell(0, 0), Some("101"));
        assert_eq!(table.cell(0, 1), None);
    }
}
