//! In-memory CSV table
//!
//! A `Table` is a header plus rows of optional cells. Empty cells and the
//! usual spreadsheet NA markers load as `None`, and `None` is written back
//! as an empty cell.

use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Cell values treated as missing on load
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#NA", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A rectangular table of optional string cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create an empty table with the given header
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from owned rows, validating row widths
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell value at (row, column); `None` when missing or out of range
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Append a row; its width must match the header
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::InvalidInput(format!(
                "Row has {} cells, header has {}",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Remove exact-duplicate rows, keeping the first occurrence
    ///
    /// Returns the number of rows removed.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Concatenate tables in order, taking the union of their columns
    ///
    /// Columns appear in first-seen order. Cells for columns a source table
    /// lacks are missing.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut headers: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for header in &table.headers {
                if !positions.contains_key(header) {
                    positions.insert(header.clone(), headers.len());
                    headers.push(header.clone());
                }
            }
        }

        let width = headers.len();
        let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for table in tables {
            let mapping: Vec<usize> = table.headers.iter().map(|h| positions[h]).collect();
            for row in table.rows {
                let mut out = vec![None; width];
                for (value, &target) in row.into_iter().zip(&mapping) {
                    out[target] = value;
                }
                rows.push(out);
            }
        }

        Table { headers, rows }
    }

    /// Read a CSV file with a header row
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read CSV from any reader
    ///
    /// Short rows are padded with missing cells; rows wider than the header
    /// are rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        if let Some(first) = headers.first_mut() {
            *first = first.trim_start_matches('\u{feff}').to_string();
        }

        let width = headers.len();
        let mut table = Self::new(headers);
        for (index, record) in csv_reader.byte_records().enumerate() {
            let record = record?;
            if record.len() > width {
                return Err(Error::InvalidInput(format!(
                    "Data row {} has {} fields, header has {}",
                    index + 1,
                    record.len(),
                    width
                )));
            }
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|field| parse_cell(&String::from_utf8_lossy(field)))
                .collect();
            row.resize(width, None);
            table.rows.push(row);
        }

        Ok(table)
    }

    /// Write CSV to any writer; missing cells become empty
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write a CSV file atomically (temporary sibling + rename)
    ///
    /// Parent directories are created as needed.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_sibling(path);
        let result = File::create(&temp_path)
            .map_err(Error::from)
            .and_then(|file| self.to_writer(file));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}

fn parse_cell(raw: &str) -> Option<String> {
    if NA_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| parse_cell(v)).collect()
    }

    #[test]
    fn test_read_marks_empty_and_na_as_missing() {
        let data = "PID,RawScore,TScore\n101,85,\n102,NA,50\n";
        let table = Table::from_reader(data.as_bytes()).unwrap();

        assert_eq!(table.headers(), &["PID", "RawScore", "TScore"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), Some("85"));
        assert_eq!(table.cell(0, 2), None);
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(table.cell(1, 2), Some("50"));
    }

    #[test]
    fn test_read_strips_bom_and_pads_short_rows() {
        let data = "\u{feff}PID,RawScore\n101\n";
        let table = Table::from_reader(data.as_bytes()).unwrap();

        assert_eq!(table.headers()[0], "PID");
        assert_eq!(table.rows()[0], vec![Some("101".to_string()), None]);
    }

    #[test]
    fn test_read_rejects_wide_rows() {
        let data = "PID\n101,extra\n";
        assert!(matches!(
            Table::from_reader(data.as_bytes()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_concat_unions_columns_in_first_seen_order() {
        let a = Table::from_rows(
            vec!["PID".into(), "RawScore".into()],
            vec![cells(&["101", "85"])],
        )
        .unwrap();
        let b = Table::from_rows(
            vec!["PID".into(), "Theta".into()],
            vec![cells(&["102", "0.5"])],
        )
        .unwrap();

        let combined = Table::concat(vec![a, b]);

        assert_eq!(combined.headers(), &["PID", "RawScore", "Theta"]);
        assert_eq!(combined.rows()[0], cells(&["101", "85", ""]));
        assert_eq!(combined.rows()[1], cells(&["102", "", "0.5"]));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut table = Table::from_rows(
            vec!["PID".into(), "RawScore".into()],
            vec![
                cells(&["101", "85"]),
                cells(&["102", "90"]),
                cells(&["101", "85"]),
            ],
        )
        .unwrap();

        assert_eq!(table.dedup(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0), Some("102"));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(vec!["A".into()]);
        assert!(table.push_row(cells(&["1", "2"])).is_err());
    }

    #[test]
    fn test_writer_emits_blank_for_missing() {
        let table = Table::from_rows(
            vec!["PID".into(), "RawScore".into()],
            vec![cells(&["101", ""])],
        )
        .unwrap();

        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "PID,RawScore\n101,\n");
    }
}
