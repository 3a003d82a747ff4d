//! Export verifier
//!
//! Checks that the per-subject files written by the organizer agree with
//! the master files they were split from.

use crate::organizer::ExportKind;
use crate::types::SUBJECT_COLUMN;
use nihtb_common::{Error, Result, Table};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Absolute tolerance for numeric cells
const ABS_TOLERANCE: f64 = 1e-8;
/// Relative tolerance for numeric cells
const REL_TOLERANCE: f64 = 1e-5;

/// Outcome of verifying one export kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub master_file: String,
    /// False when the master file was absent
    pub master_found: bool,
    pub subjects_verified: usize,
    pub mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Verify every subject folder in `output_dir` against the master for `kind`
pub fn verify_dataset(output_dir: &Path, kind: &ExportKind) -> Result<VerifyReport> {
    let mut report = VerifyReport {
        master_file: kind.master_file.to_string(),
        ..VerifyReport::default()
    };

    let master_path = kind.master_path(output_dir);
    if !master_path.exists() {
        info!("Skipping {}: master file not found", kind.master_file);
        return Ok(report);
    }
    report.master_found = true;

    let master = Table::read_csv(&master_path)?;
    let subject_idx = master
        .column_index(SUBJECT_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            table: kind.master_file.to_string(),
            column: SUBJECT_COLUMN.to_string(),
        })?;

    let mut master_rows: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, row) in master.rows().iter().enumerate() {
        if let Some(id) = row[subject_idx].as_deref().map(str::trim) {
            master_rows.entry(id).or_default().push(i);
        }
    }

    let mut subject_dirs: Vec<String> = std::fs::read_dir(output_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    subject_dirs.sort();
    info!(
        "Checking {} against {} subject folders",
        kind.master_file,
        subject_dirs.len()
    );

    for subject_id in &subject_dirs {
        let path = kind.subject_path(output_dir, subject_id);
        if !path.exists() {
            continue;
        }
        let subject = Table::read_csv(&path)?;
        let expected = master_rows
            .get(subject_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match compare_subject(&subject, &master, expected) {
            Ok(()) => {
                debug!(subject = %subject_id, "Subject file matches master");
                report.subjects_verified += 1;
            }
            Err(detail) => report.mismatches.push(format!("Subject {}: {}", subject_id, detail)),
        }
    }

    if report.is_ok() {
        info!(
            "Verified {} subjects for {}, all data matches",
            report.subjects_verified, kind.master_file
        );
    } else {
        warn!(
            "Found mismatches for {} subjects in {}",
            report.mismatches.len(),
            kind.master_file
        );
    }
    Ok(report)
}

/// Verify every export kind
pub fn verify_all(output_dir: &Path) -> Result<Vec<VerifyReport>> {
    if !output_dir.is_dir() {
        return Err(Error::NotFound(output_dir.to_path_buf()));
    }
    ExportKind::ALL
        .iter()
        .map(|kind| verify_dataset(output_dir, kind))
        .collect()
}

/// Compare a subject file with the master rows at `expected`
fn compare_subject(
    subject: &Table,
    master: &Table,
    expected: &[usize],
) -> std::result::Result<(), String> {
    if subject.len() != expected.len() {
        return Err(format!(
            "Row count mismatch (Individual: {}, Master: {})",
            subject.len(),
            expected.len()
        ));
    }

    let columns = subject
        .headers()
        .iter()
        .map(|h| master.column_index(h).ok_or_else(|| format!("Column '{}' missing from master", h)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (row, &master_row) in expected.iter().enumerate() {
        for (col, &master_col) in columns.iter().enumerate() {
            let ours = subject.cell(row, col);
            let theirs = master.cell(master_row, master_col);
            if !cells_equal(ours, theirs) {
                return Err(format!(
                    "Data mismatch at row {}, column '{}' (Individual: {:?}, Master: {:?})",
                    row,
                    subject.headers()[col],
                    ours,
                    theirs
                ));
            }
        }
    }
    Ok(())
}

/// Cell equality with numeric tolerance, so "1" equals "1.0"
pub fn cells_equal(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) if a == b => true,
        (Some(a), Some(b)) => match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
            (Ok(x), Ok(y)) => (x - y).abs() <= ABS_TOLERANCE + REL_TOLERANCE * y.abs(),
            _ => false,
        },
        _ => false,
    }
}
