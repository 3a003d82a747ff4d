//! Export organizer
//!
//! Builds one master file per export kind and splits it into per-subject
//! folders: `<output>/<PID>/<PID>_scores.csv` and `<PID>_items.csv`.

use crate::loader::{load_exports, ITEMS_PATTERN, SCORES_PATTERN};
use crate::types::SUBJECT_COLUMN;
use nihtb_common::{Error, Result, Table};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One kind of Toolbox export and where it is organized to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportKind {
    pub name: &'static str,
    pub pattern: &'static str,
    pub master_file: &'static str,
    pub subject_suffix: &'static str,
}

impl ExportKind {
    pub const SCORES: ExportKind = ExportKind {
        name: "scores",
        pattern: SCORES_PATTERN,
        master_file: "MASTER_SCORES-NIHTB.csv",
        subject_suffix: "_scores.csv",
    };

    pub const ITEMS: ExportKind = ExportKind {
        name: "items",
        pattern: ITEMS_PATTERN,
        master_file: "MASTER_ITEMS-NIHTB.csv",
        subject_suffix: "_items.csv",
    };

    pub const ALL: [ExportKind; 2] = [ExportKind::SCORES, ExportKind::ITEMS];

    pub fn master_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.master_file)
    }

    pub fn subject_path(&self, output_dir: &Path, subject_id: &str) -> PathBuf {
        output_dir
            .join(subject_id)
            .join(format!("{}{}", subject_id, self.subject_suffix))
    }
}

/// Per-kind outcome of an organize run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub kind: &'static str,
    pub source_files: usize,
    pub rows: usize,
    pub duplicates_removed: usize,
    /// `None` when there was nothing to write
    pub master_path: Option<PathBuf>,
    pub subjects: usize,
}

/// Trimmed subject id usable as a folder name, or `None`
pub fn clean_subject_id(raw: Option<&str>) -> Option<&str> {
    let id = raw?.trim();
    if id.is_empty() || id.eq_ignore_ascii_case("nan") {
        return None;
    }
    if id.contains(['/', '\\']) || id == "." || id == ".." {
        warn!(subject = id, "Subject id is not a valid folder name, skipping");
        return None;
    }
    Some(id)
}

/// Write the master table for `kind`
pub fn save_master(table: &Table, kind: &ExportKind, output_dir: &Path) -> Result<PathBuf> {
    let path = kind.master_path(output_dir);
    table.write_csv(&path)?;
    info!(path = %path.display(), rows = table.len(), "Saved master {} file", kind.name);
    Ok(path)
}

/// Split `table` by subject into per-subject files, overwriting existing ones
///
/// Returns the number of subjects written.
pub fn split_into_subject_folders(
    table: &Table,
    kind: &ExportKind,
    output_dir: &Path,
) -> Result<usize> {
    let subject_idx = table
        .column_index(SUBJECT_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            table: format!("{} export", kind.name),
            column: SUBJECT_COLUMN.to_string(),
        })?;

    let mut by_subject: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        if let Some(id) = clean_subject_id(row[subject_idx].as_deref()) {
            by_subject.entry(id).or_default().push(i);
        }
    }

    for (subject_id, indices) in &by_subject {
        let rows = indices.iter().map(|&i| table.rows()[i].clone()).collect();
        let subject_table = Table::from_rows(table.headers().to_vec(), rows)?;
        subject_table.write_csv(&kind.subject_path(output_dir, subject_id))?;
    }

    info!(subjects = by_subject.len(), "Updated {} files for subjects", kind.name);
    Ok(by_subject.len())
}

/// Load, merge and split one export kind
pub fn organize_kind(kind: &ExportKind, raw_dir: &Path, output_dir: &Path) -> Result<OrganizeSummary> {
    let loaded = load_exports(raw_dir, kind.pattern)?;

    let mut summary = OrganizeSummary {
        kind: kind.name,
        source_files: loaded.files.len(),
        rows: loaded.table.len(),
        duplicates_removed: loaded.duplicates_removed,
        master_path: None,
        subjects: 0,
    };

    if loaded.table.is_empty() {
        warn!(dir = %raw_dir.display(), "No {} data found", kind.name);
        return Ok(summary);
    }

    summary.master_path = Some(save_master(&loaded.table, kind, output_dir)?);
    summary.subjects = split_into_subject_folders(&loaded.table, kind, output_dir)?;
    Ok(summary)
}

/// Organize every export kind found in `raw_dir`
pub fn organize(raw_dir: &Path, output_dir: &Path) -> Result<Vec<OrganizeSummary>> {
    if !raw_dir.is_dir() {
        return Err(Error::NotFound(raw_dir.to_path_buf()));
    }
    std::fs::create_dir_all(output_dir)?;

    ExportKind::ALL
        .iter()
        .map(|kind| organize_kind(kind, raw_dir, output_dir))
        .collect()
}
