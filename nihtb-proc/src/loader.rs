//! Export file discovery and loading
//!
//! Toolbox exports arrive as several CSV files per kind. They are found by
//! glob pattern, read in sorted path order, concatenated and deduplicated.

use nihtb_common::{Error, Result, Table};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Score export file pattern
pub const SCORES_PATTERN: &str = "ScoresExport*.csv";
/// Item-level export file pattern
pub const ITEMS_PATTERN: &str = "ItemExport*.csv";

/// Result of loading one kind of export
#[derive(Debug, Clone, Default)]
pub struct LoadedExport {
    pub table: Table,
    /// Files that were read, in load order
    pub files: Vec<PathBuf>,
    pub duplicates_removed: usize,
}

/// Files in `dir` matching `pattern`, sorted by path
pub fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }

    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full)
        .map_err(|e| Error::InvalidInput(format!("Bad file pattern {}: {}", full, e)))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Load every export matching `pattern` in `dir`
///
/// Unreadable files are logged and skipped. No matching files yields an
/// empty table.
pub fn load_exports(dir: &Path, pattern: &str) -> Result<LoadedExport> {
    let candidates = discover(dir, pattern)?;
    if candidates.is_empty() {
        warn!(dir = %dir.display(), pattern, "No export files found");
        return Ok(LoadedExport::default());
    }

    let mut tables = Vec::with_capacity(candidates.len());
    let mut files = Vec::with_capacity(candidates.len());
    for path in candidates {
        match Table::read_csv(&path) {
            Ok(table) => {
                debug!(file = %path.display(), rows = table.len(), "Loaded export");
                tables.push(table);
                files.push(path);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "Failed to read export, skipping"),
        }
    }

    let mut table = Table::concat(tables);
    let duplicates_removed = table.dedup();
    info!(
        files = files.len(),
        rows = table.len(),
        duplicates_removed,
        "Loaded {} export",
        pattern
    );

    Ok(LoadedExport {
        table,
        files,
        duplicates_removed,
    })
}
