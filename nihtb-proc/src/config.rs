//! Configuration for the `nihtb` tool
//!
//! Settings come from an optional TOML file, overridden by command-line
//! flags. Every key has a built-in default, so the tool runs with no file
//! at all.
//!
//! ```toml
//! raw_data_dir = "datadump"
//! output_dir = "processed_subject_data"
//! dictionary_path = "DataDictionary_NIHTB-COGNITION.csv"
//! output_path = "Data-Full_NDAFormat.csv"
//! tie_break = "load-order"
//!
//! [logging]
//! level = "info"
//!
//! [aliases]
//! "Visual Reasoning" = ["Visual Reasoning v3.2"]
//!
//! [visit_labels]
//! "Visit 2" = "Year 1"
//! ```

use crate::aggregator::TieBreak;
use crate::matcher::AliasTable;
use crate::organizer::ExportKind;
use crate::pipeline::FormatOptions;
use crate::records::VisitLabelMap;
use nihtb_common::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Application name used for the user config directory
pub const APP_NAME: &str = "nihtb";

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcConfig {
    /// Folder holding the raw `ScoresExport*.csv` / `ItemExport*.csv` files
    pub raw_data_dir: PathBuf,

    /// Folder receiving master files and subject folders
    pub output_dir: PathBuf,

    /// NDA data dictionary (`Variable_Name`, `definition`)
    pub dictionary_path: PathBuf,

    /// Long-format scores input for `format`
    ///
    /// Default: the master scores file inside `output_dir`
    pub scores_master: Option<PathBuf>,

    /// Wide-format output file
    pub output_path: PathBuf,

    pub tie_break: TieBreak,

    pub logging: LoggingConfig,

    /// Extra instrument aliases: canonical key → accepted labels
    pub aliases: BTreeMap<String, Vec<String>>,

    /// Extra visit label mappings: observed label → canonical label
    pub visit_labels: BTreeMap<String, String>,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("datadump"),
            output_dir: PathBuf::from("processed_subject_data"),
            dictionary_path: PathBuf::from("DataDictionary_NIHTB-COGNITION.csv"),
            scores_master: None,
            output_path: PathBuf::from("Data-Full_NDAFormat.csv"),
            tie_break: TieBreak::default(),
            logging: LoggingConfig::default(),
            aliases: BTreeMap::new(),
            visit_labels: BTreeMap::new(),
        }
    }
}

impl ProcConfig {
    /// Scores input for `format`
    pub fn scores_master_path(&self) -> PathBuf {
        self.scores_master
            .clone()
            .unwrap_or_else(|| ExportKind::SCORES.master_path(&self.output_dir))
    }

    /// Conversion options with configured aliases and visit labels merged
    /// over the built-in tables
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            tie_break: self.tie_break,
            aliases: AliasTable::builtin().with_extra(&self.aliases),
            visit_labels: VisitLabelMap::builtin().with_extra(&self.visit_labels),
            ..FormatOptions::default()
        }
    }
}
