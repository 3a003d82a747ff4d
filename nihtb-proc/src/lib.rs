//! # nihtb-proc
//!
//! Processing for NIH Toolbox cognition exports:
//! - `organize`: merge raw exports into master files and per-subject folders
//! - `format`: convert long-format scores into the NDA wide layout defined by
//!   a data dictionary
//! - `verify`: check subject folders against the master files

pub mod aggregator;
pub mod assembler;
pub mod config;
pub mod dates;
pub mod dictionary;
pub mod loader;
pub mod logging;
pub mod matcher;
pub mod organizer;
pub mod pipeline;
pub mod records;
pub mod types;
pub mod verifier;

pub use aggregator::{GroupKey, Series, TieBreak};
pub use assembler::WideTable;
pub use config::ProcConfig;
pub use pipeline::{format_tables, run_format, FormatOptions, FormatOutcome, MatchReport};
