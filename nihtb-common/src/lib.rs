//! # NIHTB Common Library
//!
//! Shared code for the NIH Toolbox processing tools:
//! - Error types
//! - Configuration file resolution and logging settings
//! - In-memory CSV table model and flat-file I/O

pub mod config;
pub mod error;
pub mod table;

pub use error::{Error, Result};
pub use table::Table;
