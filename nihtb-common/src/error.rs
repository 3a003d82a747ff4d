//! Common error types for NIHTB processing

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for NIHTB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the NIHTB tools
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse or write error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required input file not found
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Input table lacks a column it cannot be processed without
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    /// Invalid user input or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
