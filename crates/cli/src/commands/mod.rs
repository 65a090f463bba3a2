//! Subcommand implementations and their shared I/O.

pub mod allocate;
pub mod remote;
pub mod replay;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use stockroom_outbound::{AllocationError, ApiError, ConfigError, DraftError, StoreError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// An input file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing output failed.
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),

    /// Input or output JSON was malformed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The requested pack size is not offered by any issuable batch.
    #[error("Pack size {0} is not available; choose one of {1:?}")]
    PackSize(u32, Vec<u32>),

    /// No stock lines and no item to allocate for.
    #[error("No stock lines to allocate from")]
    NoStock,
}

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let text = std::fs::read_to_string(path).map_err(|source| CommandError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Write `value` to stdout as pretty JSON.
pub fn write_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
