//! Durable, append-only CSV sink for analysis records.
//!
//! One file per modality, schema fixed for the life of a session: a single
//! header row plus one row per analysis cycle. Initialization is idempotent
//! and never truncates existing data, so downstream readers can parse the
//! file incrementally while it is being appended to.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp format used in every sink column holding a time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record that can be rendered as one CSV row in header-column order.
pub trait SinkRecord: Send {
    fn csv_row(&self) -> Vec<String>;
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only CSV destination with a fixed header.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    header: &'static [&'static str],
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, header: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the destination with its header row if it does not exist yet.
    ///
    /// Safe to call repeatedly; an existing file is left untouched.
    pub fn ensure_initialized(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !self.path.exists() {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => writeln!(file, "{}", self.header.join(","))?,
                // Another writer created the file between the existence
                // check and the open; that writer owns the header.
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Append one record as a row in header-column order.
    ///
    /// If the file disappeared since initialization the header is written
    /// again first, mirroring `ensure_initialized`.
    pub fn append<R: SinkRecord>(&self, record: &R) -> Result<(), SinkError> {
        self.ensure_initialized()?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record.csv_row().join(","))?;
        Ok(())
    }
}
