use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a statistics report
#[derive(Error, Debug)]
pub enum Error {
    /// The report path does not exist
    #[error("report not found: {0}")]
    ReportNotFound(PathBuf),

    /// The report exists but could not be read
    #[error("failed to read report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
