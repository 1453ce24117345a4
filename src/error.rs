use thiserror::Error;

use crate::sensitivity::SensitivityError;

/// Crate-wide error for the fallible edges: settings, history and conversion.
#[derive(Debug, Error)]
pub enum AimError {
    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),
}

pub type AimResult<T> = Result<T, AimError>;
