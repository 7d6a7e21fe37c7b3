use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SansError {
    /// Malformed or missing model parameters. Raised at construction only.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed numeric input to an evaluation or sampling call.
    /// Rejected before any output is produced.
    #[error("invalid {name} = {value}: {reason}")]
    Domain {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The loaded scattering module does not report the expected identity.
    #[error("scattering module mismatch: expected '{expected}', loaded '{actual}'")]
    LibraryMismatch { expected: String, actual: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SansResult<T> = Result<T, SansError>;
