use std::path::PathBuf;

use nmrkit_types::UnsupportedPlatform;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ManifestError>;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatform),

    #[error("property '{key}' not found in classpath file")]
    MissingKey { key: String },

    #[error("classpath file '{}' not found", path.display())]
    MissingInput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
