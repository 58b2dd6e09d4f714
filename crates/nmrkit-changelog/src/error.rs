use std::path::PathBuf;

use nmrkit_types::UnknownChangeKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChangelogError>;

#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("line {line}: malformed log line: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("line {line}: {source}")]
    UnknownKind {
        line: usize,
        #[source]
        source: UnknownChangeKind,
    },

    #[error("changelog input '{}' not found", path.display())]
    MissingInput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChangelogError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedLine {
            line,
            reason: reason.into(),
        }
    }

    /// 1-based line number of the offending record, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedLine { line, .. } | Self::UnknownKind { line, .. } => Some(*line),
            _ => None,
        }
    }
}
