use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input path: {0}")]
    InvalidPath(String),

    #[error("{} has invalid extension - {supported} files are supported", path.display())]
    UnsupportedExtension { path: PathBuf, supported: String },

    #[error("Failed parsing {}{}: {message}", path.display(), line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No utterance was found in {}", path.display())]
    EmptyDataset { path: PathBuf },

    #[error("Cannot write {kind} {value:?} as a tab-separated row: {reason}")]
    Unrepresentable {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Label '{0}' appears more than once in a unique label list")]
    DuplicateLabel(String),
}

impl CorpusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
