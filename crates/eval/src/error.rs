use intent_corpus::CorpusError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

pub type ScorerResult<T> = std::result::Result<T, ScorerError>;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Cannot evaluate an empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Scorer error: {0}")]
    Scorer(#[from] ScorerError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("Index {index} is out of range for {bucket} ({len} entries)")]
    IndexOutOfRange {
        bucket: String,
        index: usize,
        len: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No evaluation report is available; run validate first")]
    NoReport,

    #[error("No utterance is selected")]
    NoUtterance,
}

/// Failures reported by a [`Scorer`](crate::Scorer).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScorerError {
    #[error("Scoring '{utterance}' failed: {message}")]
    Failed { utterance: String, message: String },

    #[error("Non-finite score for label '{label}' on '{utterance}'")]
    InvalidScore { utterance: String, label: String },

    #[error("Example '{utterance}' with labels {labels:?} was rejected")]
    Rejected {
        utterance: String,
        labels: Vec<String>,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
