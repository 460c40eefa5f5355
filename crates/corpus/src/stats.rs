use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics about an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of files folded into the dataset
    pub files: usize,

    /// Files seen during a directory walk but not folded (unsupported or already processed)
    pub skipped: usize,

    /// `(utterance, label)` pairs folded
    pub pairs: usize,

    /// Assignments of a label an utterance already had
    pub repeats: usize,

    /// Entity spans attached
    pub entities: usize,

    /// Files per format
    pub formats: BTreeMap<String, usize>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, format: &str) {
        self.files += 1;
        *self.formats.entry(format.to_string()).or_insert(0) += 1;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }
}
