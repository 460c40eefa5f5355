//! # Intent Corpus
//!
//! Ingestion and label bookkeeping for intent-labelled utterance corpora.
//!
//! ## Pipeline
//!
//! ```text
//! File or directory
//!     │
//!     ├──> Format adapters (.lu, .qna, .json, .tsv/.txt, .blu)
//!     │      └─> Records
//!     │
//!     ├──> Ingestor (visited set, label folding)
//!     │      └─> Dataset
//!     │
//!     └──> Normalizer (blocklist or allow-set)
//!            └─> Dataset with UNKNOWN fallbacks
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use intent_corpus::{ingest, write_snapshot, IngestOptions};
//!
//! fn main() -> intent_corpus::Result<()> {
//!     let dataset = ingest("corpus/", IngestOptions::default())?;
//!     let vocabulary = dataset.vocabulary();
//!
//!     println!("{} utterances, {} labels", dataset.len(), vocabulary.len());
//!     std::fs::write("train.blu", write_snapshot(&dataset)?).ok();
//!     Ok(())
//! }
//! ```

mod dataset;
mod error;
mod format;
mod ingest;
mod label_index;
mod normalize;
mod snapshot;
mod stats;

pub use dataset::{Assignment, Dataset, EntityLabel, UtteranceLabelSet, UNKNOWN_LABEL};
pub use error::{CorpusError, Result};
pub use format::{Import, Parsed, Record, SourceFormat, TabularShape, SUPPORTED_EXTENSIONS};
pub use ingest::{ingest, ingest_raw, IngestOptions, Ingestor};
pub use label_index::LabelIndex;
pub use normalize::{normalize, NormalizeMode, PLACEHOLDER_LABELS};
pub use snapshot::{
    load_snapshot, read_snapshot, save_snapshot, write_label_utterances, write_snapshot,
    write_tsv, SNAPSHOT_HEADER,
};
pub use stats::IngestStats;
