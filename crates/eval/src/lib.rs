//! # Intent Eval
//!
//! Evaluation of intent classifiers against labelled corpora.
//!
//! ## Pipeline
//!
//! ```text
//! Dataset + LabelIndex
//!     │
//!     ├──> Scorer (one awaited call per utterance)
//!     │      └─> Ranked label scores
//!     │
//!     ├──> Engine (thresholds)
//!     │      └─> PredictionRecords in report buckets
//!     │
//!     └──> Confusion matrix
//!            └─> Per-label, macro and micro metrics
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use intent_corpus::load_snapshot;
//! use intent_eval::{evaluate, ExampleScorer, Scorer, Thresholds};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = load_snapshot("train.blu")?;
//!     let mut scorer = ExampleScorer::from_dataset(&dataset);
//!     scorer.set_ignore_same_example(true);
//!
//!     let report = evaluate(&dataset.vocabulary(), &dataset, &scorer, &Thresholds::default()).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

mod config;
mod confusion;
mod engine;
mod error;
mod example_scorer;
mod report;
mod scorer;
mod session;
mod statistics;

pub use config::{
    Thresholds, DEFAULT_AMBIGUOUS_CLOSENESS, DEFAULT_LOW_CONFIDENCE, DEFAULT_MULTI_LABEL,
    DEFAULT_UNKNOWN_LABEL,
};
pub use confusion::{AverageMetrics, ConfusionMatrix, LabelCounts, LabelMetrics};
pub use engine::{evaluate, EvaluationCategory, PredictionRecord};
pub use error::{EvalError, Result, ScorerError, ScorerResult};
pub use example_scorer::ExampleScorer;
pub use report::{Bucket, EvaluationReport};
pub use scorer::{examples_to_dataset, Example, ScoreResult, Scorer, SnapshotScorer};
pub use session::PredictSession;
pub use statistics::LabelStatistics;
