use crate::error::ScorerResult;
use async_trait::async_trait;
use intent_corpus::Dataset;
use serde::{Deserialize, Serialize};

/// Utterance with the labels a scorer learns it under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Example {
    pub utterance: String,
    pub labels: Vec<String>,
}

impl Example {
    pub fn new<I, S>(utterance: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            utterance: utterance.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// One `(label, score)` pair returned by a scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub label: String,
    pub score: f64,
    /// Training utterance that produced the score, when the scorer knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_text: Option<String>,
}

impl ScoreResult {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            closest_text: None,
        }
    }
}

/// External classifier consulted by the evaluation engine.
///
/// Mutating calls take `&mut self`, so they cannot interleave with an evaluation pass
/// that borrows the scorer.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Label vocabulary, in the scorer's own order.
    fn labels(&self) -> Vec<String>;

    fn examples(&self) -> Vec<Example>;

    /// Returns `false` when the scorer already knew every label of the example.
    fn add_example(&mut self, example: &Example) -> ScorerResult<bool>;

    /// Returns `false` when none of the example's labels were known for the utterance.
    fn remove_example(&mut self, example: &Example) -> ScorerResult<bool>;

    fn remove_label(&mut self, label: &str) -> ScorerResult<bool>;

    async fn score(&self, utterance: &str) -> ScorerResult<Vec<ScoreResult>>;

    fn create_snapshot(&self) -> ScorerResult<Vec<u8>>;

    /// Leave-one-out toggle: exclude an utterance's own example when scoring it.
    fn set_ignore_same_example(&mut self, _ignore: bool) {}
}

/// Scorers that can be rebuilt from [`Scorer::create_snapshot`] output.
pub trait SnapshotScorer: Scorer + Sized {
    fn from_snapshot(bytes: &[u8]) -> ScorerResult<Self>;
}

/// Fold scorer examples into a dataset, preserving example order.
pub fn examples_to_dataset(examples: &[Example]) -> Dataset {
    let mut dataset = Dataset::new();
    for example in examples {
        for label in &example.labels {
            dataset.insert(&example.utterance, label);
        }
    }
    dataset
}
