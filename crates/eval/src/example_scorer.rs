use crate::error::{ScorerError, ScorerResult};
use crate::scorer::{examples_to_dataset, Example, ScoreResult, Scorer, SnapshotScorer};
use async_trait::async_trait;
use intent_corpus::{read_snapshot, write_snapshot, Dataset, LabelIndex};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Nearest-example scorer: a label scores the best token-set Jaccard similarity between
/// the query and any of its examples.
#[derive(Debug, Clone, Default)]
pub struct ExampleScorer {
    examples: Dataset,
    labels: LabelIndex,
    tokens: HashMap<String, HashSet<String>>,
    ignore_same_example: bool,
}

impl ExampleScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut scorer = Self::new();
        for entry in dataset {
            for label in entry.labels() {
                scorer.insert(entry.utterance(), label);
            }
        }
        log::debug!(
            "Example scorer holds {} utterances across {} labels",
            scorer.examples.len(),
            scorer.labels.len()
        );
        scorer
    }

    pub fn dataset(&self) -> &Dataset {
        &self.examples
    }

    pub fn ignores_same_example(&self) -> bool {
        self.ignore_same_example
    }

    fn insert(&mut self, utterance: &str, label: &str) -> bool {
        self.labels.insert(label);
        if !self.tokens.contains_key(utterance) {
            self.tokens.insert(utterance.to_string(), tokenize(utterance));
        }
        let known = self
            .examples
            .get(utterance)
            .is_some_and(|entry| entry.has_label(label));
        self.examples.insert(utterance, label);
        !known
    }

    fn forget_missing_utterances(&mut self) {
        let examples = &self.examples;
        self.tokens
            .retain(|utterance, _| examples.contains(utterance));
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[async_trait]
impl Scorer for ExampleScorer {
    fn labels(&self) -> Vec<String> {
        self.labels.labels().to_vec()
    }

    fn examples(&self) -> Vec<Example> {
        self.examples
            .iter()
            .map(|entry| Example::new(entry.utterance(), entry.labels().iter().cloned()))
            .collect()
    }

    fn add_example(&mut self, example: &Example) -> ScorerResult<bool> {
        let utterance = example.utterance.trim();
        if utterance.is_empty() || example.labels.iter().all(|label| label.is_empty()) {
            return Err(ScorerError::Rejected {
                utterance: example.utterance.clone(),
                labels: example.labels.clone(),
            });
        }
        let mut added = false;
        for label in example.labels.iter().filter(|label| !label.is_empty()) {
            added |= self.insert(utterance, label);
        }
        Ok(added)
    }

    fn remove_example(&mut self, example: &Example) -> ScorerResult<bool> {
        let utterance = example.utterance.trim();
        let mut removed = false;
        for label in &example.labels {
            removed |= self.examples.remove(utterance, label);
        }
        self.forget_missing_utterances();
        Ok(removed)
    }

    fn remove_label(&mut self, label: &str) -> ScorerResult<bool> {
        if !self.labels.contains(label) {
            return Ok(false);
        }
        self.examples.remove_label(label);
        self.labels = LabelIndex::from_labels(self.labels.iter().filter(|known| *known != label));
        self.forget_missing_utterances();
        Ok(true)
    }

    async fn score(&self, utterance: &str) -> ScorerResult<Vec<ScoreResult>> {
        let utterance = utterance.trim();
        let query = tokenize(utterance);
        let mut best: Vec<Option<(f64, &str)>> = vec![None; self.labels.len()];

        for entry in &self.examples {
            if self.ignore_same_example && entry.utterance() == utterance {
                continue;
            }
            let Some(tokens) = self.tokens.get(entry.utterance()) else {
                continue;
            };
            let similarity = jaccard(&query, tokens);
            for label in entry.labels() {
                let Some(position) = self.labels.position(label) else {
                    continue;
                };
                let slot = &mut best[position];
                if slot.map_or(true, |(score, _)| similarity > score) {
                    *slot = Some((similarity, entry.utterance()));
                }
            }
        }

        let mut results: Vec<ScoreResult> = self
            .labels
            .iter()
            .zip(best)
            .map(|(label, best)| ScoreResult {
                label: label.to_string(),
                score: best.map_or(0.0, |(score, _)| score),
                closest_text: best.map(|(_, text)| text.to_string()),
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }

    fn create_snapshot(&self) -> ScorerResult<Vec<u8>> {
        write_snapshot(&self.examples)
            .map(String::into_bytes)
            .map_err(|err| ScorerError::Snapshot(err.to_string()))
    }

    fn set_ignore_same_example(&mut self, ignore: bool) {
        self.ignore_same_example = ignore;
    }
}

impl SnapshotScorer for ExampleScorer {
    fn from_snapshot(bytes: &[u8]) -> ScorerResult<Self> {
        let text =
            std::str::from_utf8(bytes).map_err(|err| ScorerError::Snapshot(err.to_string()))?;
        let dataset = read_snapshot(text).map_err(|err| ScorerError::Snapshot(err.to_string()))?;
        Ok(Self::from_dataset(&dataset))
    }
}

impl From<&[Example]> for ExampleScorer {
    fn from(examples: &[Example]) -> Self {
        Self::from_dataset(&examples_to_dataset(examples))
    }
}
