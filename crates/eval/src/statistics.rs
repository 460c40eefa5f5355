use intent_corpus::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label distribution of an evaluated dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelStatistics {
    /// Utterances per label, first-seen label order.
    pub label_counts: Vec<(String, usize)>,
    /// Number of utterances keyed by how many labels they carry.
    pub labels_per_utterance: BTreeMap<usize, usize>,
    pub multi_label_utterances: Vec<String>,
    pub total_utterances: usize,
}

impl LabelStatistics {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let vocabulary = dataset.vocabulary();
        let mut counts = vec![0usize; vocabulary.len()];
        let mut stats = Self {
            total_utterances: dataset.len(),
            ..Self::default()
        };
        for entry in dataset {
            for label in entry.labels() {
                if let Some(position) = vocabulary.position(label) {
                    counts[position] += 1;
                }
            }
            *stats
                .labels_per_utterance
                .entry(entry.labels().len())
                .or_insert(0) += 1;
            if entry.labels().len() > 1 {
                stats.multi_label_utterances.push(entry.utterance().to_string());
            }
        }
        stats.label_counts = vocabulary
            .iter()
            .map(str::to_string)
            .zip(counts)
            .collect();
        stats
    }
}
