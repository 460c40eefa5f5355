use crate::engine::PredictionRecord;
use intent_corpus::LabelIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-label confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl LabelCounts {
    /// Utterances carrying the label in their ground truth.
    #[must_use]
    pub fn support(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    /// Utterances the label was predicted for.
    #[must_use]
    pub fn predicted(&self) -> usize {
        self.true_positives + self.false_positives
    }

    /// The label occurred in a ground truth or a prediction at least once.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.support() + self.false_positives > 0
    }

    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.predicted())
    }

    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.support())
    }

    #[must_use]
    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }

    pub fn merge(&mut self, other: &LabelCounts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.true_negatives += other.true_negatives;
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub label: String,
    pub counts: LabelCounts,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Labels the average was taken over.
    pub labels: usize,
}

/// Per-label TP/FP/FN/TN counts folded over prediction records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: LabelIndex,
    counts: Vec<LabelCounts>,
    records: usize,
}

impl ConfusionMatrix {
    pub fn new(labels: &LabelIndex) -> Self {
        Self {
            labels: labels.clone(),
            counts: vec![LabelCounts::default(); labels.len()],
            records: 0,
        }
    }

    pub fn aggregate(labels: &LabelIndex, records: &[PredictionRecord]) -> Self {
        let mut matrix = Self::new(labels);
        for record in records {
            matrix.add(record);
        }
        matrix
    }

    /// Fold one record. Labels outside the matrix vocabulary are ignored.
    pub fn add(&mut self, record: &PredictionRecord) {
        let truth: HashSet<&str> = record
            .ground_truth_labels
            .iter()
            .map(String::as_str)
            .collect();
        let predicted: HashSet<&str> = record.predicted_labels.iter().map(String::as_str).collect();

        for label in truth.union(&predicted) {
            if !self.labels.contains(label) {
                log::debug!("Label '{label}' of '{}' is not in the matrix", record.utterance);
            }
        }

        for (label, counts) in self.labels.iter().zip(self.counts.iter_mut()) {
            match (truth.contains(label), predicted.contains(label)) {
                (true, true) => counts.true_positives += 1,
                (true, false) => counts.false_negatives += 1,
                (false, true) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
            }
        }
        self.records += 1;
    }

    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    /// Number of records folded in.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn counts(&self, label: &str) -> Option<LabelCounts> {
        self.labels
            .position(label)
            .and_then(|position| self.counts.get(position).copied())
    }

    pub fn metrics(&self) -> Vec<LabelMetrics> {
        self.labels
            .iter()
            .zip(&self.counts)
            .map(|(label, counts)| LabelMetrics {
                label: label.to_string(),
                counts: *counts,
                precision: counts.precision(),
                recall: counts.recall(),
                f1: counts.f1(),
            })
            .collect()
    }

    /// Unweighted mean over labels with at least one ground-truth or predicted occurrence.
    pub fn macro_average(&self) -> AverageMetrics {
        let active: Vec<&LabelCounts> = self.counts.iter().filter(|c| c.is_active()).collect();
        if active.is_empty() {
            return AverageMetrics::default();
        }
        let n = active.len() as f64;
        AverageMetrics {
            precision: active.iter().map(|c| c.precision()).sum::<f64>() / n,
            recall: active.iter().map(|c| c.recall()).sum::<f64>() / n,
            f1: active.iter().map(|c| c.f1()).sum::<f64>() / n,
            labels: active.len(),
        }
    }

    /// Metrics over counts pooled across every active label.
    pub fn micro_average(&self) -> AverageMetrics {
        let mut pooled = LabelCounts::default();
        let mut labels = 0;
        for counts in self.counts.iter().filter(|c| c.is_active()) {
            pooled.merge(counts);
            labels += 1;
        }
        AverageMetrics {
            precision: pooled.precision(),
            recall: pooled.recall(),
            f1: pooled.f1(),
            labels,
        }
    }

    /// Restrict the matrix to `subset`, keeping this matrix's label order.
    pub fn subset<I, S>(&self, subset: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = subset
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        let mut labels = LabelIndex::new();
        let mut counts = Vec::new();
        for (label, label_counts) in self.labels.iter().zip(&self.counts) {
            if wanted.contains(label) {
                labels.insert(label);
                counts.push(*label_counts);
            }
        }
        Self {
            labels,
            counts,
            records: self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EvaluationCategory;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn record(truth: &[&str], predicted: &[&str]) -> PredictionRecord {
        PredictionRecord {
            utterance: format!("{truth:?} -> {predicted:?}"),
            ground_truth_labels: truth.iter().map(|s| s.to_string()).collect(),
            ground_truth_indexes: Vec::new(),
            predicted_labels: predicted.iter().map(|s| s.to_string()).collect(),
            predicted_scores: vec![1.0; predicted.len()],
            predicted_indexes: Vec::new(),
            category: EvaluationCategory::TruePositive,
            scores: Vec::new(),
        }
    }

    fn labels() -> LabelIndex {
        LabelIndex::from_labels(["a", "b", "c", "d"])
    }

    #[test]
    fn counts_follow_the_union_rule() {
        let matrix = ConfusionMatrix::aggregate(
            &labels(),
            &[record(&["a"], &["a"]), record(&["a"], &["b"]), record(&["c"], &["a", "c"])],
        );
        assert_eq!(
            matrix.counts("a").unwrap(),
            LabelCounts {
                true_positives: 1,
                false_positives: 1,
                false_negatives: 1,
                true_negatives: 0,
            }
        );
        assert_eq!(matrix.counts("b").unwrap().false_positives, 1);
        assert_eq!(matrix.counts("b").unwrap().true_negatives, 2);
        assert_eq!(matrix.counts("c").unwrap().true_positives, 1);
        assert_eq!(matrix.counts("d").unwrap().true_negatives, 3);
        assert_eq!(matrix.records(), 3);
    }

    #[test]
    fn metrics_and_averages() {
        let matrix = ConfusionMatrix::aggregate(
            &labels(),
            &[record(&["a"], &["a"]), record(&["a"], &["b"]), record(&["c"], &["a", "c"])],
        );
        let metrics = matrix.metrics();
        assert_eq!(metrics[0].precision, 0.5);
        assert_eq!(metrics[0].recall, 0.5);
        assert_eq!(metrics[0].f1, 0.5);
        assert_eq!(metrics[1].f1, 0.0);
        assert_eq!(metrics[2].f1, 1.0);

        let macro_avg = matrix.macro_average();
        assert_eq!(macro_avg.labels, 3);
        assert!((macro_avg.f1 - 0.5).abs() < 1e-12);

        // pooled: tp 2, fp 2, fn 1
        let micro = matrix.micro_average();
        assert_eq!(micro.precision, 0.5);
        assert!((micro.recall - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn subset_keeps_matrix_order() {
        let matrix = ConfusionMatrix::aggregate(&labels(), &[record(&["a"], &["c"])]);
        let subset = matrix.subset(["c", "a", "zzz"]);
        assert_eq!(subset.labels().labels(), ["a", "c"]);
        assert_eq!(subset.counts("c"), matrix.counts("c"));
        assert_eq!(subset.counts("b"), None);
    }

    #[test]
    fn empty_matrix_averages_to_zero() {
        let matrix = ConfusionMatrix::new(&labels());
        assert_eq!(matrix.macro_average(), AverageMetrics::default());
        assert_eq!(matrix.micro_average().f1, 0.0);
    }

    fn label_set() -> impl Strategy<Value = Vec<&'static str>> {
        proptest::sample::subsequence(vec!["a", "b", "c", "d"], 0..=4)
    }

    proptest! {
        #[test]
        fn proptest_rows_and_columns_add_up(
            pairs in proptest::collection::vec((label_set(), label_set()), 0..30)
        ) {
            let records: Vec<PredictionRecord> =
                pairs.iter().map(|(truth, predicted)| record(truth, predicted)).collect();
            let matrix = ConfusionMatrix::aggregate(&labels(), &records);
            for label in ["a", "b", "c", "d"] {
                let counts = matrix.counts(label).unwrap();
                let in_truth = pairs.iter().filter(|(truth, _)| truth.contains(&label)).count();
                let in_predicted = pairs.iter().filter(|(_, predicted)| predicted.contains(&label)).count();
                prop_assert_eq!(counts.support(), in_truth);
                prop_assert_eq!(counts.predicted(), in_predicted);
                prop_assert_eq!(
                    counts.support() + counts.false_positives + counts.true_negatives,
                    pairs.len()
                );
            }
        }
    }
}
