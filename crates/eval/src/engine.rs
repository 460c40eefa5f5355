use crate::config::Thresholds;
use crate::confusion::ConfusionMatrix;
use crate::error::{EvalError, Result, ScorerError};
use crate::report::EvaluationReport;
use crate::scorer::{ScoreResult, Scorer};
use crate::statistics::LabelStatistics;
use intent_corpus::{normalize, Dataset, LabelIndex, NormalizeMode, UNKNOWN_LABEL};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

/// Record-level outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationCategory {
    /// Prediction matches a ground truth with real labels.
    TruePositive,
    /// Prediction fell back to `UNKNOWN` while the ground truth had real labels.
    FalseNegative,
    /// Prediction named labels that differ from the ground truth.
    FalsePositive,
    /// Both ground truth and prediction are `UNKNOWN`.
    TrueNegative,
}

impl EvaluationCategory {
    fn classify(truth: &[String], predicted: &[String]) -> Self {
        let unknown_only = |labels: &[String]| labels.len() == 1 && labels[0] == UNKNOWN_LABEL;
        if same_label_set(truth, predicted) {
            if unknown_only(truth) {
                Self::TrueNegative
            } else {
                Self::TruePositive
            }
        } else if unknown_only(predicted) {
            Self::FalseNegative
        } else {
            Self::FalsePositive
        }
    }
}

/// Outcome of scoring one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub utterance: String,
    pub ground_truth_labels: Vec<String>,
    pub ground_truth_indexes: Vec<usize>,
    pub predicted_labels: Vec<String>,
    pub predicted_scores: Vec<f64>,
    pub predicted_indexes: Vec<usize>,
    pub category: EvaluationCategory,
    /// Scores for indexed labels, highest first.
    pub scores: Vec<ScoreResult>,
}

impl PredictionRecord {
    pub fn is_misclassified(&self) -> bool {
        !same_label_set(&self.ground_truth_labels, &self.predicted_labels)
    }

    pub fn top_score(&self) -> f64 {
        self.scores.first().map_or(0.0, |result| result.score)
    }
}

fn same_label_set(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// Score every utterance of `dataset` and sort the outcomes into report buckets.
///
/// `UNKNOWN` joins the label index when missing, and a copy of the dataset is normalized
/// against the index so every ground-truth label has a position. Scorer calls are awaited
/// one at a time; the first scorer error aborts the pass.
pub async fn evaluate(
    index: &LabelIndex,
    dataset: &Dataset,
    scorer: &dyn Scorer,
    thresholds: &Thresholds,
) -> Result<EvaluationReport> {
    thresholds.validate()?;
    if dataset.is_empty() {
        return Err(EvalError::EmptyDataset(
            "the dataset holds no utterances".to_string(),
        ));
    }

    let started = Instant::now();
    let mut index = index.clone();
    index.insert(UNKNOWN_LABEL);
    let allowed: HashSet<String> = index.labels().iter().cloned().collect();
    let mut dataset = dataset.clone();
    normalize(&mut dataset, NormalizeMode::AllowSet(&allowed));

    let mut report = EvaluationReport::new(&index, *thresholds, LabelStatistics::from_dataset(&dataset));

    for entry in &dataset {
        let utterance = entry.utterance();
        let scores = rank_scores(utterance, scorer.score(utterance).await?, &index)?;
        let predicted = predict(&scores, thresholds);

        let ground_truth_labels = entry.labels().to_vec();
        let ground_truth_indexes = positions(&index, &ground_truth_labels);
        let predicted_labels: Vec<String> = predicted.iter().map(|(label, _)| label.clone()).collect();
        let predicted_indexes = positions(&index, &predicted_labels);
        let category = EvaluationCategory::classify(&ground_truth_labels, &predicted_labels);

        let top = scores.first().map_or(0.0, |result| result.score);
        let ambiguous = scores.len() >= 2 && top - scores[1].score < thresholds.ambiguous_closeness;
        let low_confidence = top < thresholds.low_confidence;
        let duplicate = entry.is_multi_label();

        let record = PredictionRecord {
            utterance: utterance.to_string(),
            ground_truth_labels,
            ground_truth_indexes,
            predicted_scores: predicted.iter().map(|(_, score)| *score).collect(),
            predicted_labels,
            predicted_indexes,
            category,
            scores,
        };
        log::debug!(
            "'{}': truth {:?}, predicted {:?} ({:?})",
            record.utterance,
            record.ground_truth_labels,
            record.predicted_labels,
            record.category
        );
        report.push(record, ambiguous, low_confidence, duplicate);
    }

    log::info!(
        "Evaluated {} utterances in {} ms: {} misclassified, {} ambiguous, {} low confidence",
        report.records.len(),
        started.elapsed().as_millis(),
        report.misclassified.len(),
        report.ambiguous.len(),
        report.low_confidence.len()
    );
    Ok(report)
}

/// Reject non-finite scores, drop labels outside `index`, rank highest first (stable).
fn rank_scores(
    utterance: &str,
    scores: Vec<ScoreResult>,
    index: &LabelIndex,
) -> std::result::Result<Vec<ScoreResult>, ScorerError> {
    let mut ranked = Vec::with_capacity(scores.len());
    for result in scores {
        if !result.score.is_finite() {
            return Err(ScorerError::InvalidScore {
                utterance: utterance.to_string(),
                label: result.label,
            });
        }
        if !index.contains(&result.label) {
            log::debug!("Dropping score for unindexed label '{}'", result.label);
            continue;
        }
        ranked.push(result);
    }
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(ranked)
}

/// Labels at or above the multi-label threshold; otherwise `UNKNOWN` when the top score is
/// under the unknown threshold; otherwise the top label alone.
fn predict(scores: &[ScoreResult], thresholds: &Thresholds) -> Vec<(String, f64)> {
    let above: Vec<(String, f64)> = scores
        .iter()
        .filter(|result| result.score >= thresholds.multi_label)
        .map(|result| (result.label.clone(), result.score))
        .collect();
    if !above.is_empty() {
        return above;
    }
    match scores.first() {
        Some(top) if top.score >= thresholds.unknown_label => vec![(top.label.clone(), top.score)],
        _ => {
            let score = scores
                .iter()
                .find(|result| result.label == UNKNOWN_LABEL)
                .map_or(0.0, |result| result.score);
            vec![(UNKNOWN_LABEL.to_string(), score)]
        }
    }
}

fn positions(index: &LabelIndex, labels: &[String]) -> Vec<usize> {
    labels
        .iter()
        .filter_map(|label| index.position(label))
        .collect()
}
