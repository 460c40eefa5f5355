use crate::config::Thresholds;
use crate::confusion::ConfusionMatrix;
use crate::engine::PredictionRecord;
use crate::error::{EvalError, Result};
use crate::statistics::LabelStatistics;
use intent_corpus::LabelIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Diagnostic buckets an evaluation sorts utterances into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Ambiguous,
    Misclassified,
    LowConfidence,
    Duplicates,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Ambiguous,
        Bucket::Misclassified,
        Bucket::LowConfidence,
        Bucket::Duplicates,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ambiguous => "ambiguous",
            Self::Misclassified => "misclassified",
            Self::LowConfidence => "low_confidence",
            Self::Duplicates => "duplicates",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ambiguous" | "a" => Ok(Self::Ambiguous),
            "misclassified" | "m" => Ok(Self::Misclassified),
            "low_confidence" | "lowconfidence" | "l" => Ok(Self::LowConfidence),
            "duplicates" | "d" => Ok(Self::Duplicates),
            other => Err(EvalError::InvalidConfig(format!("unknown report bucket '{other}'"))),
        }
    }
}

/// Everything one evaluation pass produced. Buckets keep evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub records: Vec<PredictionRecord>,
    pub ambiguous: Vec<PredictionRecord>,
    pub misclassified: Vec<PredictionRecord>,
    pub low_confidence: Vec<PredictionRecord>,
    pub duplicates: Vec<PredictionRecord>,
    pub confusion: ConfusionMatrix,
    pub statistics: LabelStatistics,
    pub thresholds: Thresholds,
}

impl EvaluationReport {
    pub(crate) fn new(index: &LabelIndex, thresholds: Thresholds, statistics: LabelStatistics) -> Self {
        Self {
            records: Vec::new(),
            ambiguous: Vec::new(),
            misclassified: Vec::new(),
            low_confidence: Vec::new(),
            duplicates: Vec::new(),
            confusion: ConfusionMatrix::new(index),
            statistics,
            thresholds,
        }
    }

    pub(crate) fn push(
        &mut self,
        record: PredictionRecord,
        ambiguous: bool,
        low_confidence: bool,
        duplicate: bool,
    ) {
        self.confusion.add(&record);
        if ambiguous {
            self.ambiguous.push(record.clone());
        }
        if record.is_misclassified() {
            self.misclassified.push(record.clone());
        }
        if low_confidence {
            self.low_confidence.push(record.clone());
        }
        if duplicate {
            self.duplicates.push(record.clone());
        }
        self.records.push(record);
    }

    pub fn bucket(&self, bucket: Bucket) -> &[PredictionRecord] {
        match bucket {
            Bucket::Ambiguous => &self.ambiguous,
            Bucket::Misclassified => &self.misclassified,
            Bucket::LowConfidence => &self.low_confidence,
            Bucket::Duplicates => &self.duplicates,
        }
    }

    /// Stable positional lookup, e.g. "entry 7 of the ambiguous report".
    pub fn entry(&self, bucket: Bucket, index: usize) -> Result<&PredictionRecord> {
        let entries = self.bucket(bucket);
        entries.get(index).ok_or_else(|| EvalError::IndexOutOfRange {
            bucket: bucket.to_string(),
            index,
            len: entries.len(),
        })
    }

    pub fn summary(&self) -> String {
        let macro_avg = self.confusion.macro_average();
        let micro = self.confusion.micro_average();
        format!(
            "Evaluated {} utterances against {} labels: {} misclassified, {} ambiguous, \
             {} low confidence, {} multi-label. Macro F1 {:.3} over {} labels, micro F1 {:.3}.",
            self.records.len(),
            self.confusion.labels().len(),
            self.misclassified.len(),
            self.ambiguous.len(),
            self.low_confidence.len(),
            self.duplicates.len(),
            macro_avg.f1,
            macro_avg.labels,
            micro.f1
        )
    }

    /// `utterance<TAB>truth<TAB>predicted<TAB>label=score,...` per record.
    pub fn score_lines(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| {
                let scores: Vec<String> = record
                    .scores
                    .iter()
                    .map(|result| format!("{}={:.4}", result.label, result.score))
                    .collect();
                format!(
                    "{}\t{}\t{}\t{}",
                    record.utterance,
                    record.ground_truth_labels.join(","),
                    record.predicted_labels.join(","),
                    scores.join(",")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EvaluationCategory;
    use crate::scorer::ScoreResult;
    use pretty_assertions::assert_eq;

    fn record(utterance: &str, truth: &str, predicted: &str) -> PredictionRecord {
        PredictionRecord {
            utterance: utterance.to_string(),
            ground_truth_labels: vec![truth.to_string()],
            ground_truth_indexes: Vec::new(),
            predicted_labels: vec![predicted.to_string()],
            predicted_scores: vec![0.75],
            predicted_indexes: Vec::new(),
            category: EvaluationCategory::TruePositive,
            scores: vec![ScoreResult::new(predicted, 0.75), ScoreResult::new("b", 0.5)],
        }
    }

    fn report() -> EvaluationReport {
        let index = LabelIndex::from_labels(["a", "b"]);
        let mut report =
            EvaluationReport::new(&index, Thresholds::default(), LabelStatistics::default());
        report.push(record("one", "a", "a"), true, false, false);
        report.push(record("two", "a", "b"), false, true, false);
        report
    }

    #[test]
    fn buckets_and_entries() {
        let report = report();
        assert_eq!(report.bucket(Bucket::Ambiguous).len(), 1);
        assert_eq!(report.entry(Bucket::Misclassified, 0).unwrap().utterance, "two");
        assert_eq!(report.entry(Bucket::LowConfidence, 0).unwrap().utterance, "two");
        let err = report.entry(Bucket::Duplicates, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Index 0 is out of range for duplicates (0 entries)"
        );
    }

    #[test]
    fn score_lines_and_summary() {
        let report = report();
        assert_eq!(
            report.score_lines(),
            ["one\ta\ta\ta=0.7500,b=0.5000", "two\ta\tb\tb=0.7500,b=0.5000"]
        );
        assert!(report
            .summary()
            .starts_with("Evaluated 2 utterances against 2 labels: 1 misclassified, 1 ambiguous"));
    }

    #[test]
    fn parses_bucket_names() {
        assert_eq!("low-confidence".parse::<Bucket>().unwrap(), Bucket::LowConfidence);
        assert_eq!("A".parse::<Bucket>().unwrap(), Bucket::Ambiguous);
        assert!("nope".parse::<Bucket>().is_err());
    }
}
