use crate::config::Thresholds;
use crate::engine::{evaluate, PredictionRecord};
use crate::error::{EvalError, Result, ScorerError};
use crate::report::{Bucket, EvaluationReport};
use crate::scorer::{examples_to_dataset, Example, ScoreResult, Scorer};
use intent_corpus::LabelIndex;

/// Stateful review loop over a scorer: pick an utterance, inspect its scores, fix its
/// labels, and re-validate.
///
/// Label lists accept label names or positions in the scorer's label vocabulary.
pub struct PredictSession<S: Scorer> {
    scorer: S,
    thresholds: Thresholds,
    utterance: Option<String>,
    current_labels: Vec<String>,
    new_labels: Vec<String>,
    report: Option<EvaluationReport>,
}

impl<S: Scorer> PredictSession<S> {
    pub fn new(scorer: S, thresholds: Thresholds) -> Self {
        Self {
            scorer,
            thresholds,
            utterance: None,
            current_labels: Vec::new(),
            new_labels: Vec::new(),
            report: None,
        }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn into_scorer(self) -> S {
        self.scorer
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn utterance(&self) -> Option<&str> {
        self.utterance.as_deref()
    }

    pub fn current_labels(&self) -> &[String] {
        &self.current_labels
    }

    pub fn new_labels(&self) -> &[String] {
        &self.new_labels
    }

    pub fn report(&self) -> Option<&EvaluationReport> {
        self.report.as_ref()
    }

    pub fn set_utterance(&mut self, utterance: impl Into<String>) {
        self.utterance = Some(utterance.into());
    }

    pub fn set_current_labels<I, T>(&mut self, entries: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.current_labels = self.resolve_labels(entries);
    }

    pub fn set_new_labels<I, T>(&mut self, entries: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.new_labels = self.resolve_labels(entries);
    }

    /// Comma-separated entries; numbers resolve to labels at that vocabulary position.
    fn resolve_labels<I, T>(&self, entries: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let labels = self.scorer.labels();
        let mut resolved: Vec<String> = Vec::new();
        for entry in entries {
            for item in entry.as_ref().split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let label = item
                    .parse::<usize>()
                    .ok()
                    .and_then(|position| labels.get(position).cloned())
                    .unwrap_or_else(|| item.to_string());
                if !resolved.contains(&label) {
                    resolved.push(label);
                }
            }
        }
        resolved
    }

    fn require_utterance(&self) -> Result<&str> {
        self.utterance.as_deref().ok_or(EvalError::NoUtterance)
    }

    /// Look the current utterance up among the scorer's examples, loading its labels.
    pub fn find(&mut self) -> Result<Option<Example>> {
        let utterance = self.require_utterance()?.trim().to_string();
        let found = self
            .scorer
            .examples()
            .into_iter()
            .find(|example| example.utterance == utterance);
        if let Some(example) = &found {
            self.current_labels = example.labels.clone();
        }
        Ok(found)
    }

    pub async fn predict(&self) -> Result<Vec<ScoreResult>> {
        let utterance = self.require_utterance()?;
        let mut scores = self.scorer.score(utterance).await?;
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scores)
    }

    /// Leave-one-out evaluation of the scorer's own examples.
    pub async fn validate(&mut self) -> Result<&EvaluationReport> {
        let dataset = examples_to_dataset(&self.scorer.examples());
        let index = LabelIndex::from_labels(self.scorer.labels());
        self.scorer.set_ignore_same_example(true);
        let outcome = evaluate(&index, &dataset, &self.scorer, &self.thresholds).await;
        self.scorer.set_ignore_same_example(false);
        let report = self.report.insert(outcome?);
        Ok(&*report)
    }

    /// Make entry `index` of `bucket` the current utterance and labels.
    pub fn select(&mut self, bucket: Bucket, index: usize) -> Result<&PredictionRecord> {
        let report = self.report.as_ref().ok_or(EvalError::NoReport)?;
        let record = report.entry(bucket, index)?;
        self.utterance = Some(record.utterance.clone());
        self.current_labels = record.ground_truth_labels.clone();
        Ok(record)
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(())
    }

    pub fn set_ambiguous_closeness(&mut self, value: f64) -> Result<()> {
        self.set_thresholds(Thresholds {
            ambiguous_closeness: value,
            ..self.thresholds
        })
    }

    pub fn set_low_confidence(&mut self, value: f64) -> Result<()> {
        self.set_thresholds(Thresholds {
            low_confidence: value,
            ..self.thresholds
        })
    }

    pub fn set_multi_label(&mut self, value: f64) -> Result<()> {
        self.set_thresholds(Thresholds {
            multi_label: value,
            ..self.thresholds
        })
    }

    pub fn set_unknown_label(&mut self, value: f64) -> Result<()> {
        self.set_thresholds(Thresholds {
            unknown_label: value,
            ..self.thresholds
        })
    }

    /// Teach the scorer the current utterance under the new labels.
    pub fn add(&mut self) -> Result<bool> {
        let example = Example::new(self.require_utterance()?, self.new_labels.clone());
        let added = self.scorer.add_example(&example)?;
        if added {
            for label in &example.labels {
                if !self.current_labels.contains(label) {
                    self.current_labels.push(label.clone());
                }
            }
        }
        Ok(added)
    }

    /// Remove the current utterance under its current labels.
    pub fn remove(&mut self) -> Result<bool> {
        let example = Example::new(self.require_utterance()?, self.current_labels.clone());
        let removed = self.scorer.remove_example(&example)?;
        if removed {
            self.current_labels.clear();
        }
        Ok(removed)
    }

    /// Replace the current labels with the new ones.
    pub fn change(&mut self) -> Result<bool> {
        let utterance = self.require_utterance()?.to_string();
        if self.new_labels.is_empty() {
            return Err(EvalError::Scorer(ScorerError::Rejected {
                utterance,
                labels: Vec::new(),
            }));
        }
        let current = Example::new(utterance.clone(), self.current_labels.clone());
        self.scorer.remove_example(&current)?;
        let added = self
            .scorer
            .add_example(&Example::new(utterance, self.new_labels.clone()))?;
        self.current_labels = self.new_labels.clone();
        Ok(added)
    }

    /// Drop every label in the new-label list from the scorer; returns how many existed.
    pub fn remove_labels(&mut self) -> Result<usize> {
        let mut removed = 0;
        for label in &self.new_labels {
            if self.scorer.remove_label(label)? {
                removed += 1;
            }
        }
        self.current_labels
            .retain(|label| !self.new_labels.contains(label));
        Ok(removed)
    }

    pub fn snapshot(&self) -> Result<Vec<u8>> {
        Ok(self.scorer.create_snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example_scorer::ExampleScorer;
    use pretty_assertions::assert_eq;

    fn session() -> PredictSession<ExampleScorer> {
        let scorer = ExampleScorer::from(
            &[
                Example::new("hello there", ["greeting"]),
                Example::new("hello friend", ["greeting"]),
                Example::new("bye for now", ["farewell"]),
                Example::new("bye bye friend", ["farewell"]),
                Example::new("hello bye", ["greeting"]),
            ][..],
        );
        PredictSession::new(scorer, Thresholds::default())
    }

    #[test]
    fn labels_resolve_from_positions() {
        let mut session = session();
        session.set_new_labels(["1, greeting", "custom"]);
        assert_eq!(session.new_labels(), ["farewell", "greeting", "custom"]);
    }

    #[tokio::test]
    async fn operations_need_an_utterance() {
        let mut session = session();
        assert!(matches!(session.predict().await, Err(EvalError::NoUtterance)));
        assert!(matches!(session.add(), Err(EvalError::NoUtterance)));
        assert!(matches!(session.select(Bucket::Ambiguous, 0), Err(EvalError::NoReport)));
    }

    #[tokio::test]
    async fn find_predict_and_change() {
        let mut session = session();
        session.set_utterance("hello bye");
        let found = session.find().unwrap().unwrap();
        assert_eq!(found.labels, ["greeting"]);
        assert_eq!(session.current_labels(), ["greeting"]);

        let scores = session.predict().await.unwrap();
        assert_eq!(scores[0].score, 1.0);

        session.set_new_labels(["farewell"]);
        assert!(session.change().unwrap());
        assert_eq!(session.current_labels(), ["farewell"]);
        let found = session.find().unwrap().unwrap();
        assert_eq!(found.labels, ["farewell"]);
    }

    #[test]
    fn padded_utterance_is_found_and_removed() {
        let mut session = session();
        session.set_utterance("  hello bye ");
        assert!(session.find().unwrap().is_some());
        assert_eq!(session.current_labels(), ["greeting"]);
        assert!(session.remove().unwrap());
        assert!(session.find().unwrap().is_none());
    }

    #[tokio::test]
    async fn validate_then_select() {
        let mut session = session();
        let report = session.validate().await.unwrap();
        assert_eq!(report.records.len(), 5);
        let misclassified = report.misclassified.len();
        assert!(!session.scorer().ignores_same_example());

        if misclassified > 0 {
            let utterance = session
                .select(Bucket::Misclassified, 0)
                .unwrap()
                .utterance
                .clone();
            assert_eq!(session.utterance(), Some(utterance.as_str()));
        }
        assert!(matches!(
            session.select(Bucket::Misclassified, misclassified),
            Err(EvalError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn add_remove_and_remove_labels() {
        let mut session = session();
        session.set_utterance("see you");
        session.set_new_labels(["farewell"]);
        assert!(session.add().unwrap());
        assert_eq!(session.current_labels(), ["farewell"]);
        assert!(session.remove().unwrap());
        assert!(session.current_labels().is_empty());

        session.set_new_labels(["farewell", "nonexistent"]);
        assert_eq!(session.remove_labels().unwrap(), 1);
        assert_eq!(session.scorer().labels(), ["greeting"]);

        assert!(session.set_low_confidence(2.0).is_err());
        session.set_low_confidence(0.4).unwrap();
        assert_eq!(session.thresholds().low_confidence, 0.4);
        assert!(!session.snapshot().unwrap().is_empty());
    }
}
