use crate::label_index::LabelIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Sentinel label for utterances whose labels were all filtered out.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Outcome of assigning a label to an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// First time the utterance was seen.
    New,
    /// Known utterance, label appended to its sequence.
    Appended,
    /// The utterance already carried this label.
    Repeated,
}

/// Span annotation attached to an utterance by entity-aware encodings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityLabel {
    pub name: String,
    pub offset: usize,
    pub length: usize,
}

impl EntityLabel {
    pub fn new(name: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
        }
    }
}

/// Labels known for one utterance.
///
/// `labels` keeps first-seen order and never repeats a value. `occurrences` tracks every
/// distinct label ever associated with the utterance; normalization resynchronizes it with
/// the surviving labels. `repeats` counts assignments of a label the utterance already had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceLabelSet {
    utterance: String,
    labels: Vec<String>,
    occurrences: BTreeSet<String>,
    repeats: usize,
}

impl UtteranceLabelSet {
    pub fn new(utterance: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            utterance: utterance.into(),
            occurrences: BTreeSet::from([label.clone()]),
            labels: vec![label],
            repeats: 0,
        }
    }

    pub fn utterance(&self) -> &str {
        &self.utterance
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn occurrences(&self) -> &BTreeSet<String> {
        &self.occurrences
    }

    pub fn repeats(&self) -> usize {
        self.repeats
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|existing| existing == label)
    }

    /// More than one distinct label was assigned to this utterance.
    pub fn is_multi_label(&self) -> bool {
        self.occurrences.len() > 1
    }

    pub(crate) fn assign(&mut self, label: &str) -> Assignment {
        if self.has_label(label) {
            self.repeats += 1;
            self.occurrences.insert(label.to_string());
            return Assignment::Repeated;
        }
        self.labels.push(label.to_string());
        self.occurrences.insert(label.to_string());
        Assignment::Appended
    }

    /// Keep labels accepted by `keep`, fall back to [`UNKNOWN_LABEL`] and resync occurrences.
    pub(crate) fn retain_labels(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.labels.retain(|label| keep(label));
        if self.labels.is_empty() {
            self.labels.push(UNKNOWN_LABEL.to_string());
        }
        self.occurrences = self.labels.iter().cloned().collect();
    }

    fn unassign(&mut self, label: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|existing| existing != label);
        self.occurrences.remove(label);
        before != self.labels.len()
    }
}

/// Canonical utterance → labels mapping, iterated in utterance insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    entries: Vec<UtteranceLabelSet>,
    positions: HashMap<String, usize>,
    entities: HashMap<String, Vec<EntityLabel>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset by folding `(utterance, label)` pairs in order.
    pub fn from_pairs<U, L>(pairs: impl IntoIterator<Item = (U, L)>) -> Self
    where
        U: AsRef<str>,
        L: AsRef<str>,
    {
        let mut dataset = Self::new();
        for (utterance, label) in pairs {
            dataset.insert(utterance.as_ref(), label.as_ref());
        }
        dataset
    }

    /// Fold one `(utterance, label)` pair into the dataset.
    pub fn insert(&mut self, utterance: &str, label: &str) -> Assignment {
        if let Some(&position) = self.positions.get(utterance) {
            return self.entries[position].assign(label);
        }
        self.positions
            .insert(utterance.to_string(), self.entries.len());
        self.entries.push(UtteranceLabelSet::new(utterance, label));
        Assignment::New
    }

    /// Attach an entity span to an utterance; an identical span is reported as a repeat.
    pub fn insert_entity(&mut self, utterance: &str, entity: EntityLabel) -> Assignment {
        match self.entities.get_mut(utterance) {
            Some(existing) if existing.contains(&entity) => Assignment::Repeated,
            Some(existing) => {
                existing.push(entity);
                Assignment::Appended
            }
            None => {
                self.entities.insert(utterance.to_string(), vec![entity]);
                Assignment::New
            }
        }
    }

    /// Drop `label` from `utterance`. The utterance disappears once it has no label left.
    pub fn remove(&mut self, utterance: &str, label: &str) -> bool {
        let Some(&position) = self.positions.get(utterance) else {
            return false;
        };
        let removed = self.entries[position].unassign(label);
        if self.entries[position].labels.is_empty() {
            self.remove_at(position);
        }
        removed
    }

    /// Drop `label` from every utterance, returning how many utterances carried it.
    pub fn remove_label(&mut self, label: &str) -> usize {
        let mut touched = 0;
        for entry in &mut self.entries {
            if entry.unassign(label) {
                touched += 1;
            }
        }
        if touched > 0 {
            self.entries.retain(|entry| !entry.labels.is_empty());
            self.reindex();
        }
        touched
    }

    pub fn get(&self, utterance: &str) -> Option<&UtteranceLabelSet> {
        self.positions
            .get(utterance)
            .map(|&position| &self.entries[position])
    }

    pub fn contains(&self, utterance: &str) -> bool {
        self.positions.contains_key(utterance)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UtteranceLabelSet> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut UtteranceLabelSet> {
        self.entries.iter_mut()
    }

    pub fn entities(&self, utterance: &str) -> &[EntityLabel] {
        self.entities
            .get(utterance)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every label in the dataset, first-seen order.
    pub fn vocabulary(&self) -> LabelIndex {
        LabelIndex::from_labels(self.entries.iter().flat_map(|entry| entry.labels.iter()))
    }

    /// Total repeat assignments across all utterances.
    pub fn repeats(&self) -> usize {
        self.entries.iter().map(UtteranceLabelSet::repeats).sum()
    }

    fn remove_at(&mut self, position: usize) {
        let entry = self.entries.remove(position);
        self.entities.remove(&entry.utterance);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.utterance.clone(), position))
            .collect();
        let positions = &self.positions;
        self.entities
            .retain(|utterance, _| positions.contains_key(utterance));
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a UtteranceLabelSet;
    type IntoIter = std::slice::Iter<'a, UtteranceLabelSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn folds_repeated_pairs_into_occurrences() {
        let mut dataset = Dataset::new();
        assert_eq!(dataset.insert("hi", "greeting"), Assignment::New);
        assert_eq!(dataset.insert("hi", "chitchat"), Assignment::Appended);
        assert_eq!(dataset.insert("hi", "greeting"), Assignment::Repeated);
        assert_eq!(dataset.insert("bye", "farewell"), Assignment::New);

        let hi = dataset.get("hi").unwrap();
        assert_eq!(hi.labels(), ["greeting", "chitchat"]);
        assert_eq!(hi.repeats(), 1);
        assert!(hi.is_multi_label());
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.repeats(), 1);
        let order: Vec<&str> = dataset.iter().map(UtteranceLabelSet::utterance).collect();
        assert_eq!(order, ["hi", "bye"]);
    }

    #[test]
    fn removing_last_label_drops_the_utterance() {
        let mut dataset = Dataset::from_pairs([("a", "x"), ("b", "y"), ("c", "x")]);
        assert!(dataset.remove("b", "y"));
        assert!(!dataset.contains("b"));
        assert!(!dataset.remove("b", "y"));
        assert_eq!(dataset.get("c").unwrap().labels(), ["x"]);

        assert_eq!(dataset.remove_label("x"), 2);
        assert!(dataset.is_empty());
    }

    #[test]
    fn entity_spans_are_deduplicated() {
        let mut dataset = Dataset::from_pairs([("book a flight to paris", "BookFlight")]);
        let city = EntityLabel::new("city", 17, 5);
        assert_eq!(
            dataset.insert_entity("book a flight to paris", city.clone()),
            Assignment::New
        );
        assert_eq!(
            dataset.insert_entity("book a flight to paris", city.clone()),
            Assignment::Repeated
        );
        assert_eq!(dataset.entities("book a flight to paris"), [city]);
        assert!(dataset.entities("unknown utterance").is_empty());
    }

    #[test]
    fn vocabulary_follows_first_seen_order() {
        let dataset = Dataset::from_pairs([("a", "z"), ("b", "y"), ("a", "y"), ("c", "x")]);
        let vocabulary = dataset.vocabulary();
        let labels: Vec<&str> = vocabulary.iter().collect();
        assert_eq!(labels, ["z", "y", "x"]);
    }
}
