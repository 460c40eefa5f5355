use crate::error::{CorpusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order-preserving bidirectional map between labels and dense positions.
///
/// Positions are assigned in first-seen order starting at 0 and never re-sorted, so two
/// indexes built from the same input sequence are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelIndex {
    array: Vec<String>,
    map: HashMap<String, usize>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a list that is unique by construction. A repeated entry is an error.
    pub fn from_unique<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for label in labels {
            let label = label.into();
            if index.contains(&label) {
                return Err(CorpusError::DuplicateLabel(label));
            }
            index.insert(label);
        }
        Ok(index)
    }

    /// Index an arbitrary sequence, keeping the first appearance of each label.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for label in labels {
            let label = label.as_ref();
            if !index.contains(label) {
                index.insert(label);
            }
        }
        index
    }

    /// Index several label lists as one flattened sequence.
    pub fn from_label_lists<I, L, S>(lists: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_labels(lists.into_iter().flatten())
    }

    /// Position of `label`, appending it when absent.
    pub fn insert(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        if let Some(&position) = self.map.get(&label) {
            return position;
        }
        let position = self.array.len();
        self.map.insert(label.clone(), position);
        self.array.push(label);
        position
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.map.get(label).copied()
    }

    pub fn label(&self, position: usize) -> Option<&str> {
        self.array.get(position).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.array
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.array.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for LabelIndex {
    fn from(labels: Vec<String>) -> Self {
        Self::from_labels(labels)
    }
}

impl From<LabelIndex> for Vec<String> {
    fn from(index: LabelIndex) -> Self {
        index.array
    }
}
