//! Format adapters.
//!
//! Each adapter turns the contents of one supported source encoding into [`Record`]s.
//! Adapters never touch the [`Dataset`](crate::Dataset); folding happens in ingestion.

mod json;
mod lu;
mod qna;
mod tabular;

use crate::dataset::EntityLabel;
use crate::error::Result;
use std::path::Path;

pub use tabular::TabularShape;

/// One fact extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Utterance with a label given by the source itself.
    Intent { utterance: String, label: String },
    /// Utterance labelled by the file it came from (QnA questions).
    Question { utterance: String },
    /// Entity span annotation for an utterance.
    Entity {
        utterance: String,
        entity: EntityLabel,
    },
}

/// Reference to another source file, e.g. `[shared](common.lu#Greeting)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Path relative to the importing file's directory.
    pub path: String,
    /// Intent section to take from the target; `None` imports the whole file.
    pub section: Option<String>,
}

impl Import {
    /// Split `path#fragment`. Wildcard fragments (`*utterances*`, `?`) mean the whole file.
    pub fn parse(target: &str) -> Option<Self> {
        let (path, fragment) = match target.split_once('#') {
            Some((path, fragment)) => (path.trim(), Some(fragment.trim())),
            None => (target.trim(), None),
        };
        if path.is_empty() {
            return None;
        }
        let section = fragment
            .filter(|f| !f.is_empty() && !f.starts_with('*') && !f.starts_with('?'))
            .map(str::to_string);
        Some(Self {
            path: path.to_string(),
            section,
        })
    }
}

/// Output of one adapter run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub records: Vec<Record>,
    /// Other files referenced by this one.
    pub imports: Vec<Import>,
}

impl Parsed {
    /// Keep only the intent records labelled `section` and the entity spans of their
    /// utterances.
    pub fn retain_section(&mut self, section: &str) {
        let utterances: std::collections::HashSet<String> = self
            .records
            .iter()
            .filter_map(|record| match record {
                Record::Intent { utterance, label } if label == section => Some(utterance.clone()),
                _ => None,
            })
            .collect();
        self.records.retain(|record| match record {
            Record::Intent { label, .. } => label == section,
            Record::Entity { utterance, .. } => utterances.contains(utterance),
            Record::Question { .. } => false,
        });
        self.imports.clear();
    }
}

impl Parsed {
    pub(crate) fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            imports: Vec::new(),
        }
    }
}

/// Supported source encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// `.lu` language-understanding files.
    Lu,
    /// `.qna` question/answer files.
    Qna,
    /// `.json` application exports or example arrays.
    Json,
    /// `.tsv` / `.txt` sheets.
    Tabular,
    /// `.blu` dataset snapshots.
    Snapshot,
}

/// Extensions accepted for a single input file.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["lu", "qna", "json", "tsv", "txt", "blu"];

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "lu" => Some(Self::Lu),
            "qna" => Some(Self::Qna),
            "json" => Some(Self::Json),
            "tsv" | "txt" => Some(Self::Tabular),
            "blu" => Some(Self::Snapshot),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lu => "lu",
            Self::Qna => "qna",
            Self::Json => "json",
            Self::Tabular => "tsv",
            Self::Snapshot => "blu",
        }
    }

    /// Snapshots are complete datasets and only accepted as a top-level input.
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Snapshot)
    }

    /// Parse `contents`; `path` is only used for error reporting.
    pub fn parse(self, path: &Path, contents: &str) -> Result<Parsed> {
        match self {
            Self::Lu => lu::parse(path, contents),
            Self::Qna => qna::parse(path, contents),
            Self::Json => json::parse(path, contents),
            Self::Tabular => Ok(Parsed::from_records(tabular::parse(contents))),
            Self::Snapshot => Ok(Parsed::from_records(tabular::parse_snapshot(contents))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn dispatches_by_extension() {
        assert_eq!(
            SourceFormat::from_path(&PathBuf::from("a/b.lu")),
            Some(SourceFormat::Lu)
        );
        assert_eq!(
            SourceFormat::from_path(&PathBuf::from("b.txt")),
            Some(SourceFormat::Tabular)
        );
        assert_eq!(
            SourceFormat::from_path(&PathBuf::from("b.blu")),
            Some(SourceFormat::Snapshot)
        );
        assert_eq!(SourceFormat::from_path(&PathBuf::from("b.csv")), None);
        assert_eq!(SourceFormat::from_path(&PathBuf::from("README")), None);
        assert!(!SourceFormat::Snapshot.is_walkable());
    }

    #[test]
    fn import_fragments_select_a_section() {
        assert_eq!(
            Import::parse("./common/greetings.lu#Greeting"),
            Some(Import {
                path: "./common/greetings.lu".to_string(),
                section: Some("Greeting".to_string()),
            })
        );
        assert_eq!(Import::parse("faq.qna#?").unwrap().section, None);
        assert_eq!(Import::parse("all.lu#*utterances*").unwrap().section, None);
        assert_eq!(Import::parse("plain.lu").unwrap().section, None);
        assert_eq!(Import::parse("#Greeting"), None);
    }

    #[test]
    fn retain_section_keeps_matching_intents_and_their_entities() {
        let text = "# Greeting\n- hi\n# BookFlight\n- fly to {@city=paris}\n- hi\n";
        let mut parsed = SourceFormat::Lu.parse(Path::new("a.lu"), text).unwrap();
        parsed.retain_section("BookFlight");
        assert_eq!(
            parsed.records,
            vec![
                Record::Entity {
                    utterance: "fly to paris".to_string(),
                    entity: EntityLabel::new("city", 7, 5),
                },
                Record::Intent {
                    utterance: "fly to paris".to_string(),
                    label: "BookFlight".to_string(),
                },
                Record::Intent {
                    utterance: "hi".to_string(),
                    label: "BookFlight".to_string(),
                },
            ]
        );
    }
}
