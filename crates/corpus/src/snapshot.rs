//! `.blu` dataset snapshots and flat exports.

use crate::dataset::Dataset;
use crate::error::{CorpusError, Result};
use crate::format::SourceFormat;
use crate::ingest::fold_records;
use crate::normalize::{normalize, NormalizeMode};
use crate::stats::IngestStats;
use std::fmt::Write as _;
use std::path::Path;

pub const SNAPSHOT_HEADER: &str = "intent\tutterance";

/// Header line followed by one `labels<TAB>utterance` row per utterance, dataset order.
///
/// Fails instead of emitting a row that would read back differently.
pub fn write_snapshot(dataset: &Dataset) -> Result<String> {
    let mut out = String::with_capacity(SNAPSHOT_HEADER.len() + 1 + dataset.len() * 32);
    out.push_str(SNAPSHOT_HEADER);
    out.push('\n');
    out.push_str(&write_tsv(dataset)?);
    Ok(out)
}

/// `labels<TAB>utterance` rows without a header.
pub fn write_tsv(dataset: &Dataset) -> Result<String> {
    let mut out = String::new();
    for entry in dataset {
        check_field("utterance", entry.utterance(), &[])?;
        for label in entry.labels() {
            check_field("label", label, &[','])?;
        }
        let _ = writeln!(out, "{}\t{}", entry.labels().join(","), entry.utterance());
    }
    Ok(out)
}

/// `key<TAB>label<TAB>utt1|utt2|...`, one row per label in first-seen order.
pub fn write_label_utterances(dataset: &Dataset) -> Result<String> {
    let vocabulary = dataset.vocabulary();
    let mut grouped: Vec<Vec<&str>> = vec![Vec::new(); vocabulary.len()];
    for entry in dataset {
        check_field("utterance", entry.utterance(), &['|'])?;
        for label in entry.labels() {
            if let Some(position) = vocabulary.position(label) {
                grouped[position].push(entry.utterance());
            }
        }
    }

    let mut out = String::new();
    for (key, (label, utterances)) in vocabulary.iter().zip(grouped).enumerate() {
        check_field("label", label, &[])?;
        let _ = writeln!(out, "{key}\t{label}\t{}", utterances.join("|"));
    }
    Ok(out)
}

/// Fields are trimmed and split on tabs and line breaks when read back.
fn check_field(kind: &'static str, value: &str, separators: &[char]) -> Result<()> {
    let reason = if value.is_empty() {
        Some("value is empty")
    } else if value.contains(['\t', '\n', '\r']) {
        Some("value contains a tab or line break")
    } else if value.trim() != value {
        Some("value has leading or trailing whitespace")
    } else if value.contains(separators) {
        Some("value contains a list separator")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CorpusError::Unrepresentable {
            kind,
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Rebuild a dataset from snapshot text. Labels pass through blocklist normalization.
pub fn read_snapshot(contents: &str) -> Result<Dataset> {
    let parsed = SourceFormat::Snapshot.parse(Path::new("<snapshot>"), contents)?;
    let mut dataset = Dataset::new();
    fold_records(&mut dataset, parsed.records, "", false, &mut IngestStats::new());
    normalize(&mut dataset, NormalizeMode::Blocklist);
    Ok(dataset)
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let contents =
        std::fs::read_to_string(path).map_err(|source| CorpusError::io(path, source))?;
    let dataset = read_snapshot(&contents)?;
    if dataset.is_empty() {
        return Err(CorpusError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }
    log::debug!("Loaded {} utterances from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn save_snapshot(path: impl AsRef<Path>, dataset: &Dataset) -> Result<()> {
    let path = path.as_ref();
    let contents = write_snapshot(dataset)?;
    std::fs::write(path, contents).map_err(|source| CorpusError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, IngestOptions};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::from_pairs([
            ("hi", "greeting"),
            ("hi there", "greeting"),
            ("hi", "chitchat"),
            ("bye", "farewell"),
        ])
    }

    #[test]
    fn snapshot_layout() {
        assert_eq!(
            write_snapshot(&sample()).unwrap(),
            "intent\tutterance\ngreeting,chitchat\thi\ngreeting\thi there\nfarewell\tbye\n"
        );
    }

    #[test]
    fn snapshot_round_trips_bit_exactly() {
        let text = write_snapshot(&sample()).unwrap();
        let restored = read_snapshot(&text).unwrap();
        assert_eq!(restored, sample());
        assert_eq!(write_snapshot(&restored).unwrap(), text);
    }

    #[test]
    fn label_utterance_export_groups_by_label() {
        assert_eq!(
            write_label_utterances(&sample()).unwrap(),
            "0\tgreeting\thi|hi there\n1\tchitchat\thi\n2\tfarewell\tbye\n"
        );
    }

    #[test]
    fn save_and_load_through_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.blu");
        save_snapshot(&path, &sample()).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), sample());

        std::fs::write(&path, SNAPSHOT_HEADER).unwrap();
        assert!(matches!(
            load_snapshot(&path),
            Err(CorpusError::EmptyDataset { .. })
        ));
    }

    #[test]
    fn separators_inside_values_are_rejected() {
        let tabbed = Dataset::from_pairs([("col1\tcol2", "x")]);
        assert!(matches!(
            write_snapshot(&tabbed),
            Err(CorpusError::Unrepresentable { kind: "utterance", .. })
        ));

        let comma = Dataset::from_pairs([("hi", "a,b")]);
        let err = write_snapshot(&comma).unwrap_err();
        assert!(matches!(err, CorpusError::Unrepresentable { kind: "label", .. }), "{err}");
        assert!(write_tsv(&comma).is_err());

        let dir = tempdir().unwrap();
        assert!(save_snapshot(dir.path().join("out.blu"), &comma).is_err());
        assert!(!dir.path().join("out.blu").exists());

        let piped = Dataset::from_pairs([("this | that", "x")]);
        assert!(write_snapshot(&piped).is_ok());
        assert!(write_label_utterances(&piped).is_err());
    }

    #[test]
    fn json_values_with_separators_fail_to_snapshot() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("data.json");
        std::fs::write(
            &file,
            r#"[{"text": "col1\tcol2", "intents": ["x"]}, {"text": "hi", "intents": ["a,b"]}]"#,
        )
        .unwrap();
        let dataset = ingest(&file, IngestOptions::default()).unwrap();
        assert!(write_snapshot(&dataset).is_err());
    }

    fn labels_of(dataset: &Dataset) -> Vec<(String, Vec<String>)> {
        dataset
            .iter()
            .map(|entry| (entry.utterance().to_string(), entry.labels().to_vec()))
            .collect()
    }

    proptest! {
        #[test]
        fn proptest_ingested_json_survives_a_snapshot(
            examples in proptest::collection::vec(
                ("[a-z]{1,5}( [a-z]{1,5}){0,2}", proptest::collection::vec("[a-d]{1,3}", 1..3)),
                1..12,
            )
        ) {
            let dir = tempdir().unwrap();
            let json: Vec<serde_json::Value> = examples
                .iter()
                .map(|(text, intents)| serde_json::json!({ "text": text, "intents": intents }))
                .collect();
            let source = dir.path().join("data.json");
            std::fs::write(&source, serde_json::to_string(&json).unwrap()).unwrap();

            let ingested = ingest(&source, IngestOptions::default()).unwrap();
            let text = write_snapshot(&ingested).unwrap();
            let snapshot = dir.path().join("train.blu");
            std::fs::write(&snapshot, &text).unwrap();

            let restored = ingest(&snapshot, IngestOptions::default()).unwrap();
            prop_assert_eq!(labels_of(&restored), labels_of(&ingested));
            prop_assert_eq!(write_snapshot(&restored).unwrap(), text);
        }

        #[test]
        fn proptest_written_rows_read_back_unchanged(
            pairs in proptest::collection::vec(("[a-z\t, ]{1,6}", "[a-c, ]{1,3}"), 1..12)
        ) {
            let dataset = Dataset::from_pairs(pairs);
            if let Ok(text) = write_snapshot(&dataset) {
                let restored = read_snapshot(&text).unwrap();
                prop_assert_eq!(labels_of(&restored), labels_of(&dataset));
                prop_assert_eq!(write_snapshot(&restored).unwrap(), text);
            }
        }
    }
}
