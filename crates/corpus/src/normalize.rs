use crate::dataset::{Dataset, UNKNOWN_LABEL};
use std::collections::HashSet;

/// Placeholder values that never name a real intent. Matched exactly, case-sensitive.
pub const PLACEHOLDER_LABELS: &[&str] = &["", "unknown", "none"];

/// Which labels survive normalization.
#[derive(Debug, Clone, Copy)]
pub enum NormalizeMode<'a> {
    /// Drop [`PLACEHOLDER_LABELS`].
    Blocklist,
    /// Keep only labels from a known vocabulary, e.g. the labels of a training split.
    AllowSet(&'a HashSet<String>),
}

impl NormalizeMode<'_> {
    fn keeps(&self, label: &str) -> bool {
        match self {
            Self::Blocklist => !PLACEHOLDER_LABELS.contains(&label),
            Self::AllowSet(allowed) => allowed.contains(label),
        }
    }
}

/// Filter every utterance's labels in place.
///
/// Utterances left without a label fall back to [`UNKNOWN_LABEL`] and each occurrence set is
/// resynchronized with the surviving labels. Total and idempotent.
pub fn normalize(dataset: &mut Dataset, mode: NormalizeMode<'_>) {
    let mut fallbacks = 0usize;
    for entry in dataset.iter_mut() {
        entry.retain_labels(|label| mode.keeps(label));
        if entry.labels() == [UNKNOWN_LABEL] {
            fallbacks += 1;
        }
    }
    log::debug!(
        "Normalized {} utterances ({} resolved to {UNKNOWN_LABEL})",
        dataset.len(),
        fallbacks
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn fixture() -> Dataset {
        let mut dataset = Dataset::new();
        for (utterance, labels) in [
            ("hi", vec!["greeting", "chitchat"]),
            ("A", vec!["greeting", "", "unknown", "none"]),
            ("B", vec!["", "unknown", "none"]),
        ] {
            for label in labels {
                dataset.insert(utterance, label);
            }
        }
        dataset
    }

    fn occurrences(dataset: &Dataset, utterance: &str) -> BTreeSet<String> {
        dataset.get(utterance).unwrap().occurrences().clone()
    }

    #[test]
    fn blocklist_resolves_placeholder_only_utterance_to_unknown() {
        let mut dataset = fixture();
        normalize(&mut dataset, NormalizeMode::Blocklist);

        assert_eq!(dataset.get("B").unwrap().labels(), [UNKNOWN_LABEL]);
        assert_eq!(
            occurrences(&dataset, "B"),
            BTreeSet::from([UNKNOWN_LABEL.to_string()])
        );
    }

    #[test]
    fn blocklist_drops_placeholders_next_to_real_labels() {
        let mut dataset = fixture();
        normalize(&mut dataset, NormalizeMode::Blocklist);

        assert_eq!(dataset.get("A").unwrap().labels(), ["greeting"]);
        assert_eq!(
            occurrences(&dataset, "A"),
            BTreeSet::from(["greeting".to_string()])
        );
        assert_eq!(dataset.get("hi").unwrap().labels(), ["greeting", "chitchat"]);
        assert_eq!(occurrences(&dataset, "hi").len(), 2);
    }

    #[test]
    fn allow_set_drops_labels_outside_vocabulary() {
        let mut dataset = fixture();
        let allowed = HashSet::from(["greeting".to_string()]);
        normalize(&mut dataset, NormalizeMode::AllowSet(&allowed));

        assert_eq!(dataset.get("hi").unwrap().labels(), ["greeting"]);
        assert_eq!(
            occurrences(&dataset, "hi"),
            BTreeSet::from(["greeting".to_string()])
        );
        assert_eq!(dataset.get("A").unwrap().labels(), ["greeting"]);
        assert_eq!(dataset.get("B").unwrap().labels(), [UNKNOWN_LABEL]);
    }

    #[test]
    fn placeholder_matching_is_case_sensitive() {
        let mut dataset = Dataset::from_pairs([("x", "Unknown"), ("y", "NONE")]);
        normalize(&mut dataset, NormalizeMode::Blocklist);
        assert_eq!(dataset.get("x").unwrap().labels(), ["Unknown"]);
        assert_eq!(dataset.get("y").unwrap().labels(), ["NONE"]);
    }

    #[test]
    fn repeats_survive_resynchronization() {
        let mut dataset = Dataset::from_pairs([("x", "a"), ("x", "a"), ("x", "")]);
        normalize(&mut dataset, NormalizeMode::Blocklist);
        let entry = dataset.get("x").unwrap();
        assert_eq!(entry.labels(), ["a"]);
        assert_eq!(entry.repeats(), 1);
        assert!(!entry.is_multi_label());
    }

    fn label_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("unknown".to_string()),
            Just("none".to_string()),
            Just(UNKNOWN_LABEL.to_string()),
            "[a-d]{1,3}",
        ]
    }

    fn dataset_strategy() -> impl Strategy<Value = Dataset> {
        proptest::collection::vec(("[p-t]{1,2}", label_strategy()), 0..40)
            .prop_map(|pairs| Dataset::from_pairs(pairs))
    }

    proptest! {
        #[test]
        fn proptest_normalization_is_idempotent(mut dataset in dataset_strategy()) {
            normalize(&mut dataset, NormalizeMode::Blocklist);
            let once = dataset.clone();
            normalize(&mut dataset, NormalizeMode::Blocklist);
            prop_assert_eq!(once, dataset);
        }

        #[test]
        fn proptest_labels_are_non_empty_and_unique(mut dataset in dataset_strategy()) {
            normalize(&mut dataset, NormalizeMode::Blocklist);
            for entry in dataset.iter() {
                prop_assert!(!entry.labels().is_empty());
                let unique: BTreeSet<&String> = entry.labels().iter().collect();
                prop_assert_eq!(unique.len(), entry.labels().len());
                let mirrored: BTreeSet<String> = entry.labels().iter().cloned().collect();
                prop_assert_eq!(&mirrored, entry.occurrences());
                prop_assert!(entry.labels().iter().all(|l| !PLACEHOLDER_LABELS.contains(&l.as_str())));
            }
        }

        #[test]
        fn proptest_allow_set_keeps_only_known_labels(
            mut dataset in dataset_strategy(),
            allowed in proptest::collection::hash_set("[a-d]{1,3}", 0..6),
        ) {
            normalize(&mut dataset, NormalizeMode::AllowSet(&allowed));
            for entry in dataset.iter() {
                let all_known = entry.labels().iter().all(|l| allowed.contains(l));
                let fallback = entry.labels() == [UNKNOWN_LABEL];
                prop_assert!(all_known || fallback, "{:?}", entry);
            }
        }
    }
}
