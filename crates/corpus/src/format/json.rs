use super::{Parsed, Record};
use crate::dataset::EntityLabel;
use crate::error::{CorpusError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonCorpus {
    /// Application export with an `utterances` array.
    App { utterances: Vec<AppUtterance> },
    /// Plain array of labelled examples.
    Examples(Vec<Example>),
}

#[derive(Debug, Deserialize)]
struct AppUtterance {
    text: String,
    intent: String,
    #[serde(default)]
    entities: Vec<EntitySpan>,
}

#[derive(Debug, Deserialize)]
struct Example {
    text: String,
    #[serde(default)]
    intents: Vec<String>,
    #[serde(default)]
    entities: Vec<EntitySpan>,
}

/// Inclusive character span.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitySpan {
    entity: String,
    start_pos: usize,
    end_pos: usize,
}

impl EntitySpan {
    fn into_label(self) -> EntityLabel {
        let length = (self.end_pos + 1).saturating_sub(self.start_pos);
        EntityLabel::new(self.entity, self.start_pos, length)
    }
}

pub(super) fn parse(path: &Path, contents: &str) -> Result<Parsed> {
    let corpus: JsonCorpus = serde_json::from_str(contents).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    let mut push = |text: String, labels: Vec<String>, spans: Vec<EntitySpan>| {
        let utterance = text.trim().to_string();
        if utterance.is_empty() {
            return;
        }
        for span in spans {
            records.push(Record::Entity {
                utterance: utterance.clone(),
                entity: span.into_label(),
            });
        }
        for label in labels {
            records.push(Record::Intent {
                utterance: utterance.clone(),
                label,
            });
        }
    };

    match corpus {
        JsonCorpus::App { utterances } => {
            for item in utterances {
                push(item.text, vec![item.intent], item.entities);
            }
        }
        JsonCorpus::Examples(examples) => {
            for item in examples {
                push(item.text, item.intents, item.entities);
            }
        }
    }
    Ok(Parsed::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_application_export() {
        let text = r#"{
            "name": "travel",
            "utterances": [
                {"text": "fly to paris", "intent": "BookFlight",
                 "entities": [{"entity": "city", "startPos": 7, "endPos": 11}]},
                {"text": "  ", "intent": "None"}
            ]
        }"#;
        let parsed = parse(Path::new("app.json"), text).unwrap();
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
            ]
        );
    }

    #[test]
    fn reads_example_array_with_several_intents() {
        let text = r#"[{"text": "hi bye", "intents": ["greeting", "farewell"]}]"#;
        let parsed = parse(Path::new("examples.json"), text).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed.imports.is_empty());
    }

    #[test]
    fn unrecognized_shape_is_a_json_error() {
        let err = parse(Path::new("bad.json"), r#"{"intents": []}"#).unwrap_err();
        assert!(matches!(err, CorpusError::Json { .. }), "{err}");
    }
}
