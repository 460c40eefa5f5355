use super::{Import, Parsed, Record};
use crate::dataset::EntityLabel;
use crate::error::{CorpusError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static LABELLED_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{@?(?P<name>[^=}]+)=(?P<value>[^}]*)\}").expect("valid entity regex")
});

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[^\]]*\]\((?P<target>[^)]+)\)").expect("valid import regex"));

pub(super) fn parse(path: &Path, contents: &str) -> Result<Parsed> {
    let mut parsed = Parsed::default();
    let mut intent: Option<String> = None;

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            if header.starts_with('#') {
                // `##` sections belong to QnA content embedded in LU files.
                intent = None;
                continue;
            }
            let name = header.trim();
            if name.is_empty() {
                return Err(CorpusError::parse(path, Some(idx + 1), "intent header without a name"));
            }
            intent = Some(name.to_string());
            continue;
        }

        if let Some(caps) = IMPORT.captures(line) {
            parsed.imports.extend(Import::parse(&caps["target"]));
            continue;
        }

        if line.starts_with('>') {
            continue;
        }
        if line.starts_with(['@', '$']) {
            intent = None;
            continue;
        }

        let Some(item) = line.strip_prefix(['-', '*', '+']) else {
            log::debug!("{}:{}: ignoring line {line:?}", path.display(), idx + 1);
            continue;
        };
        let Some(label) = intent.as_deref() else {
            continue;
        };

        let (utterance, entities) = strip_entities(item.trim());
        if utterance.is_empty() || utterance.contains('{') {
            // Pattern utterances reference entities without a literal value.
            continue;
        }
        for entity in entities {
            parsed.records.push(Record::Entity {
                utterance: utterance.clone(),
                entity,
            });
        }
        parsed.records.push(Record::Intent {
            utterance,
            label: label.to_string(),
        });
    }
    Ok(parsed)
}

/// Replace `{@name=value}` with `value`, returning spans in the stripped text.
fn strip_entities(text: &str) -> (String, Vec<EntityLabel>) {
    let mut out = String::with_capacity(text.len());
    let mut entities = Vec::new();
    let mut last = 0;
    for caps in LABELLED_ENTITY.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        let value = &caps["value"];
        entities.push(EntityLabel::new(
            caps["name"].trim(),
            out.chars().count(),
            value.chars().count(),
        ));
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    (out.trim().to_string(), entities)
}
