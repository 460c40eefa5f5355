use super::{Parsed, Record};
use crate::error::{CorpusError, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    Questions,
    Filters,
    Answer { opened_at: usize },
}

/// Questions of every QnA pair. Answers, filters, `>` comments and pair metadata are
/// skipped; labels are assigned during ingestion.
pub(super) fn parse(path: &Path, contents: &str) -> Result<Parsed> {
    let mut records = Vec::new();
    let mut state = State::Outside;

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if let State::Answer { .. } = state {
            if line.starts_with("```") {
                state = State::Outside;
            }
            continue;
        }
        if line.is_empty() || line.starts_with('>') {
            continue;
        }

        if let Some(question) = pair_header(line) {
            let question = question.trim();
            if question.is_empty() {
                return Err(CorpusError::parse(path, Some(line_no), "question without text"));
            }
            records.push(Record::Question {
                utterance: question.to_string(),
            });
            state = State::Questions;
            continue;
        }

        if line.starts_with("```") {
            state = State::Answer { opened_at: line_no };
            continue;
        }
        if line.starts_with("**Filters:**") {
            state = State::Filters;
            continue;
        }
        if line.starts_with('#') {
            state = State::Outside;
            continue;
        }

        if state == State::Questions {
            if let Some(alternate) = line.strip_prefix(['-', '*', '+']) {
                let alternate = alternate.trim();
                if !alternate.is_empty() {
                    records.push(Record::Question {
                        utterance: alternate.to_string(),
                    });
                }
            }
        }
    }

    if let State::Answer { opened_at } = state {
        return Err(CorpusError::parse(path, Some(opened_at), "unterminated answer block"));
    }
    Ok(Parsed::from_records(records))
}

/// `# ? question` or `## ? question`.
fn pair_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('#')?;
    let rest = rest.strip_prefix('#').unwrap_or(rest);
    rest.trim_start().strip_prefix('?')
}
