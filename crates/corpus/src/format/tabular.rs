use super::Record;

/// Interpretation of a tab-separated sheet, decided from its first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularShape {
    /// QnA export: questions in the first column, labelled by the file.
    Questions,
    /// `labels<TAB>utterance` or `labels<TAB>extra<TAB>utterance`.
    LabelUtterance { has_header: bool },
}

impl TabularShape {
    pub fn sniff(header: &str) -> Self {
        if header.contains("Question") && header.find("Answer").is_some_and(|pos| pos > 0) {
            return Self::Questions;
        }
        let has_header = header.contains("Label")
            && (header.find("Text").is_some_and(|pos| pos > 0)
                || header.find("Utterance").is_some_and(|pos| pos > 0));
        Self::LabelUtterance { has_header }
    }
}

pub(super) fn parse(contents: &str) -> Vec<Record> {
    let mut lines = contents.split('\n');
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    match TabularShape::sniff(header) {
        TabularShape::Questions => lines.filter_map(question_row).collect(),
        TabularShape::LabelUtterance { has_header } => {
            let rows: Box<dyn Iterator<Item = &str>> = if has_header {
                Box::new(lines)
            } else {
                Box::new(std::iter::once(header).chain(lines))
            };
            rows.flat_map(|line| label_rows(line, false)).collect()
        }
    }
}

/// `.blu` snapshot: one header line, then `labels<TAB>utterance` rows.
pub(super) fn parse_snapshot(contents: &str) -> Vec<Record> {
    contents
        .split('\n')
        .skip(1)
        .flat_map(|line| label_rows(line, true))
        .collect()
}

fn question_row(line: &str) -> Option<Record> {
    let items: Vec<&str> = line.split('\t').collect();
    if items.len() < 2 {
        return None;
    }
    let utterance = items[0].trim();
    if utterance.is_empty() {
        return None;
    }
    Some(Record::Question {
        utterance: utterance.to_string(),
    })
}

fn label_rows(line: &str, snapshot: bool) -> Vec<Record> {
    let items: Vec<&str> = line.split('\t').collect();
    if items.len() < 2 {
        return Vec::new();
    }
    let utterance_idx = if items.len() == 3 && !snapshot { 2 } else { 1 };
    let utterance = items[utterance_idx].trim();
    if utterance.is_empty() {
        log::debug!("Skipping row without utterance: {line:?}");
        return Vec::new();
    }
    items[0]
        .trim()
        .split(',')
        .map(|label| Record::Intent {
            utterance: utterance.to_string(),
            label: label.trim().to_string(),
        })
        .collect()
}
