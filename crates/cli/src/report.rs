use anyhow::{Context as AnyhowContext, Result};
use intent_eval::{Bucket, EvaluationReport, PredictionRecord};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_BUCKET_ROWS: usize = 50;

/// Write `<prefix>_labels.txt`, `_scores.txt`, `_summary.json` and `_summary.md` into `dir`.
pub fn write_report_files(
    dir: &Path,
    prefix: &str,
    source: &Path,
    report: &EvaluationReport,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut scores = report.score_lines().join("\n");
    scores.push('\n');
    let files = [
        (format!("{prefix}_labels.txt"), render_labels(report)),
        (format!("{prefix}_scores.txt"), scores),
        (
            format!("{prefix}_summary.json"),
            serde_json::to_string_pretty(report).context("Failed to serialize report")?,
        ),
        (format!("{prefix}_summary.md"), render_markdown(source, report)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// One row per label: position, label, utterances, then confusion counts and metrics.
fn render_labels(report: &EvaluationReport) -> String {
    let utterances: std::collections::HashMap<&str, usize> = report
        .statistics
        .label_counts
        .iter()
        .map(|(label, count)| (label.as_str(), *count))
        .collect();

    let mut out = String::from("index\tlabel\tutterances\ttp\tfp\tfn\ttn\tprecision\trecall\tf1\n");
    for (index, metrics) in report.confusion.metrics().iter().enumerate() {
        let counts = &metrics.counts;
        let _ = writeln!(
            out,
            "{index}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}",
            metrics.label,
            utterances.get(metrics.label.as_str()).copied().unwrap_or(0),
            counts.true_positives,
            counts.false_positives,
            counts.false_negatives,
            counts.true_negatives,
            metrics.precision,
            metrics.recall,
            metrics.f1
        );
    }
    out
}

pub fn render_markdown(source: &Path, report: &EvaluationReport) -> String {
    let thresholds = &report.thresholds;
    let macro_avg = report.confusion.macro_average();
    let micro = report.confusion.micro_average();

    let mut md = String::new();
    md.push_str("# Intent evaluation report\n\n");
    md.push_str(&format!("- Source: `{}`\n", source.display()));
    md.push_str(&format!("- Utterances: `{}`\n", report.records.len()));
    md.push_str(&format!(
        "- Thresholds: ambiguous `{}`, low confidence `{}`, multi-label `{}`, unknown `{}`\n\n",
        thresholds.ambiguous_closeness,
        thresholds.low_confidence,
        thresholds.multi_label,
        thresholds.unknown_label
    ));
    md.push_str(&report.summary());
    md.push_str("\n\n");

    md.push_str("## Averages\n\n");
    md.push_str("| average | labels | precision | recall | f1 |\n");
    md.push_str("|---|---:|---:|---:|---:|\n");
    for (name, avg) in [("macro", macro_avg), ("micro", micro)] {
        md.push_str(&format!(
            "| {name} | `{}` | `{:.3}` | `{:.3}` | `{:.3}` |\n",
            avg.labels, avg.precision, avg.recall, avg.f1
        ));
    }
    md.push('\n');

    md.push_str("## Labels\n\n");
    md.push_str("| label | tp | fp | fn | precision | recall | f1 |\n");
    md.push_str("|---|---:|---:|---:|---:|---:|---:|\n");
    for metrics in report.confusion.metrics() {
        if !metrics.counts.is_active() {
            continue;
        }
        md.push_str(&format!(
            "| `{}` | `{}` | `{}` | `{}` | `{:.3}` | `{:.3}` | `{:.3}` |\n",
            escape_cell(&metrics.label),
            metrics.counts.true_positives,
            metrics.counts.false_positives,
            metrics.counts.false_negatives,
            metrics.precision,
            metrics.recall,
            metrics.f1
        ));
    }
    md.push('\n');

    for bucket in Bucket::ALL {
        render_bucket(&mut md, bucket, report.bucket(bucket));
    }
    md
}

fn render_bucket(md: &mut String, bucket: Bucket, records: &[PredictionRecord]) {
    md.push_str(&format!("## {bucket} ({})\n\n", records.len()));
    if records.is_empty() {
        md.push_str("_none_\n\n");
        return;
    }
    md.push_str("| # | utterance | truth | predicted | top score |\n");
    md.push_str("|---:|---|---|---|---:|\n");
    for (index, record) in records.iter().take(MAX_BUCKET_ROWS).enumerate() {
        md.push_str(&format!(
            "| {index} | {} | `{}` | `{}` | `{:.3}` |\n",
            escape_cell(&truncate_one_line(&record.utterance, 120)),
            escape_cell(&record.ground_truth_labels.join(", ")),
            escape_cell(&record.predicted_labels.join(", ")),
            record.top_score()
        ));
    }
    if records.len() > MAX_BUCKET_ROWS {
        md.push_str(&format!(
            "\n{} more in the JSON summary.\n",
            records.len() - MAX_BUCKET_ROWS
        ));
    }
    md.push('\n');
}

fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let mut s = text.replace(['\n', '\r', '\t'], " ");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
