use crate::dataset::{Assignment, Dataset};
use crate::error::{CorpusError, Result};
use crate::format::{Record, SourceFormat, SUPPORTED_EXTENSIONS};
use crate::normalize::{normalize, NormalizeMode};
use crate::stats::IngestStats;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Label every utterance with the stem of the file it came from.
    pub hierarchical: bool,
}

/// Ingest `path` and apply blocklist normalization.
pub fn ingest(path: impl AsRef<Path>, options: IngestOptions) -> Result<Dataset> {
    Ingestor::new(options)
        .ingest_with_stats(path)
        .map(|(dataset, _)| dataset)
}

/// Ingest `path` without normalizing labels.
pub fn ingest_raw(path: impl AsRef<Path>, options: IngestOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let mut ingestor = Ingestor::new(options);
    ingestor.add_path(path)?;
    let (dataset, _) = ingestor.finish(path)?;
    Ok(dataset)
}

/// Single ingestion run; the visited set spans every path added to it.
pub struct Ingestor {
    options: IngestOptions,
    visited: HashSet<PathBuf>,
    sections: HashSet<(PathBuf, String)>,
    dataset: Dataset,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(options: IngestOptions) -> Self {
        Self {
            options,
            visited: HashSet::new(),
            sections: HashSet::new(),
            dataset: Dataset::new(),
            stats: IngestStats::new(),
        }
    }

    /// Ingest, normalize, and report what was folded.
    pub fn ingest_with_stats(mut self, path: impl AsRef<Path>) -> Result<(Dataset, IngestStats)> {
        let path = path.as_ref();
        let started = Instant::now();
        self.add_path(path)?;
        let (mut dataset, stats) = self.finish(path)?;
        normalize(&mut dataset, NormalizeMode::Blocklist);
        log::info!(
            "Ingested {} utterances from {} files ({} skipped, {} pairs, {} repeats) in {} ms",
            dataset.len(),
            stats.files,
            stats.skipped,
            stats.pairs,
            stats.repeats,
            started.elapsed().as_millis()
        );
        Ok((dataset, stats))
    }

    /// Fold a top-level file or directory.
    pub fn add_path(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() {
            return self.walk(path);
        }
        if !path.is_file() {
            return Err(CorpusError::InvalidPath(path.display().to_string()));
        }
        let format = SourceFormat::from_path(path).ok_or_else(|| {
            CorpusError::UnsupportedExtension {
                path: path.to_path_buf(),
                supported: SUPPORTED_EXTENSIONS.join(", "),
            }
        })?;
        self.process_file(path, format)?;
        Ok(())
    }

    fn walk(&mut self, dir: &Path) -> Result<()> {
        let walker = WalkDir::new(dir).follow_links(true).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.loop_ancestor().is_some() => {
                    log::warn!("Skipping symlink loop: {err}");
                    continue;
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| dir.to_path_buf());
                    return Err(CorpusError::io(path, err.into()));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(format) = SourceFormat::from_path(path).filter(|f| f.is_walkable()) else {
                log::debug!("Skipping unsupported file {}", path.display());
                self.stats.add_skipped();
                continue;
            };
            if !self.process_file(path, format)? {
                log::debug!("Skipping already processed {}", path.display());
                self.stats.add_skipped();
            }
        }
        Ok(())
    }

    /// Returns `false` when the file had already been folded in this run.
    fn process_file(&mut self, path: &Path, format: SourceFormat) -> Result<bool> {
        let canonical = path
            .canonicalize()
            .map_err(|source| CorpusError::io(path, source))?;
        if !self.visited.insert(canonical) {
            return Ok(false);
        }

        let contents =
            std::fs::read_to_string(path).map_err(|source| CorpusError::io(path, source))?;
        let parsed = format.parse(path, &contents)?;
        let file_label = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let hierarchical = self.options.hierarchical && format != SourceFormat::Snapshot;

        log::debug!(
            "Folding {} records from {} ({})",
            parsed.records.len(),
            path.display(),
            format.as_str()
        );
        fold_records(
            &mut self.dataset,
            parsed.records,
            file_label,
            hierarchical,
            &mut self.stats,
        );
        self.stats.add_file(format.as_str());

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for import in parsed.imports {
            let target = base.join(&import.path);
            match (SourceFormat::from_path(&target), import.section) {
                (Some(SourceFormat::Lu), Some(section)) => {
                    self.import_section(&target, &section)?;
                }
                (Some(format), _) if format.is_walkable() => {
                    self.process_file(&target, format)?;
                }
                _ => log::warn!(
                    "Ignoring import {} from {}: unsupported extension",
                    import.path,
                    path.display()
                ),
            }
        }
        Ok(true)
    }

    /// Fold one intent section of an `.lu` file. The file stays unvisited, so a directory
    /// walk can still fold it whole.
    fn import_section(&mut self, path: &Path, section: &str) -> Result<()> {
        let canonical = path
            .canonicalize()
            .map_err(|source| CorpusError::io(path, source))?;
        if self.visited.contains(&canonical)
            || !self.sections.insert((canonical, section.to_string()))
        {
            return Ok(());
        }

        let contents =
            std::fs::read_to_string(path).map_err(|source| CorpusError::io(path, source))?;
        let mut parsed = SourceFormat::Lu.parse(path, &contents)?;
        parsed.retain_section(section);
        if parsed.records.is_empty() {
            log::warn!("Section '{section}' not found in {}", path.display());
            return Ok(());
        }

        log::debug!(
            "Folding {} records of section '{section}' from {}",
            parsed.records.len(),
            path.display()
        );
        let file_label = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        fold_records(
            &mut self.dataset,
            parsed.records,
            file_label,
            self.options.hierarchical,
            &mut self.stats,
        );
        Ok(())
    }

    fn finish(self, path: &Path) -> Result<(Dataset, IngestStats)> {
        if self.dataset.is_empty() {
            return Err(CorpusError::EmptyDataset {
                path: path.to_path_buf(),
            });
        }
        Ok((self.dataset, self.stats))
    }
}

/// Fold adapter records into `dataset`. In hierarchical mode every record takes
/// `file_label`; otherwise intents keep their own label and questions get an empty one,
/// which normalization resolves to `UNKNOWN`.
pub(crate) fn fold_records(
    dataset: &mut Dataset,
    records: Vec<Record>,
    file_label: &str,
    hierarchical: bool,
    stats: &mut IngestStats,
) {
    for record in records {
        let assignment = match record {
            Record::Intent { utterance, label } => {
                let label: &str = if hierarchical { file_label } else { &label };
                stats.pairs += 1;
                dataset.insert(&utterance, label)
            }
            Record::Question { utterance } => {
                let label = if hierarchical { file_label } else { "" };
                stats.pairs += 1;
                dataset.insert(&utterance, label)
            }
            Record::Entity { utterance, entity } => {
                if dataset.insert_entity(&utterance, entity) != Assignment::Repeated {
                    stats.entities += 1;
                }
                continue;
            }
        };
        if assignment == Assignment::Repeated {
            stats.repeats += 1;
        }
    }
}
