use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use intent_corpus::{
    load_snapshot, write_label_utterances, write_snapshot, IngestOptions, Ingestor,
};
use intent_eval::{
    evaluate, EvaluationReport, ExampleScorer, PredictSession, ScoreResult, Scorer, Thresholds,
};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

mod report;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "intent")]
#[command(about = "Build intent corpora and evaluate classifiers against them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file or directory and write a dataset snapshot
    Create(CreateArgs),

    /// Leave-one-out evaluation of a snapshot against itself
    Evaluate(EvaluateArgs),

    /// Evaluate a held-out test set against a training snapshot
    Test(TestArgs),

    /// Score one utterance and optionally relabel it
    Predict(PredictArgs),
}

#[derive(Args)]
struct CreateArgs {
    /// Corpus file or directory (.lu, .qna, .json, .tsv, .txt, .blu)
    #[arg(short, long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    out: PathBuf,

    /// Label utterances by the name of the file they came from
    #[arg(long)]
    hierarchical: bool,

    /// Write `key<TAB>label<TAB>utterances` rows instead of a snapshot
    #[arg(long)]
    dte: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Training snapshot (.blu)
    #[arg(short, long = "in", value_name = "FILE")]
    input: PathBuf,

    /// Report directory
    #[arg(short, long, value_name = "DIR")]
    out: PathBuf,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct TestArgs {
    /// Training snapshot (.blu)
    #[arg(short, long = "in", value_name = "FILE")]
    input: PathBuf,

    /// Test corpus file or directory
    #[arg(short, long, value_name = "PATH")]
    test: PathBuf,

    /// Report directory
    #[arg(short, long, value_name = "DIR")]
    out: PathBuf,

    /// Label test utterances by the name of the file they came from
    #[arg(long)]
    hierarchical: bool,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct PredictArgs {
    /// Training snapshot (.blu)
    #[arg(short, long = "in", value_name = "FILE")]
    input: PathBuf,

    /// Utterance to score
    #[arg(short, long)]
    utterance: String,

    /// Teach the utterance under these labels (names or label positions, comma separated)
    #[arg(long, value_name = "LABELS", conflicts_with = "change")]
    add: Option<String>,

    /// Replace the utterance's current labels with these
    #[arg(long, value_name = "LABELS")]
    change: Option<String>,

    /// Write the updated snapshot here
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct ThresholdArgs {
    /// Thresholds file (JSON or TOML)
    #[arg(long, value_name = "FILE", env = "INTENT_CONFIG")]
    config: Option<PathBuf>,

    /// Top-two score gap under which an utterance is ambiguous
    #[arg(long, env = "INTENT_AMBIGUOUS_CLOSENESS")]
    ambiguous_closeness: Option<f64>,

    /// Top score under which an utterance is low confidence
    #[arg(long, env = "INTENT_LOW_CONFIDENCE")]
    low_confidence: Option<f64>,

    /// Score at which every label is predicted
    #[arg(long, env = "INTENT_MULTI_LABEL")]
    multi_label: Option<f64>,

    /// Top score under which UNKNOWN is predicted
    #[arg(long, env = "INTENT_UNKNOWN_LABEL")]
    unknown_label: Option<f64>,
}

impl ThresholdArgs {
    fn resolve(&self) -> Result<Thresholds> {
        let mut thresholds = match &self.config {
            Some(path) => Thresholds::from_file(path)
                .with_context(|| format!("Failed to load thresholds from {}", path.display()))?,
            None => Thresholds::default(),
        };
        if let Some(value) = self.ambiguous_closeness {
            thresholds.ambiguous_closeness = value;
        }
        if let Some(value) = self.low_confidence {
            thresholds.low_confidence = value;
        }
        if let Some(value) = self.multi_label {
            thresholds.multi_label = value;
        }
        if let Some(value) = self.unknown_label {
            thresholds.unknown_label = value;
        }
        thresholds.validate()?;
        log::debug!("Using thresholds {thresholds:?}");
        Ok(thresholds)
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Create(args) => run_create(args)?,
        Commands::Evaluate(args) => run_evaluate(args).await?,
        Commands::Test(args) => run_test(args).await?,
        Commands::Predict(args) => run_predict(args).await?,
    }

    Ok(())
}

fn run_create(args: CreateArgs) -> Result<()> {
    let options = IngestOptions {
        hierarchical: args.hierarchical,
    };
    let (dataset, stats) = Ingestor::new(options)
        .ingest_with_stats(&args.input)
        .with_context(|| format!("Failed to ingest {}", args.input.display()))?;

    let contents = if args.dte {
        write_label_utterances(&dataset)
    } else {
        write_snapshot(&dataset)
    }
    .with_context(|| format!("Failed to export {}", args.input.display()))?;
    write_file(&args.out, &contents)?;

    log::info!(
        "Wrote {} utterances ({} labels, {} files) to {}",
        dataset.len(),
        dataset.vocabulary().len(),
        stats.files,
        args.out.display()
    );
    Ok(())
}

fn load_scorer(path: &Path) -> Result<(intent_corpus::Dataset, ExampleScorer)> {
    let dataset = load_snapshot(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    let scorer = ExampleScorer::from_dataset(&dataset);
    Ok((dataset, scorer))
}

async fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let thresholds = args.thresholds.resolve()?;
    let (dataset, mut scorer) = load_scorer(&args.input)?;
    scorer.set_ignore_same_example(true);

    let report = evaluate(&dataset.vocabulary(), &dataset, &scorer, &thresholds)
        .await
        .context("Evaluation failed")?;
    finish_report(&report, &args.out, "evaluation", &args.input)
}

async fn run_test(args: TestArgs) -> Result<()> {
    let thresholds = args.thresholds.resolve()?;
    let (training, scorer) = load_scorer(&args.input)?;
    let options = IngestOptions {
        hierarchical: args.hierarchical,
    };
    let test = intent_corpus::ingest(&args.test, options)
        .with_context(|| format!("Failed to ingest test set {}", args.test.display()))?;

    // Test labels outside the training vocabulary resolve to UNKNOWN inside `evaluate`.
    let report = evaluate(&training.vocabulary(), &test, &scorer, &thresholds)
        .await
        .context("Evaluation failed")?;
    finish_report(&report, &args.out, "test", &args.input)
}

fn finish_report(report: &EvaluationReport, out: &Path, prefix: &str, source: &Path) -> Result<()> {
    let files = report::write_report_files(out, prefix, source, report)?;
    for file in &files {
        log::info!("Wrote {}", file.display());
    }
    print_stdout(&report.summary())
}

#[derive(Serialize)]
struct PredictOutput<'a> {
    utterance: &'a str,
    labels: &'a [String],
    scores: Vec<ScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<bool>,
}

async fn run_predict(args: PredictArgs) -> Result<()> {
    let thresholds = args.thresholds.resolve()?;
    let (_, scorer) = load_scorer(&args.input)?;
    let mut session = PredictSession::new(scorer, thresholds);
    session.set_utterance(args.utterance.as_str());
    session.find()?;

    let updated = if let Some(labels) = &args.add {
        session.set_new_labels([labels]);
        Some(session.add()?)
    } else if let Some(labels) = &args.change {
        session.set_new_labels([labels]);
        Some(session.change()?)
    } else {
        None
    };

    let scores = session.predict().await?;
    let output = PredictOutput {
        utterance: &args.utterance,
        labels: session.current_labels(),
        scores,
        updated,
    };
    print_stdout(&serde_json::to_string_pretty(&output)?)?;

    if let Some(path) = &args.save {
        let bytes = session.snapshot()?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved snapshot to {}", path.display());
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
