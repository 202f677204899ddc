//! # Long Text Analyzer CLI (`lta`)
//!
//! Analyze long documents and interview transcripts with a local model.
//!
//! ## Usage
//!
//! ```bash
//! lta --config ./config/lta.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lta init` | Write a commented default configuration file |
//! | `lta analyze <file>` | Analyze one document and write its report |
//! | `lta batch <dir>` | Analyze every matching file in a directory concurrently |
//! | `lta models` | List the models installed on the backend |
//!
//! ## Examples
//!
//! ```bash
//! # Interview analysis of a single transcript, custom report path
//! lta analyze ep-12.txt --kind interview --output reports/ep-12.md
//!
//! # Batch over a directory with four workers, no confirmation prompt
//! lta batch ./transcripts --workers 4 --yes
//!
//! # Machine-readable progress on stderr
//! lta batch ./notes --extensions txt,md --progress json --yes
//! ```

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use long_text_analyzer::batch::{
    analyze_document, watch_interrupts, BatchDriver, BatchOptions, BatchSummary, ReportTarget,
};
use long_text_analyzer::config::{self, Config, DEFAULT_CONFIG_PATH};
use long_text_analyzer::discover;
use long_text_analyzer::extract::{AnalysisSettings, Extractor};
use long_text_analyzer::llm::OllamaClient;
use long_text_analyzer::models::{AnalysisKind, AnalysisOutput, Document};
use long_text_analyzer::progress::{format_number, ProgressMode};
use long_text_analyzer::report::{self, RunInfo};

/// Long Text Analyzer: keyword, summary, topic, sentiment and speaker
/// extraction for long documents, backed by a local Ollama model.
#[derive(Parser)]
#[command(
    name = "lta",
    about = "Analyze long documents and interview transcripts with a local language model",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lta.toml`; built-in defaults apply when that
    /// file does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug-level logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented default configuration file.
    ///
    /// Refuses to overwrite an existing file.
    Init,

    /// Analyze a single document.
    ///
    /// Prints a short digest and writes a markdown report, by default
    /// `<stem>_<kind>_report.md` next to the input.
    Analyze {
        /// Text file to analyze.
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = AnalysisKind::General)]
        kind: AnalysisKind,

        /// Report path.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Override `[backend].model`.
        #[arg(long)]
        model: Option<String>,

        /// Override `[backend].url`.
        #[arg(long)]
        url: Option<String>,
    },

    /// Analyze every matching file under a directory.
    ///
    /// Writes one report per document plus a batch summary (markdown) and
    /// the per-document outcomes (JSON). Individual document failures are
    /// listed in the summary and never change the exit code.
    Batch {
        /// Directory to scan (recursively).
        dir: PathBuf,

        #[arg(long, value_enum, default_value_t = AnalysisKind::General)]
        kind: AnalysisKind,

        /// Documents analyzed concurrently. Overrides `[batch].workers`.
        #[arg(long)]
        workers: Option<usize>,

        /// Where reports and batch outputs go. Defaults to beside each input.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// File extensions to include, e.g. `txt,md`.
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,

        /// Progress output on stderr. Defaults to human when stderr is a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Override `[backend].model`.
        #[arg(long)]
        model: Option<String>,

        /// Override `[backend].url`.
        #[arg(long)]
        url: Option<String>,
    },

    /// List models installed on the backend.
    Models {
        /// Override `[backend].url`.
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init => write_config_template(&cli.config)?,
        Commands::Analyze {
            file,
            kind,
            output,
            model,
            url,
        } => {
            let mut cfg = config::read_config_or_default(&cli.config)?;
            apply_backend_overrides(&mut cfg, model, url);
            config::validate(&cfg)?;
            run_analyze(&cfg, &file, kind, output)?;
        }
        Commands::Batch {
            dir,
            kind,
            workers,
            output_dir,
            extensions,
            yes,
            progress,
            model,
            url,
        } => {
            let mut cfg = config::read_config_or_default(&cli.config)?;
            apply_backend_overrides(&mut cfg, model, url);
            if let Some(workers) = workers {
                cfg.batch.workers = workers;
            }
            if let Some(extensions) = extensions {
                cfg.batch.extensions = extensions;
            }
            if output_dir.is_some() {
                cfg.batch.output_dir = output_dir;
            }
            config::validate(&cfg)?;
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            run_batch(&cfg, &dir, kind, yes, progress)?;
        }
        Commands::Models { url } => {
            let mut cfg = config::read_config_or_default(&cli.config)?;
            apply_backend_overrides(&mut cfg, None, url);
            config::validate(&cfg)?;
            run_models(&cfg)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_backend_overrides(cfg: &mut Config, model: Option<String>, url: Option<String>) {
    if let Some(model) = model {
        cfg.backend.model = model;
    }
    if let Some(url) = url {
        cfg.backend.url = url;
    }
}

// ============ init ============

fn write_config_template(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, config::CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

// ============ analyze ============

fn run_analyze(cfg: &Config, file: &Path, kind: AnalysisKind, output: Option<PathBuf>) -> Result<()> {
    let document = Document::read(file)?;
    if document.is_blank() {
        bail!("{} is empty", file.display());
    }

    let client = Arc::new(OllamaClient::new(&cfg.backend)?);
    let extractor = Extractor::new(client, AnalysisSettings::from_config(cfg));
    let result = analyze_document(&extractor, kind, &document)
        .with_context(|| format!("Analysis of {} failed", file.display()))?;

    let report_path = match output {
        Some(path) => {
            report::write_report_to(&path, &document, &result, &cfg.backend.model)?;
            path
        }
        None => {
            let dir = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            report::write_report(dir, &document, &result, &cfg.backend.model)?
        }
    };

    print_digest(&document, &result);
    println!("\nReport written to {}", report_path.display());
    Ok(())
}

fn print_digest(document: &Document, output: &AnalysisOutput) {
    let base = output.base();
    println!("{} ({} analysis)", document.name, output.kind());
    println!("  words:        {}", format_number(base.word_count as u64));
    println!("  reading time: {} min", base.reading_time_minutes);
    println!("  sentiment:    {}", base.sentiment);
    println!(
        "  keywords:     {}",
        base.keywords.iter().take(10).cloned().collect::<Vec<_>>().join(", ")
    );
    if !base.speakers.is_empty() {
        println!("  speakers:     {}", base.speakers.join(", "));
    }
    for (i, topic) in base.key_topics.iter().enumerate() {
        println!("  topic {}:      {}", i + 1, topic);
    }
    if let AnalysisOutput::Interview(interview) = output {
        println!("  type:         {}", interview.interview_type);
        println!("  duration:     ~{} min", interview.duration_estimate_minutes);
        println!("  style:        {}", interview.interaction_style);
        println!("  insights:     {}", interview.main_insights.len());
        println!("  quotes:       {}", interview.quotes.len());
    }
}

// ============ batch ============

fn run_batch(
    cfg: &Config,
    dir: &Path,
    kind: AnalysisKind,
    yes: bool,
    progress: ProgressMode,
) -> Result<()> {
    let documents = discover::find_documents(dir, &cfg.batch.extensions)?;
    if documents.is_empty() {
        bail!(
            "No files with extensions [{}] found in {}",
            cfg.batch.extensions.join(", "),
            dir.display()
        );
    }

    println!(
        "Found {} files to analyze in {} ({} analysis, model {})",
        documents.len(),
        dir.display(),
        kind,
        cfg.backend.model
    );
    if !yes && !confirm(&format!("Process {} files?", documents.len()))? {
        println!("Cancelled.");
        return Ok(());
    }

    let client = Arc::new(OllamaClient::new(&cfg.backend)?);
    let driver = BatchDriver::new(client, AnalysisSettings::from_config(cfg));
    let options = BatchOptions {
        kind,
        workers: cfg.batch.workers,
        reports: match &cfg.batch.output_dir {
            Some(out) => ReportTarget::Directory(out.clone()),
            None => ReportTarget::BesideDocument,
        },
        model: cfg.backend.model.clone(),
    };
    let info = RunInfo::new(cfg.backend.model.clone(), kind);
    let reporter = progress.reporter();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let outcomes = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, on_signal).await {
                std::process::exit(130);
            }
        });
        driver
            .run(documents, &options, &cancel, reporter.as_ref())
            .await
    });
    drop(runtime);

    let summary = BatchSummary::from_outcomes(&outcomes);
    let out_dir = cfg.batch.output_dir.clone().unwrap_or_else(|| dir.to_path_buf());
    let (summary_path, json_path) =
        report::write_batch_outputs(&out_dir, &summary, &outcomes, &info)?;

    println!(
        "\nProcessed {} files: {} succeeded, {} failed, {} words",
        summary.total,
        summary.succeeded,
        summary.failed,
        format_number(summary.total_words as u64)
    );
    for failure in &summary.failures {
        println!("  failed: {}: {}", failure.document.display(), failure.error);
    }
    println!("Summary: {}", summary_path.display());
    println!("Results: {}", json_path.display());
    Ok(())
}

/// `[y/N]` prompt on stdout; anything but `y`/`yes` declines.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

// ============ models ============

fn run_models(cfg: &Config) -> Result<()> {
    let client = OllamaClient::new(&cfg.backend)?;
    let models = client
        .list_models()
        .with_context(|| format!("Backend at {} is not reachable", client.base_url()))?;

    println!("Backend: {}", client.base_url());
    if models.is_empty() {
        println!("No models installed.");
        return Ok(());
    }
    let configured = |name: &str| {
        name == client.model() || name.starts_with(&format!("{}:", client.model()))
    };
    for name in &models {
        println!("{} {}", if configured(name) { "*" } else { " " }, name);
    }
    if !models.iter().any(|m| configured(m)) {
        tracing::warn!(model = %client.model(), "Configured model is not installed on the backend");
    }
    Ok(())
}
