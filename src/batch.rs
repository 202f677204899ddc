//! Concurrent batch analysis over many documents.
//!
//! # Execution model
//!
//! ```text
//! documents ──► dispatch (≤ workers in flight) ──► spawn_blocking(analyze + report)
//!                     ▲                                   │
//!                     └──── join_next (completion order) ◄┘
//! ```
//!
//! Every document runs as its own blocking task inside a [`JoinSet`]; the
//! driver's join loop is the only place outcomes are collected, so no task
//! touches shared state. Any error, including a panic inside a task, becomes
//! an error [`BatchOutcome`] for that document and never reaches the others.
//!
//! Cancellation stops dispatch only: tasks already running finish and their
//! outcomes are kept. [`watch_interrupts`] turns a first interrupt into that
//! cancellation and reports a second one so the caller can exit at once.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::AnalysisError;
use crate::extract::{AnalysisSettings, Extractor};
use crate::interview::InterviewAnalyzer;
use crate::llm::InferenceClient;
use crate::models::{AnalysisKind, AnalysisOutput, BatchOutcome, Document, Sentiment};
use crate::progress::{BatchProgressEvent, BatchProgressReporter};
use crate::report;

/// Where per-document markdown reports go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    /// Do not write reports.
    Skip,
    /// Next to each input document.
    BesideDocument,
    /// All reports in one directory.
    Directory(PathBuf),
}

impl ReportTarget {
    fn dir_for(&self, document: &Path) -> Option<PathBuf> {
        match self {
            ReportTarget::Skip => None,
            ReportTarget::BesideDocument => Some(
                document
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
            ReportTarget::Directory(dir) => Some(dir.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub kind: AnalysisKind,
    pub workers: usize,
    pub reports: ReportTarget,
    /// Model name printed in report headers.
    pub model: String,
}

/// Run the pipeline selected by `kind` over one already-read document.
pub fn analyze_document(
    extractor: &Extractor,
    kind: AnalysisKind,
    document: &Document,
) -> Result<AnalysisOutput, AnalysisError> {
    if document.is_blank() {
        return Err(AnalysisError::EmptyDocument);
    }
    match kind {
        AnalysisKind::General => extractor.analyze(document).map(AnalysisOutput::General),
        AnalysisKind::Interview => InterviewAnalyzer::from_extractor(extractor.clone())
            .analyze(document)
            .map(AnalysisOutput::Interview),
    }
}

pub struct BatchDriver {
    extractor: Extractor,
}

impl BatchDriver {
    pub fn new(client: Arc<dyn InferenceClient>, settings: AnalysisSettings) -> Self {
        Self {
            extractor: Extractor::new(client, settings),
        }
    }

    /// Analyze `documents` with at most `options.workers` in flight.
    ///
    /// Returns one outcome per dispatched document, in completion order.
    /// Without cancellation that is every document.
    pub async fn run(
        &self,
        documents: Vec<PathBuf>,
        options: &BatchOptions,
        cancel: &CancellationToken,
        progress: &dyn BatchProgressReporter,
    ) -> Vec<BatchOutcome> {
        let total = documents.len();
        let workers = options.workers.max(1);
        progress.report(BatchProgressEvent::Discovered {
            total: total as u64,
        });
        tracing::info!(documents = total, workers, kind = %options.kind, "Starting batch");

        let mut pending = documents.into_iter();
        let mut in_flight: JoinSet<BatchOutcome> = JoinSet::new();
        let mut dispatched: HashMap<tokio::task::Id, PathBuf> = HashMap::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut stopping = false;

        loop {
            stopping |= cancel.is_cancelled();
            while !stopping && in_flight.len() < workers {
                let Some(path) = pending.next() else { break };
                let extractor = self.extractor.clone();
                let kind = options.kind;
                let report_dir = options.reports.dir_for(&path);
                let model = options.model.clone();
                let task_path = path.clone();
                let handle = in_flight.spawn_blocking(move || {
                    process_document(&extractor, kind, &task_path, report_dir.as_deref(), &model)
                });
                dispatched.insert(handle.id(), path);
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;

                _ = cancel.cancelled(), if !stopping => {
                    tracing::warn!(
                        in_flight = in_flight.len(),
                        "Cancellation requested; waiting for running documents"
                    );
                    stopping = true;
                    continue;
                }

                joined = in_flight.join_next_with_id() => joined,
            };

            let outcome = match joined {
                Some(Ok((id, outcome))) => {
                    dispatched.remove(&id);
                    outcome
                }
                Some(Err(join_error)) => {
                    let path = dispatched.remove(&join_error.id()).unwrap_or_default();
                    tracing::error!(document = %path.display(), error = %join_error, "Document task failed");
                    BatchOutcome::failure(path, options.kind, format!("task failed: {}", join_error))
                }
                None => break,
            };

            progress.report(BatchProgressEvent::Completed {
                document: outcome.document.clone(),
                n: outcomes.len() as u64 + 1,
                total: total as u64,
                success: outcome.is_success(),
            });
            outcomes.push(outcome);
        }

        if stopping {
            tracing::warn!(
                completed = outcomes.len(),
                skipped = total - outcomes.len(),
                "Batch cancelled"
            );
        }
        outcomes
    }
}

/// Cancel `cancel` on the first interrupt, then wait for another one.
///
/// Returns `true` when a second interrupt arrives, `false` when waiting for
/// interrupts fails (e.g. no signal handler could be installed).
pub async fn watch_interrupts<I, Fut>(mut interrupted: I, cancel: CancellationToken) -> bool
where
    I: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupted().await {
        tracing::debug!(error = %e, "Interrupt handler unavailable");
        return false;
    }
    tracing::warn!("Interrupted: finishing running documents, press Ctrl-C again to exit now");
    cancel.cancel();

    interrupted().await.is_ok()
}

/// Body of one batch task: read, analyze, write the report.
fn process_document(
    extractor: &Extractor,
    kind: AnalysisKind,
    path: &Path,
    report_dir: Option<&Path>,
    model: &str,
) -> BatchOutcome {
    let result = Document::read(path).and_then(|document| {
        let output = analyze_document(extractor, kind, &document)?;
        let report_path = match report_dir {
            Some(dir) => Some(report::write_report(dir, &document, &output, model)?),
            None => None,
        };
        Ok((output, report_path))
    });

    match result {
        Ok((output, report_path)) => {
            tracing::info!(document = %path.display(), "Document analyzed");
            BatchOutcome::success(path.to_path_buf(), output, report_path)
        }
        Err(e) => {
            tracing::warn!(document = %path.display(), error = %e, "Document failed");
            BatchOutcome::failure(path.to_path_buf(), kind, e)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedDocument {
    pub document: PathBuf,
    pub error: String,
}

/// Aggregate view over the outcomes of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_words: usize,
    /// Mean keyword count over successful documents, 0.0 when there are none.
    pub average_keywords: f64,
    pub sentiment: BTreeMap<Sentiment, usize>,
    pub failures: Vec<FailedDocument>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut succeeded = 0;
        let mut total_words = 0;
        let mut keyword_total = 0;
        let mut sentiment = BTreeMap::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            match outcome.result.as_ref().filter(|_| outcome.is_success()) {
                Some(output) => {
                    let base = output.base();
                    succeeded += 1;
                    total_words += base.word_count;
                    keyword_total += base.keywords.len();
                    *sentiment.entry(base.sentiment).or_insert(0) += 1;
                }
                None => failures.push(FailedDocument {
                    document: outcome.document.clone(),
                    error: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                }),
            }
        }

        let average_keywords = if succeeded == 0 {
            0.0
        } else {
            keyword_total as f64 / succeeded as f64
        };

        Self {
            total: outcomes.len(),
            succeeded,
            failed: failures.len(),
            total_words,
            average_keywords,
            sentiment,
            failures,
        }
    }

    /// Share of `count` in the total, as a percentage.
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}
