//! Markdown reports and JSON export of analysis results.
//!
//! Rendering is pure string building over already-computed results. The
//! write helpers create the target directory when it does not exist yet.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::batch::BatchSummary;
use crate::error::AnalysisError;
use crate::models::{
    AnalysisKind, AnalysisOutput, AnalysisResult, BatchOutcome, Document, InterviewAnalysisResult,
};
use crate::progress::format_number;

/// `<stem>_<kind>_report.md` for a document path.
pub fn report_file_name(document: &Path, kind: AnalysisKind) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    format!("{}_{}_report.md", stem, kind)
}

/// Render and write the report for one document into `dir`.
pub fn write_report(
    dir: &Path,
    document: &Document,
    output: &AnalysisOutput,
    model: &str,
) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(report_file_name(&document.path, output.kind()));
    write_report_to(&path, document, output, model)?;
    Ok(path)
}

/// Render and write the report for one document to an explicit path.
pub fn write_report_to(
    path: &Path,
    document: &Document,
    output: &AnalysisOutput,
    model: &str,
) -> Result<(), AnalysisError> {
    let markdown = render_report(&document.name, output, model, Utc::now());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    std::fs::write(path, markdown).map_err(|e| AnalysisError::io(path, e))
}

pub fn render_report(
    name: &str,
    output: &AnalysisOutput,
    model: &str,
    generated_at: DateTime<Utc>,
) -> String {
    match output {
        AnalysisOutput::General(result) => render_general_report(name, result, model, generated_at),
        AnalysisOutput::Interview(result) => {
            render_interview_report(name, result, model, generated_at)
        }
    }
}

// ============ Per-document reports ============

pub fn render_general_report(
    name: &str,
    result: &AnalysisResult,
    model: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Text Analysis Report: {}\n", name);
    write_header(&mut md, model, generated_at);

    md.push_str("## Statistics\n\n");
    let _ = writeln!(md, "- **Word count**: {}", format_number(result.word_count as u64));
    let _ = writeln!(
        md,
        "- **Estimated reading time**: {} minutes",
        result.reading_time_minutes
    );
    let _ = writeln!(md, "- **Overall sentiment**: {}\n", result.sentiment);

    write_inline_list(&mut md, "Keywords", &result.keywords);
    write_numbered(&mut md, "Key Topics", &result.key_topics);
    if !result.speakers.is_empty() {
        write_bullets(&mut md, "Speakers", &result.speakers);
    }

    md.push_str("## Detailed Summary\n\n");
    md.push_str(result.summary.trim());
    md.push('\n');
    md
}

pub fn render_interview_report(
    name: &str,
    result: &InterviewAnalysisResult,
    model: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let base = &result.base;
    let mut md = String::new();
    let _ = writeln!(md, "# Interview Analysis Report: {}\n", name);
    write_header(&mut md, model, generated_at);

    md.push_str("## General Information\n\n");
    let _ = writeln!(md, "- **Interview type**: {}", result.interview_type);
    let _ = writeln!(
        md,
        "- **Estimated duration**: {} minutes",
        result.duration_estimate_minutes
    );
    let _ = writeln!(md, "- **Interaction style**: {}", result.interaction_style);
    let _ = writeln!(md, "- **Word count**: {}", format_number(base.word_count as u64));
    let _ = writeln!(md, "- **Overall sentiment**: {}\n", base.sentiment);

    if !base.speakers.is_empty() {
        write_bullets(&mut md, "Participants", &base.speakers);
    }
    write_numbered(&mut md, "Main Insights", &result.main_insights);

    md.push_str("## Highlighted Quotes\n\n");
    if result.quotes.is_empty() {
        md.push_str("_None_\n\n");
    } else {
        for quote in &result.quotes {
            let _ = writeln!(md, "> \"{}\"\n", quote);
        }
    }

    write_bullets(&mut md, "Question Themes", &result.question_themes);
    write_inline_list(&mut md, "Keywords", &base.keywords);
    write_numbered(&mut md, "Key Topics", &base.key_topics);

    md.push_str("## Detailed Summary\n\n");
    md.push_str(base.summary.trim());
    md.push('\n');
    md
}

fn write_header(md: &mut String, model: &str, generated_at: DateTime<Utc>) {
    let _ = writeln!(
        md,
        "**Generated**: {}  \n**Model**: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        model
    );
}

fn write_inline_list(md: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(md, "## {}\n", title);
    if items.is_empty() {
        md.push_str("_None_\n\n");
    } else {
        let _ = writeln!(md, "{}\n", items.join(", "));
    }
}

fn write_numbered(md: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(md, "## {}\n", title);
    if items.is_empty() {
        md.push_str("_None_\n");
    }
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", i + 1, item);
    }
    md.push('\n');
}

fn write_bullets(md: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(md, "## {}\n", title);
    if items.is_empty() {
        md.push_str("_None_\n");
    }
    for item in items {
        let _ = writeln!(md, "- {}", item);
    }
    md.push('\n');
}

// ============ Batch outputs ============

/// Identity of one batch run, printed in the summary.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub model: String,
    pub kind: AnalysisKind,
    pub started_at: DateTime<Utc>,
}

impl RunInfo {
    pub fn new(model: impl Into<String>, kind: AnalysisKind) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            model: model.into(),
            kind,
            started_at: Utc::now(),
        }
    }

    /// `(summary.md, results.json)` paths for this run inside `dir`.
    pub fn output_paths(&self, dir: &Path) -> (PathBuf, PathBuf) {
        let stamp = self.started_at.format("%Y%m%d_%H%M%S");
        (
            dir.join(format!("batch_analysis_summary_{}.md", stamp)),
            dir.join(format!("batch_analysis_results_{}.json", stamp)),
        )
    }
}

pub fn render_batch_summary(
    summary: &BatchSummary,
    outcomes: &[BatchOutcome],
    info: &RunInfo,
) -> String {
    let mut md = String::from("# Batch Analysis Summary\n\n");
    let _ = writeln!(
        md,
        "**Processing date**: {}  \n**Model**: {}  \n**Analysis kind**: {}  \n**Run id**: {}\n",
        info.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        info.model,
        info.kind,
        info.run_id
    );

    md.push_str("## Statistics\n\n");
    let _ = writeln!(md, "- **Files processed**: {}", summary.total);
    let _ = writeln!(
        md,
        "- **Successful**: {} ({:.1}%)",
        summary.succeeded,
        summary.percent(summary.succeeded)
    );
    let _ = writeln!(
        md,
        "- **Failed**: {} ({:.1}%)",
        summary.failed,
        summary.percent(summary.failed)
    );
    let _ = writeln!(
        md,
        "- **Total words**: {}",
        format_number(summary.total_words as u64)
    );
    let _ = writeln!(
        md,
        "- **Average keywords per file**: {:.1}\n",
        summary.average_keywords
    );

    md.push_str("## Sentiment Distribution\n\n");
    if summary.sentiment.is_empty() {
        md.push_str("_None_\n");
    }
    for (sentiment, count) in &summary.sentiment {
        let _ = writeln!(md, "- **{}**: {} files", sentiment, count);
    }
    md.push('\n');

    md.push_str("## Successfully Processed Files\n\n");
    let mut any = false;
    for outcome in outcomes.iter().filter(|o| o.is_success()) {
        any = true;
        match &outcome.report_path {
            Some(report) => {
                let _ = writeln!(
                    md,
                    "- `{}` → `{}`",
                    file_name(&outcome.document),
                    file_name(report)
                );
            }
            None => {
                let _ = writeln!(md, "- `{}`", file_name(&outcome.document));
            }
        }
    }
    if !any {
        md.push_str("_None_\n");
    }

    if !summary.failures.is_empty() {
        md.push_str("\n## Files With Errors\n\n");
        for failure in &summary.failures {
            let _ = writeln!(md, "- `{}`: {}", file_name(&failure.document), failure.error);
        }
    }
    md
}

/// Write the summary markdown and the outcomes JSON side by side.
pub fn write_batch_outputs(
    dir: &Path,
    summary: &BatchSummary,
    outcomes: &[BatchOutcome],
    info: &RunInfo,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let (summary_path, json_path) = info.output_paths(dir);

    std::fs::write(&summary_path, render_batch_summary(summary, outcomes, info))
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;
    write_outcomes_json(&json_path, outcomes)?;
    Ok((summary_path, json_path))
}

/// Pretty-printed JSON array of outcomes.
pub fn write_outcomes_json(path: &Path, outcomes: &[BatchOutcome]) -> Result<()> {
    let json = serde_json::to_string_pretty(outcomes)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
