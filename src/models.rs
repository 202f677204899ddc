//! Core data models used throughout the analyzer.
//!
//! These types represent the documents, chunks, per-document results and
//! batch outcomes that flow through the analysis pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Words per minute used for the reading-time estimate.
pub const READING_WORDS_PER_MINUTE: usize = 200;
/// Words per minute of spoken conversation, used for interview duration.
pub const SPEAKING_WORDS_PER_MINUTE: usize = 165;

pub const MAX_KEYWORDS: usize = 20;
pub const MAX_TOPICS: usize = 8;
pub const MAX_SPEAKERS: usize = 10;
pub const MAX_INSIGHTS: usize = 7;
pub const MAX_QUOTES: usize = 8;
pub const MAX_QUESTION_THEMES: usize = 6;

/// Raw text of one input file. Immutable once read.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            text: text.into(),
        }
    }

    /// Read a whole file as UTF-8. Invalid UTF-8 surfaces as an I/O error.
    pub fn read(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        Ok(Self::new(path, text))
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A contiguous, size-bounded slice of a document's text.
///
/// `text` is exactly `document[start..end]` (byte offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Mixed => "Mixed",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline to run over a document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    General,
    Interview,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::General => "general",
            AnalysisKind::Interview => "interview",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-level result of the base extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub keywords: Vec<String>,
    pub summary: String,
    pub key_topics: Vec<String>,
    pub sentiment: Sentiment,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub speakers: Vec<String>,
}

/// `max(1, word_count / 200)`.
pub fn reading_time_minutes(word_count: usize) -> usize {
    (word_count / READING_WORDS_PER_MINUTE).max(1)
}

/// `max(1, word_count / 165)`.
pub fn duration_estimate_minutes(word_count: usize) -> usize {
    (word_count / SPEAKING_WORDS_PER_MINUTE).max(1)
}

/// Interview-specific fields layered over a base [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnalysisResult {
    #[serde(flatten)]
    pub base: AnalysisResult,
    pub interview_type: String,
    pub main_insights: Vec<String>,
    pub quotes: Vec<String>,
    pub question_themes: Vec<String>,
    pub interaction_style: String,
    pub duration_estimate_minutes: usize,
}

/// Result of either pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisOutput {
    General(AnalysisResult),
    Interview(InterviewAnalysisResult),
}

impl AnalysisOutput {
    pub fn base(&self) -> &AnalysisResult {
        match self {
            AnalysisOutput::General(r) => r,
            AnalysisOutput::Interview(r) => &r.base,
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisOutput::General(_) => AnalysisKind::General,
            AnalysisOutput::Interview(_) => AnalysisKind::Interview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Per-document record produced by the batch driver when a task completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub document: PathBuf,
    pub status: OutcomeStatus,
    pub analysis_kind: AnalysisKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BatchOutcome {
    pub fn success(
        document: PathBuf,
        result: AnalysisOutput,
        report_path: Option<PathBuf>,
    ) -> Self {
        Self {
            document,
            status: OutcomeStatus::Success,
            analysis_kind: result.kind(),
            result: Some(result),
            report_path,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(document: PathBuf, kind: AnalysisKind, error: impl ToString) -> Self {
        Self {
            document,
            status: OutcomeStatus::Error,
            analysis_kind: kind,
            result: None,
            report_path: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
