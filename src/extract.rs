//! Document-level analysis: keywords, summary, topics, sentiment, speakers.
//!
//! The [`Extractor`] turns one [`Document`] into one [`AnalysisResult`]:
//!
//! | Operation | Model calls |
//! |-----------|-------------|
//! | keywords  | one per chunk, plus one down-selection when the union exceeds 20 |
//! | summary   | one per chunk, plus one consolidation when there are several chunks |
//! | topics    | one, on a head+tail sample |
//! | sentiment | one, on a head sample |
//! | speakers  | none when `NAME:` lines are found, otherwise one on a head sample |
//!
//! Word count and reading time are computed locally. The operations run one
//! after another and share nothing mutable, so a failure in any of them fails
//! the document and leaves no partial state behind.

use std::sync::Arc;
use std::time::Instant;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::llm::{generate_structured, parse_structured, InferenceClient};
use crate::models::{
    reading_time_minutes, AnalysisResult, Chunk, Document, Sentiment, MAX_KEYWORDS, MAX_SPEAKERS,
    MAX_TOPICS,
};
use crate::prompts;
use crate::reduce::{run_reduction, ChunkReduction, Combined};
use crate::text;

const TOPIC_SAMPLE_THRESHOLD: usize = 4000;
const TOPIC_SAMPLE_HEAD: usize = 3000;
const TOPIC_SAMPLE_TAIL: usize = 1000;
const SENTIMENT_SAMPLE: usize = 2000;
const SPEAKER_SAMPLE: usize = 2000;

/// Knobs of the analysis pipeline, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub max_chunk_chars: usize,
    pub structured_output: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: 4000,
            structured_output: false,
        }
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chunk_chars: config.chunking.max_chars,
            structured_output: config.analysis.structured_output,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct KeywordList {
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TopicList {
    topics: Vec<String>,
}

/// Runs the five base analysis operations over a document.
#[derive(Clone)]
pub struct Extractor {
    client: Arc<dyn InferenceClient>,
    settings: AnalysisSettings,
}

impl Extractor {
    pub fn new(client: Arc<dyn InferenceClient>, settings: AnalysisSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &dyn InferenceClient {
        self.client.as_ref()
    }

    pub fn chunks(&self, text: &str) -> Vec<Chunk> {
        chunk_text(text, self.settings.max_chunk_chars)
    }

    /// Full base analysis of one document.
    pub fn analyze(&self, document: &Document) -> Result<AnalysisResult, AnalysisError> {
        if document.is_blank() {
            return Err(AnalysisError::EmptyDocument);
        }
        let started = Instant::now();
        let text = document.text.as_str();
        let chunks = self.chunks(text);

        let word_count = text::word_count(text);
        tracing::info!(
            document = %document.name,
            words = word_count,
            chunks = chunks.len(),
            "Analyzing document"
        );

        tracing::debug!(document = %document.name, "Extracting keywords");
        let keywords = self.keywords_from_chunks(&chunks)?;

        tracing::debug!(document = %document.name, "Generating summary");
        let summary = self.summary_from_chunks(&chunks)?;

        tracing::debug!(document = %document.name, "Identifying topics");
        let key_topics = self.extract_topics(text)?;

        tracing::debug!(document = %document.name, "Analyzing sentiment");
        let sentiment = self.analyze_sentiment(text)?;

        tracing::debug!(document = %document.name, "Identifying speakers");
        let speakers = self.identify_speakers(text)?;

        tracing::info!(
            document = %document.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Base analysis complete"
        );

        Ok(AnalysisResult {
            keywords,
            summary,
            key_topics,
            sentiment,
            word_count,
            reading_time_minutes: reading_time_minutes(word_count),
            speakers,
        })
    }

    /// Deduplicated keywords across all chunks, at most 20.
    pub fn extract_keywords(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        self.keywords_from_chunks(&self.chunks(text))
    }

    fn keywords_from_chunks(&self, chunks: &[Chunk]) -> Result<Vec<String>, AnalysisError> {
        let reduction = KeywordReduction::new(self.settings.structured_output)?;
        run_reduction(self.client(), chunks, &reduction)
    }

    /// Map-then-reduce summary: one call per chunk, one merge if several.
    pub fn generate_summary(&self, text: &str) -> Result<String, AnalysisError> {
        self.summary_from_chunks(&self.chunks(text))
    }

    fn summary_from_chunks(&self, chunks: &[Chunk]) -> Result<String, AnalysisError> {
        run_reduction(self.client(), chunks, &SummaryReduction)
    }

    /// Up to 8 ranked topics from a bounded head+tail sample.
    pub fn extract_topics(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let sample = text::head_tail_sample(
            text,
            TOPIC_SAMPLE_THRESHOLD,
            TOPIC_SAMPLE_HEAD,
            TOPIC_SAMPLE_TAIL,
        );
        let prompt = prompts::topics(&sample);

        if self.settings.structured_output {
            let list: TopicList =
                generate_structured(self.client(), &prompt, prompts::TOPICS_SYSTEM)?;
            let topics = list
                .topics
                .iter()
                .map(|t| text::strip_list_marker(t).to_string())
                .filter(|t| !t.is_empty())
                .take(MAX_TOPICS)
                .collect();
            return Ok(topics);
        }

        let response = self.client.generate(&prompt, prompts::TOPICS_SYSTEM, None)?;
        Ok(text::parse_lines(&response, MAX_TOPICS))
    }

    /// Overall tone from a head sample; always one of the canonical labels.
    pub fn analyze_sentiment(&self, text: &str) -> Result<Sentiment, AnalysisError> {
        let prompt = prompts::sentiment(text::head(text, SENTIMENT_SAMPLE));
        let response = self.client.generate(&prompt, prompts::SENTIMENT_SYSTEM, None)?;
        Ok(text::normalize_sentiment(&response))
    }

    /// Speaker labels. `NAME:` line prefixes win without a model call.
    pub fn identify_speakers(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let mut speakers = text::structural_speakers(text);
        if !speakers.is_empty() {
            speakers.truncate(MAX_SPEAKERS);
            return Ok(speakers);
        }

        let prompt = prompts::speakers(text::head(text, SPEAKER_SAMPLE));
        let response = self.client.generate(&prompt, prompts::SPEAKERS_SYSTEM, None)?;
        if text::is_not_applicable(&response) {
            return Ok(Vec::new());
        }

        let mut speakers = text::dedup_case_insensitive(text::parse_comma_list(&response));
        speakers.truncate(MAX_SPEAKERS);
        Ok(speakers)
    }
}

// ============ Keyword reduction ============

struct KeywordReduction {
    schema: Option<serde_json::Value>,
}

impl KeywordReduction {
    fn new(structured: bool) -> Result<Self, AnalysisError> {
        let schema = if structured {
            let schema = serde_json::to_value(schemars::schema_for!(KeywordList))
                .map_err(|e| AnalysisError::MalformedStructuredOutput(e.to_string()))?;
            Some(schema)
        } else {
            None
        };
        Ok(Self { schema })
    }

    fn parse(&self, response: &str) -> Result<Vec<String>, AnalysisError> {
        if self.schema.is_some() {
            let list: KeywordList = parse_structured(response)?;
            Ok(list
                .keywords
                .iter()
                .flat_map(|k| text::parse_comma_list(k))
                .collect())
        } else {
            Ok(text::parse_comma_list(response))
        }
    }
}

impl ChunkReduction for KeywordReduction {
    type Output = Vec<String>;

    fn system_prompt(&self) -> &str {
        prompts::KEYWORDS_SYSTEM
    }

    fn map_prompt(&self, chunk: &Chunk, _total: usize) -> String {
        prompts::keywords_chunk(chunk)
    }

    fn map_schema(&self) -> Option<&serde_json::Value> {
        self.schema.as_ref()
    }

    fn combine(&self, partials: Vec<String>) -> Result<Combined<Vec<String>>, AnalysisError> {
        let mut candidates = Vec::new();
        for partial in &partials {
            candidates.extend(self.parse(partial)?);
        }
        let candidates = text::dedup_case_insensitive(candidates);

        if candidates.len() > MAX_KEYWORDS {
            Ok(Combined::Consolidate(prompts::keywords_consolidation(&candidates)))
        } else {
            Ok(Combined::Done(candidates))
        }
    }

    fn finish(&self, consolidated: String) -> Result<Vec<String>, AnalysisError> {
        let mut keywords = text::dedup_case_insensitive(text::parse_comma_list(&consolidated));
        keywords.truncate(MAX_KEYWORDS);
        Ok(keywords)
    }
}

// ============ Summary reduction ============

struct SummaryReduction;

impl ChunkReduction for SummaryReduction {
    type Output = String;

    fn system_prompt(&self) -> &str {
        prompts::SUMMARY_SYSTEM
    }

    fn map_prompt(&self, chunk: &Chunk, total: usize) -> String {
        prompts::summary_chunk(chunk, total)
    }

    fn combine(&self, mut partials: Vec<String>) -> Result<Combined<String>, AnalysisError> {
        if partials.len() > 1 {
            Ok(Combined::Consolidate(prompts::summary_consolidation(&partials)))
        } else {
            Ok(Combined::Done(partials.pop().unwrap_or_default()))
        }
    }

    fn finish(&self, consolidated: String) -> Result<String, AnalysisError> {
        Ok(consolidated)
    }
}
