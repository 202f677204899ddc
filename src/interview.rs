//! Interview-specific analysis layered over the base [`Extractor`].
//!
//! The base result is computed first and embedded unchanged; the five
//! interview operations each make one model call on a bounded sample.

use std::sync::Arc;

use crate::error::AnalysisError;
use crate::extract::{AnalysisSettings, Extractor};
use crate::llm::InferenceClient;
use crate::models::{
    duration_estimate_minutes, Document, InterviewAnalysisResult, MAX_INSIGHTS,
    MAX_QUESTION_THEMES, MAX_QUOTES,
};
use crate::prompts;
use crate::text;

const INTERVIEW_TYPE_SAMPLE: usize = 1500;
const INSIGHTS_SAMPLE: usize = 3000;
const QUOTES_SAMPLE: usize = 4000;
const QUESTION_FALLBACK_SAMPLE: usize = 2000;
const MAX_QUESTIONS: usize = 20;
const STYLE_SAMPLE: usize = 2000;

#[derive(Clone)]
pub struct InterviewAnalyzer {
    extractor: Extractor,
}

impl InterviewAnalyzer {
    pub fn new(client: Arc<dyn InferenceClient>, settings: AnalysisSettings) -> Self {
        Self {
            extractor: Extractor::new(client, settings),
        }
    }

    pub fn from_extractor(extractor: Extractor) -> Self {
        Self { extractor }
    }

    pub fn analyze(&self, document: &Document) -> Result<InterviewAnalysisResult, AnalysisError> {
        let base = self.extractor.analyze(document)?;
        let text = document.text.as_str();

        tracing::info!(document = %document.name, "Running interview analysis");
        let interview_type = self.identify_interview_type(text)?;
        let main_insights = self.extract_insights(text)?;
        let quotes = self.extract_quotes(text)?;
        let question_themes = self.analyze_question_themes(text)?;
        let interaction_style = self.analyze_interaction_style(text)?;
        let duration_estimate_minutes = duration_estimate_minutes(base.word_count);

        Ok(InterviewAnalysisResult {
            base,
            interview_type,
            main_insights,
            quotes,
            question_themes,
            interaction_style,
            duration_estimate_minutes,
        })
    }

    pub fn identify_interview_type(&self, text: &str) -> Result<String, AnalysisError> {
        let prompt = prompts::interview_type(text::head(text, INTERVIEW_TYPE_SAMPLE));
        self.ask(&prompt, prompts::INTERVIEW_TYPE_SYSTEM)
    }

    pub fn extract_insights(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let prompt = prompts::insights(text::head(text, INSIGHTS_SAMPLE));
        let response = self.ask(&prompt, prompts::INSIGHTS_SYSTEM)?;
        Ok(text::parse_lines(&response, MAX_INSIGHTS))
    }

    pub fn extract_quotes(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let prompt = prompts::quotes(text::head(text, QUOTES_SAMPLE));
        let response = self.ask(&prompt, prompts::QUOTES_SYSTEM)?;
        Ok(text::parse_quotes(&response, MAX_QUOTES))
    }

    /// Themes of the questions asked; falls back to a head sample when the
    /// transcript has no question sentences.
    pub fn analyze_question_themes(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let questions = text::questions(text, MAX_QUESTIONS);
        let sample = if questions.is_empty() {
            text::head(text, QUESTION_FALLBACK_SAMPLE).to_string()
        } else {
            questions.join(" ")
        };
        let response = self.ask(&prompts::question_themes(&sample), prompts::QUESTION_THEMES_SYSTEM)?;
        Ok(text::parse_lines(&response, MAX_QUESTION_THEMES))
    }

    pub fn analyze_interaction_style(&self, text: &str) -> Result<String, AnalysisError> {
        let prompt = prompts::interaction_style(text::head(text, STYLE_SAMPLE));
        self.ask(&prompt, prompts::INTERACTION_STYLE_SYSTEM)
    }

    fn ask(&self, prompt: &str, system: &str) -> Result<String, AnalysisError> {
        let response = self.extractor.client().generate(prompt, system, None)?;
        Ok(response.trim().to_string())
    }
}
