use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use long_text_analyzer::batch::{BatchDriver, BatchOptions, BatchSummary, ReportTarget};
use long_text_analyzer::error::AnalysisError;
use long_text_analyzer::extract::{AnalysisSettings, Extractor};
use long_text_analyzer::interview::InterviewAnalyzer;
use long_text_analyzer::llm::InferenceClient;
use long_text_analyzer::models::{
    AnalysisKind, AnalysisOutput, Document, Sentiment, MAX_INSIGHTS, MAX_KEYWORDS,
    MAX_QUESTION_THEMES, MAX_QUOTES, MAX_SPEAKERS, MAX_TOPICS,
};
use long_text_analyzer::progress::NoProgress;
use long_text_analyzer::prompts;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// In-memory backend: answers by system prompt, records every call.
struct ScriptedClient {
    answer: Box<dyn Fn(&str, &str) -> Result<String, AnalysisError> + Send + Sync>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    fn new<F>(answer: F) -> Arc<Self>
    where
        F: Fn(&str, &str) -> Result<String, AnalysisError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            answer: Box::new(answer),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls_with(&self, system: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == system)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl InferenceClient for ScriptedClient {
    fn generate(
        &self,
        prompt: &str,
        system: &str,
        _schema: Option<&serde_json::Value>,
    ) -> Result<String, AnalysisError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        (self.answer)(prompt, system)
    }
}

/// Plausible answers for every operation.
fn well_behaved(_prompt: &str, system: &str) -> Result<String, AnalysisError> {
    let answer = match system {
        s if s == prompts::KEYWORDS_SYSTEM => "rust, ownership, cargo",
        s if s == prompts::SUMMARY_SYSTEM => "A concise summary.",
        s if s == prompts::TOPICS_SYSTEM => "1. Memory safety\n2. Tooling",
        s if s == prompts::SENTIMENT_SYSTEM => "Positive",
        s if s == prompts::SPEAKERS_SYSTEM => "NONE",
        s if s == prompts::INTERVIEW_TYPE_SYSTEM => "Podcast/informal conversation",
        s if s == prompts::INSIGHTS_SYSTEM => "- Start small\n- Measure first",
        s if s == prompts::QUOTES_SYSTEM => "\"It changed everything.\"",
        s if s == prompts::QUESTION_THEMES_SYSTEM => "Career\nTooling",
        s if s == prompts::INTERACTION_STYLE_SYSTEM => "relaxed, collaborative",
        _ => "unexpected",
    };
    Ok(answer.to_string())
}

fn settings(max_chunk_chars: usize) -> AnalysisSettings {
    AnalysisSettings {
        max_chunk_chars,
        structured_output: false,
    }
}

fn three_paragraphs() -> String {
    [
        "First paragraph about ownership.",
        "Second paragraph about borrowing.",
        "Third paragraph about lifetimes.",
    ]
    .join("\n\n")
}

// ============ Extractor ============

#[test]
fn test_single_chunk_summary_is_verbatim() {
    let client = ScriptedClient::new(|_, system| {
        if system == prompts::SUMMARY_SYSTEM {
            Ok("  The only summary, untouched.  ".to_string())
        } else {
            well_behaved("", system)
        }
    });
    let extractor = Extractor::new(client.clone(), settings(4000));

    let summary = extractor.generate_summary("A short document.").unwrap();
    assert_eq!(summary, "  The only summary, untouched.  ");
    assert_eq!(client.calls_with(prompts::SUMMARY_SYSTEM).len(), 1);
}

#[test]
fn test_three_chunk_summary_consolidates_once() {
    let client = ScriptedClient::new(|prompt, system| {
        if system != prompts::SUMMARY_SYSTEM {
            return well_behaved(prompt, system);
        }
        if prompt.starts_with("Consolidate") {
            Ok("merged".to_string())
        } else if prompt.contains("(part 1 of 3)") {
            Ok("one".to_string())
        } else if prompt.contains("(part 2 of 3)") {
            Ok("two".to_string())
        } else {
            Ok("three".to_string())
        }
    });
    let extractor = Extractor::new(client.clone(), settings(40));
    assert_eq!(extractor.chunks(&three_paragraphs()).len(), 3);

    let summary = extractor.generate_summary(&three_paragraphs()).unwrap();
    assert_eq!(summary, "merged");

    let calls = client.calls_with(prompts::SUMMARY_SYSTEM);
    assert_eq!(calls.len(), 4);
    let consolidation = &calls[3];
    let p1 = consolidation.find("PART 1: one").unwrap();
    let p2 = consolidation.find("PART 2: two").unwrap();
    let p3 = consolidation.find("PART 3: three").unwrap();
    assert!(p1 < p2 && p2 < p3);
}

#[test]
fn test_trailing_blank_paragraph_costs_no_calls() {
    let client = ScriptedClient::new(well_behaved);
    let extractor = Extractor::new(client.clone(), settings(4000));
    let text = format!("{}.\n\n   \n", "a".repeat(3998));

    assert_eq!(extractor.chunks(&text).len(), 1);
    extractor.generate_summary(&text).unwrap();
    extractor.extract_keywords(&text).unwrap();
    assert_eq!(client.calls_with(prompts::SUMMARY_SYSTEM).len(), 1);
    assert_eq!(client.calls_with(prompts::KEYWORDS_SYSTEM).len(), 1);
}

#[test]
fn test_structural_speakers_skip_model() {
    let client = ScriptedClient::new(well_behaved);
    let extractor = Extractor::new(client.clone(), settings(4000));

    let speakers = extractor
        .identify_speakers("ALICE: hello\nBOB: hi\nALICE: how are you?")
        .unwrap();
    assert_eq!(speakers, vec!["ALICE", "BOB"]);
    assert_eq!(client.total_calls(), 0);
}

#[test]
fn test_speaker_fallback_not_applicable_is_empty() {
    let client = ScriptedClient::new(well_behaved);
    let extractor = Extractor::new(client.clone(), settings(4000));

    let speakers = extractor
        .identify_speakers("a plain essay without any labelled lines")
        .unwrap();
    assert!(speakers.is_empty());
    assert_eq!(client.calls_with(prompts::SPEAKERS_SYSTEM).len(), 1);
}

#[test]
fn test_list_caps_hold_for_oversized_answers() {
    let client = ScriptedClient::new(|_, system| {
        let many = |prefix: &str, sep: &str| {
            (0..50)
                .map(|i| format!("{}{}", prefix, i))
                .collect::<Vec<_>>()
                .join(sep)
        };
        Ok(match system {
            s if s == prompts::KEYWORDS_SYSTEM => many("kw", ", "),
            s if s == prompts::TOPICS_SYSTEM => many("topic ", "\n"),
            s if s == prompts::SPEAKERS_SYSTEM => many("Speaker ", ", "),
            s if s == prompts::INSIGHTS_SYSTEM => many("insight ", "\n"),
            s if s == prompts::QUOTES_SYSTEM => (0..50)
                .map(|i| format!("\"quote {}\"", i))
                .collect::<Vec<_>>()
                .join("\n"),
            s if s == prompts::QUESTION_THEMES_SYSTEM => many("theme ", "\n"),
            _ => "Neutral".to_string(),
        })
    });
    let analyzer = InterviewAnalyzer::new(client, settings(4000));
    let document = Document::new("long.txt", "a lowercase essay with no labels at all");

    let result = analyzer.analyze(&document).unwrap();
    assert_eq!(result.base.keywords.len(), MAX_KEYWORDS);
    assert_eq!(result.base.key_topics.len(), MAX_TOPICS);
    assert_eq!(result.base.speakers.len(), MAX_SPEAKERS);
    assert_eq!(result.main_insights.len(), MAX_INSIGHTS);
    assert_eq!(result.quotes.len(), MAX_QUOTES);
    assert_eq!(result.question_themes.len(), MAX_QUESTION_THEMES);
}

#[test]
fn test_sentiment_is_always_canonical() {
    let cases = [
        ("I'd say POSITIVE overall", Sentiment::Positive),
        ("negative", Sentiment::Negative),
        ("It is a Mixed bag", Sentiment::Mixed),
        ("neutral", Sentiment::Neutral),
        ("¯\\_(ツ)_/¯", Sentiment::Neutral),
        ("", Sentiment::Neutral),
    ];
    for (raw, expected) in cases {
        let client = ScriptedClient::new(move |_, _| Ok(raw.to_string()));
        let extractor = Extractor::new(client, settings(4000));
        assert_eq!(extractor.analyze_sentiment("text").unwrap(), expected, "raw: {raw:?}");
    }
}

#[test]
fn test_time_estimates_follow_word_count() {
    let client = ScriptedClient::new(well_behaved);
    let analyzer = InterviewAnalyzer::new(client, settings(4000));
    let text = "word ".repeat(1000);

    let result = analyzer.analyze(&Document::new("talk.txt", text)).unwrap();
    assert_eq!(result.base.word_count, 1000);
    assert_eq!(result.base.reading_time_minutes, 5);
    assert_eq!(result.duration_estimate_minutes, 6);
}

#[test]
fn test_interview_result_composes_base() {
    let client = ScriptedClient::new(well_behaved);
    let extractor = Extractor::new(client.clone(), settings(4000));
    let document = Document::new(
        "ep.txt",
        "HOST: Why did you start?\nGUEST: Curiosity. \"It changed everything.\"",
    );

    let base = extractor.analyze(&document).unwrap();
    let interview = InterviewAnalyzer::from_extractor(extractor)
        .analyze(&document)
        .unwrap();

    assert_eq!(interview.base, base);
    assert_eq!(interview.base.speakers, vec!["HOST", "GUEST"]);
    assert_eq!(interview.interview_type, "Podcast/informal conversation");
    assert_eq!(interview.main_insights, vec!["Start small", "Measure first"]);
    assert_eq!(interview.quotes, vec!["It changed everything."]);
    assert_eq!(interview.question_themes, vec!["Career", "Tooling"]);
    assert_eq!(interview.interaction_style, "relaxed, collaborative");

    let theme_prompts = client.calls_with(prompts::QUESTION_THEMES_SYSTEM);
    assert!(theme_prompts[0].contains("Why did you start?"));
}

#[test]
fn test_empty_document_makes_no_calls() {
    let client = ScriptedClient::new(well_behaved);
    let extractor = Extractor::new(client.clone(), settings(4000));

    let err = extractor
        .analyze(&Document::new("blank.txt", " \n\t\n"))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyDocument));
    assert_eq!(client.total_calls(), 0);
}

#[test]
fn test_backend_failure_fails_document() {
    let client = ScriptedClient::new(|_, system| {
        if system == prompts::TOPICS_SYSTEM {
            Err(AnalysisError::BackendUnavailable("timed out".into()))
        } else {
            well_behaved("", system)
        }
    });
    let extractor = Extractor::new(client, settings(4000));

    let err = extractor
        .analyze(&Document::new("doc.txt", "Some text."))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::BackendUnavailable(_)));
}

// ============ Batch driver ============

/// Writes `n` documents; the ones listed in `broken` are made unreadable
/// (a directory with a `.txt` name) or empty.
fn batch_fixture(n: usize, broken: &[usize]) -> (TempDir, Vec<PathBuf>) {
    let tmp = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..n {
        let path = tmp.path().join(format!("doc-{:02}.txt", i));
        if broken.contains(&i) {
            if i % 2 == 0 {
                fs::create_dir_all(&path).unwrap();
            } else {
                fs::write(&path, "   ").unwrap();
            }
        } else {
            fs::write(&path, format!("Document number {} talks about Rust.", i)).unwrap();
        }
        paths.push(path);
    }
    (tmp, paths)
}

fn options(kind: AnalysisKind, workers: usize) -> BatchOptions {
    BatchOptions {
        kind,
        workers,
        reports: ReportTarget::Skip,
        model: "scripted".into(),
    }
}

#[tokio::test]
async fn test_batch_counts_failures() {
    let (_tmp, paths) = batch_fixture(7, &[1, 4, 6]);
    let driver = BatchDriver::new(ScriptedClient::new(well_behaved), settings(4000));

    let outcomes = driver
        .run(
            paths.clone(),
            &options(AnalysisKind::General, 3),
            &CancellationToken::new(),
            &NoProgress,
        )
        .await;

    assert_eq!(outcomes.len(), 7);
    let seen: HashSet<PathBuf> = outcomes.iter().map(|o| o.document.clone()).collect();
    assert_eq!(seen, paths.into_iter().collect::<HashSet<_>>());

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.succeeded + summary.failed, summary.total);
    assert_eq!(summary.sentiment.get(&Sentiment::Positive), Some(&4));
    assert_eq!(summary.average_keywords, 3.0);
    assert_eq!(summary.total_words, 4 * 6);
}

#[tokio::test]
async fn test_batch_results_independent_of_worker_count() {
    let (_tmp, paths) = batch_fixture(6, &[3]);

    let mut runs = Vec::new();
    for workers in [1, 4] {
        let driver = BatchDriver::new(ScriptedClient::new(well_behaved), settings(4000));
        let mut outcomes = driver
            .run(
                paths.clone(),
                &options(AnalysisKind::Interview, workers),
                &CancellationToken::new(),
                &NoProgress,
            )
            .await;
        outcomes.sort_by(|a, b| a.document.cmp(&b.document));
        let contents: Vec<(PathBuf, bool, Option<AnalysisOutput>, Option<String>)> = outcomes
            .into_iter()
            .map(|o| (o.document.clone(), o.is_success(), o.result, o.error))
            .collect();
        runs.push(contents);
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0].len(), 6);
}

#[tokio::test]
async fn test_batch_interview_outcomes_carry_interview_results() {
    let (_tmp, paths) = batch_fixture(2, &[]);
    let driver = BatchDriver::new(ScriptedClient::new(well_behaved), settings(4000));

    let outcomes = driver
        .run(
            paths,
            &options(AnalysisKind::Interview, 2),
            &CancellationToken::new(),
            &NoProgress,
        )
        .await;

    for outcome in outcomes {
        assert_eq!(outcome.analysis_kind, AnalysisKind::Interview);
        match outcome.result {
            Some(AnalysisOutput::Interview(result)) => {
                assert_eq!(result.interaction_style, "relaxed, collaborative");
            }
            other => panic!("expected interview result, got {:?}", other),
        }
    }
}

/// Answers like `well_behaved` after a short pause, tracking how many
/// calls are running at once.
fn slow_client(current: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Arc<ScriptedClient> {
    ScriptedClient::new(move |prompt, system| {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        current.fetch_sub(1, Ordering::SeqCst);
        well_behaved(prompt, system)
    })
}

#[tokio::test]
async fn test_batch_never_exceeds_worker_count() {
    let (_tmp, paths) = batch_fixture(12, &[]);
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let driver = BatchDriver::new(slow_client(current.clone(), peak.clone()), settings(4000));

    let outcomes = driver
        .run(
            paths,
            &options(AnalysisKind::General, 3),
            &CancellationToken::new(),
            &NoProgress,
        )
        .await;

    assert_eq!(outcomes.len(), 12);
    assert!(outcomes.iter().all(|o| o.is_success()));
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "{} documents ran at once with 3 workers", peak);
    assert!(peak > 1, "documents never overlapped");
    assert_eq!(current.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_cancel_mid_run_keeps_finished_documents() {
    let (_tmp, paths) = batch_fixture(12, &[]);
    let cancel = CancellationToken::new();
    let on_first_call = cancel.clone();
    let client = ScriptedClient::new(move |prompt, system| {
        on_first_call.cancel();
        std::thread::sleep(Duration::from_millis(20));
        well_behaved(prompt, system)
    });
    let driver = BatchDriver::new(client.clone(), settings(4000));

    let outcomes = driver
        .run(
            paths.clone(),
            &options(AnalysisKind::General, 2),
            &cancel,
            &NoProgress,
        )
        .await;

    assert!(!outcomes.is_empty());
    assert!(outcomes.len() <= 2, "{} documents dispatched after cancel", outcomes.len());
    assert!(outcomes.len() < paths.len());
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(outcomes.iter().all(|o| o.result.is_some()));

    // Every model call belongs to a document that produced an outcome.
    let finished: HashSet<String> = outcomes
        .iter()
        .map(|o| fs::read_to_string(&o.document).unwrap())
        .collect();
    for prompt in client.calls_with(prompts::SENTIMENT_SYSTEM) {
        assert!(finished.iter().any(|text| prompt.contains(text.as_str())));
    }
}
