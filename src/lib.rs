//! # Long Text Analyzer
//!
//! Keyword, summary, topic, sentiment and speaker extraction for long
//! documents and interview transcripts, driven by a locally hosted language
//! model (Ollama-compatible HTTP API).
//!
//! Documents longer than the model context are split into paragraph- and
//! sentence-aligned chunks; chunk-level answers are merged with at most one
//! consolidation call per operation. A batch driver runs the pipeline over
//! many files with bounded parallelism and isolates per-document failures.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────────────┐   ┌──────────────┐
//! │ discover  │──▶│ batch (JoinSet,    │──▶│ report       │
//! │ walk+glob │   │ ≤ workers in flight│   │ md + json    │
//! └───────────┘   └─────────┬──────────┘   └──────────────┘
//!                           ▼
//!            ┌──────────────────────────────┐
//!            │ interview ─▶ extract ─▶ chunk │
//!            │              │  reduce       │
//!            └──────────────┼───────────────┘
//!                           ▼
//!                    ┌─────────────┐
//!                    │ llm (Ollama)│
//!                    └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lta init                                  # write ./config/lta.toml
//! lta models                                # check the backend
//! lta analyze talk.txt                      # one document
//! lta batch ./transcripts --kind interview  # a whole directory
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Documents, results and batch outcomes |
//! | [`error`] | Per-document error taxonomy |
//! | [`llm`] | Inference client trait and Ollama implementation |
//! | [`chunk`] | Paragraph/sentence chunking |
//! | [`text`] | Sampling and response parsing helpers |
//! | [`prompts`] | Prompt templates |
//! | [`reduce`] | Map-then-consolidate over chunks |
//! | [`extract`] | Base document analysis |
//! | [`interview`] | Interview-specific analysis |
//! | [`discover`] | Input file discovery |
//! | [`batch`] | Concurrent batch driver and aggregate summary |
//! | [`progress`] | Batch progress reporting |
//! | [`report`] | Markdown and JSON outputs |

pub mod batch;
pub mod chunk;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod interview;
pub mod llm;
pub mod models;
pub mod progress;
pub mod prompts;
pub mod reduce;
pub mod report;
pub mod text;
