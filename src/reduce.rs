//! Map-then-optionally-reduce over document chunks.
//!
//! Keyword extraction and summary generation share the same protocol: one
//! model call per chunk (in document order), then at most one consolidation
//! call over all chunk-level answers. [`run_reduction`] owns the loop; a
//! [`ChunkReduction`] supplies the prompts and decides whether the
//! consolidation call is needed.

use crate::error::AnalysisError;
use crate::llm::InferenceClient;
use crate::models::Chunk;

/// What to do with the collected chunk-level answers.
pub enum Combined<T> {
    /// The answers already form the final value; no further call.
    Done(T),
    /// Issue one consolidation call with this prompt.
    Consolidate(String),
}

pub trait ChunkReduction {
    type Output;

    fn system_prompt(&self) -> &str;

    fn map_prompt(&self, chunk: &Chunk, total: usize) -> String;

    /// Schema constraining the per-chunk answers, if any.
    fn map_schema(&self) -> Option<&serde_json::Value> {
        None
    }

    fn combine(&self, partials: Vec<String>) -> Result<Combined<Self::Output>, AnalysisError>;

    fn finish(&self, consolidated: String) -> Result<Self::Output, AnalysisError>;
}

/// Run `reduction` over `chunks`: `chunks.len()` map calls plus zero or one
/// consolidation call. The first failing call aborts the reduction.
pub fn run_reduction<R: ChunkReduction>(
    client: &dyn InferenceClient,
    chunks: &[Chunk],
    reduction: &R,
) -> Result<R::Output, AnalysisError> {
    let total = chunks.len();
    let system = reduction.system_prompt();

    let mut partials = Vec::with_capacity(total);
    for chunk in chunks {
        let prompt = reduction.map_prompt(chunk, total);
        partials.push(client.generate(&prompt, system, reduction.map_schema())?);
    }

    match reduction.combine(partials)? {
        Combined::Done(output) => Ok(output),
        Combined::Consolidate(prompt) => {
            tracing::debug!(chunks = total, "Issuing consolidation call");
            let consolidated = client.generate(&prompt, system, None)?;
            reduction.finish(consolidated)
        }
    }
}
