//! System instructions and prompt builders for every analysis operation.
//!
//! Each operation has its own system prompt so that callers (and test
//! doubles) can tell requests apart without parsing the user prompt.

use crate::models::Chunk;

pub const KEYWORDS_SYSTEM: &str = "You are an expert in text analysis. Your task is to extract the most important and relevant keywords from the provided text.";

pub const SUMMARY_SYSTEM: &str = "You are an expert in content synthesis and analysis. You write detailed, well-structured and comprehensive summaries.";

pub const TOPICS_SYSTEM: &str =
    "You are an expert in thematic analysis. You identify the main topics covered in a text.";

pub const SENTIMENT_SYSTEM: &str =
    "You are an expert in sentiment analysis. You determine the emotional tone of texts.";

pub const SPEAKERS_SYSTEM: &str = "You are an expert in transcript analysis. You identify the different speakers in a text.";

pub const INTERVIEW_TYPE_SYSTEM: &str =
    "You are an expert in interview analysis and communication.";

pub const INSIGHTS_SYSTEM: &str = "You are an expert in qualitative interview analysis.";

pub const QUOTES_SYSTEM: &str =
    "You are an expert at identifying impactful and memorable quotes.";

pub const QUESTION_THEMES_SYSTEM: &str =
    "You are an expert in interview analysis and questioning techniques.";

pub const INTERACTION_STYLE_SYSTEM: &str =
    "You are an expert in communication analysis and interpersonal dynamics.";

pub fn keywords_chunk(chunk: &Chunk) -> String {
    format!(
        "Analyze the following text and extract the 10-15 most important keywords.

INSTRUCTIONS:
- Include both single terms and key phrases
- Prioritize concepts, proper names and central themes
- Avoid stop words and overly generic words
- Separate the keywords with commas
- Do not add any explanation

TEXT TO ANALYZE:
{}

KEYWORDS:",
        chunk.text
    )
}

pub fn keywords_consolidation(candidates: &[String]) -> String {
    format!(
        "From the following list of keywords, select the 15-20 most important and relevant ones for the text:

{}

Return only the selected keywords, separated by commas:",
        candidates.join(", ")
    )
}

pub fn summary_chunk(chunk: &Chunk, total: usize) -> String {
    format!(
        "Write a detailed summary of the following text fragment (part {} of {}):

INSTRUCTIONS:
- Include the most important points and relevant details
- Keep the logical structure of the content
- Do not omit crucial information
- Use a clear, professional style

TEXT:
{}

DETAILED SUMMARY:",
        chunk.index + 1,
        total,
        chunk.text
    )
}

pub fn summary_consolidation(partials: &[String]) -> String {
    let parts = partials
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("PART {}: {}", i + 1, summary))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Consolidate the following partial summaries into one cohesive, well-structured final summary:

PARTIAL SUMMARIES:
{}

INSTRUCTIONS FOR THE FINAL SUMMARY:
- Write a fluent, well-structured summary
- Remove redundancy between the parts
- Keep every important point
- Organize the information logically
- Include an introduction and conclusion where appropriate

FINAL SUMMARY:",
        parts
    )
}

pub fn topics(sample: &str) -> String {
    format!(
        "Identify the 5-8 main topics covered in the following text:

INSTRUCTIONS:
- List specific, concrete topics
- Use clear descriptive phrases
- Order them by importance
- Avoid overly generic topics

TEXT:
{}

MAIN TOPICS (one per line):",
        sample
    )
}

pub fn sentiment(sample: &str) -> String {
    format!(
        "Analyze the overall sentiment or emotional tone of the following text.

OPTIONS: Positive, Neutral, Negative, Mixed

TEXT:
{}

Answer with exactly one word from the options:",
        sample
    )
}

pub fn speakers(sample: &str) -> String {
    format!(
        "Determine whether the following text is a transcript with multiple speakers.
If it is, list the names or roles of the speakers you can identify.

TEXT:
{}

If there are not multiple speakers, answer \"NONE\".
Otherwise list the names/roles separated by commas:",
        sample
    )
}

pub fn interview_type(sample: &str) -> String {
    format!(
        "Based on the content and style of the following transcript, identify the type of interview:

OPTIONS:
- Job interview
- Journalistic interview
- Research interview
- Clinical/therapeutic interview
- Academic interview
- Podcast/informal conversation
- Other (specify)

TRANSCRIPT:
{}

Answer only with the identified type:",
        sample
    )
}

pub fn insights(sample: &str) -> String {
    format!(
        "Analyze the following interview transcript and identify the 5-7 most important or revealing insights.

INSTRUCTIONS:
- Look for key ideas, revelations and unique points of view
- Include important conclusions from the interviewee
- Identify recurring patterns or themes
- Focus on what is most valuable or surprising

TRANSCRIPT:
{}

MAIN INSIGHTS (one per line):",
        sample
    )
}

pub fn quotes(sample: &str) -> String {
    format!(
        "From the following interview transcript, identify the 5-8 most impactful, revealing or memorable quotes.

CRITERIA:
- Sentences that sum up key points
- Surprising or controversial statements
- Inspiring or emotional quotes
- Sentences that capture the essence of the message

TRANSCRIPT:
{}

Return each quote in double quotes, one per line:",
        sample
    )
}

pub fn question_themes(questions: &str) -> String {
    format!(
        "Analyze the questions or subjects covered in this interview and identify the 5-6 main thematic areas.

QUESTIONS/CONTENT:
{}

THEMATIC AREAS (one per line):",
        questions
    )
}

pub fn interaction_style(sample: &str) -> String {
    format!(
        "Analyze the interaction style and communication dynamics of this interview:

ASPECTS TO CONSIDER:
- Formal vs informal
- Confrontational vs collaborative
- Directive vs exploratory
- Tense vs relaxed

TRANSCRIPT SAMPLE:
{}

Describe the style in 2-3 keywords:",
        sample
    )
}
