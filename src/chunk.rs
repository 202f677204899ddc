//! Paragraph-then-sentence text chunker.
//!
//! Splits a document into [`Chunk`]s of at most `max_chars` characters.
//! Splitting happens on paragraph boundaries (`\n\n`) first; a paragraph
//! that is itself too long is split after sentence-ending punctuation.
//! Pieces are packed greedily into a running buffer that is flushed whenever
//! the next piece would overflow it.
//!
//! Every chunk is an exact byte range of the input, so chunks never overlap
//! and the text between two consecutive chunks is only paragraph separators
//! and whitespace. Whitespace-only pieces are never packed on their own, so
//! non-blank input never produces a blank chunk.
//! The one lossy case is a single sentence longer than `max_chars`: it is cut
//! to `max_chars` and the remainder is dropped.

use crate::models::Chunk;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split text into chunks of at most `max_chars` characters.
/// Returns chunks with contiguous indices starting at 0; empty input
/// yields no chunks, any other input yields at least one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut packer = Packer::new(text, max_chars.max(1));
    for (start, end) in paragraph_spans(text) {
        if char_len(&text[start..end]) > packer.max_chars {
            for (s, e) in sentence_spans(text, start, end) {
                packer.push(s, e);
            }
        } else {
            packer.push(start, end);
        }
    }
    packer.finish()
}

/// Greedy accumulator over byte spans of the source text.
struct Packer<'a> {
    text: &'a str,
    max_chars: usize,
    chunks: Vec<Chunk>,
    // (start, end, chars) of the pending buffer
    pending: Option<(usize, usize, usize)>,
}

impl<'a> Packer<'a> {
    fn new(text: &'a str, max_chars: usize) -> Self {
        Self {
            text,
            max_chars,
            chunks: Vec::new(),
            pending: None,
        }
    }

    fn push(&mut self, start: usize, end: usize) {
        let piece_chars = char_len(&self.text[start..end]);

        if piece_chars > self.max_chars {
            self.flush();
            // A truncated piece keeps no leading whitespace.
            let piece = &self.text[start..end];
            let start = start + (piece.len() - piece.trim_start().len());
            let cut = start + byte_offset_of_char(&self.text[start..end], self.max_chars);
            tracing::debug!(
                dropped_chars = piece_chars - self.max_chars,
                "Truncating unsplittable sentence"
            );
            self.emit(start, cut);
            return;
        }

        match self.pending {
            None => self.pending = Some((start, end, piece_chars)),
            Some((buf_start, buf_end, buf_chars)) => {
                // Separator text between buffer and piece counts toward the size.
                let combined = buf_chars + char_len(&self.text[buf_end..end]);
                if combined > self.max_chars {
                    self.flush();
                    self.pending = Some((start, end, piece_chars));
                } else {
                    self.pending = Some((buf_start, end, combined));
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Some((start, end, _)) = self.pending.take() {
            self.emit(start, end);
        }
    }

    fn emit(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        self.chunks.push(Chunk {
            index: self.chunks.len(),
            start,
            end,
            text: self.text[start..end].to_string(),
        });
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();

        // Input made only of separators still yields one chunk.
        if self.chunks.is_empty() && !self.text.is_empty() {
            let end = byte_offset_of_char(self.text, self.max_chars);
            self.emit(0, end);
        }

        self.chunks
    }
}

/// Byte spans of paragraphs that contain something besides whitespace.
fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(PARAGRAPH_SEPARATOR) {
        if !is_blank(&text[start..idx]) {
            spans.push((start, idx));
        }
        start = idx + PARAGRAPH_SEPARATOR.len();
    }
    if !is_blank(&text[start..]) {
        spans.push((start, text.len()));
    }
    spans
}

/// Byte spans of sentences within `text[start..end]`. Each sentence keeps
/// its run of terminating punctuation; leading whitespace stays with the
/// following sentence.
fn sentence_spans(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let slice = &text[start..end];
    let mut spans = Vec::new();
    let mut sentence_start = 0;
    let mut chars = slice.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if is_terminator(c) {
            let next_is_terminator = chars.peek().map(|&(_, n)| is_terminator(n)).unwrap_or(false);
            if !next_is_terminator {
                let cut = idx + c.len_utf8();
                spans.push((start + sentence_start, start + cut));
                sentence_start = cut;
            }
        }
    }
    if !is_blank(&slice[sentence_start..]) {
        spans.push((start + sentence_start, end));
    }
    spans
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `n`-th char, or `s.len()` if `s` is shorter.
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(idx, _)| idx).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(text: &str, chunks: &[Chunk], max_chars: usize) {
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "Index mismatch at position {}", i);
            assert_eq!(c.text, &text[c.start..c.end]);
            assert!(
                c.text.chars().count() <= max_chars,
                "chunk {} has {} chars",
                i,
                c.text.chars().count()
            );
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].end <= pair[1].start, "chunks overlap");
        }
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 4000).is_empty());
    }

    #[test]
    fn test_separator_only_text_yields_one_chunk() {
        let chunks = chunk_text("\n\n\n\n", 4000);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_whitespace_only_text_yields_one_chunk() {
        let chunks = chunk_text("   \n\n \t ", 4000);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_no_blank_chunks_for_non_blank_input() {
        let full_buffer = format!("{}.\n\n   \n", "a".repeat(3998));
        let chunks = chunk_text(&full_buffer, 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, format!("{}.", "a".repeat(3998)));

        let inputs = [
            "a\n\n\n\n\n",
            "   \n\nreal words here\n\n  \n\n\t",
            "First. \n\n \n\nSecond sentence here. Third one!   ",
            "One two three. Four five six.     \n\n\n\n\n\nSeven.",
            "Intro.\n\n            long tail without any stop",
        ];
        for text in inputs {
            for max_chars in [5, 10, 16, 4000] {
                let chunks = chunk_text(text, max_chars);
                assert!(!chunks.is_empty());
                assert_well_formed(text, &chunks, max_chars);
                for c in &chunks {
                    assert!(
                        !c.text.trim().is_empty(),
                        "blank chunk {:?} from {:?} at max {}",
                        c.text,
                        text,
                        max_chars
                    );
                }
            }
        }
    }

    #[test]
    fn test_multiple_paragraphs_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text(text, 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_multiple_paragraphs_exceed_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_text(text, 30);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "This is paragraph one.");
        assert_eq!(chunks[2].text, "This is paragraph three.");
        assert_well_formed(text, &chunks, 30);
    }

    #[test]
    fn test_paragraphs_pack_until_full() {
        let text = "aaaa\n\nbbbb\n\ncccc\n\ndddd";
        // "aaaa\n\nbbbb" is 10 chars; adding "\n\ncccc" would make 16.
        let chunks = chunk_text(text, 12);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "aaaa\n\nbbbb");
        assert_eq!(chunks[1].text, "cccc\n\ndddd");
    }

    #[test]
    fn test_long_paragraph_splits_on_sentences() {
        let text = "One two three. Four five six! Seven eight nine? Ten eleven twelve.";
        let chunks = chunk_text(text, 30);
        assert!(chunks.len() > 1);
        assert_well_formed(text, &chunks, 30);
        assert_eq!(chunks[0].text, "One two three. Four five six!");
        // Sentence pieces are contiguous: nothing lost between them.
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_punctuation_runs_stay_together() {
        let spans = sentence_spans("Really?! Yes... ok", 0, 18);
        let text = "Really?! Yes... ok";
        let pieces: Vec<&str> = spans.iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(pieces, vec!["Really?!", " Yes...", " ok"]);
    }

    #[test]
    fn test_unsplittable_sentence_is_truncated() {
        let long_sentence = "x".repeat(50);
        let text = format!("Short intro.\n\n{}\n\nShort outro.", long_sentence);
        let chunks = chunk_text(&text, 20);
        assert_well_formed(&text, &chunks, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "Short intro.");
        assert_eq!(chunks[1].text, "x".repeat(20));
        assert_eq!(chunks[2].text, "Short outro.");
    }

    #[test]
    fn test_reconstruction_modulo_separators() {
        let text = (0..40)
            .map(|i| {
                if i % 7 == 0 {
                    format!("Paragraph {} is long. It has several sentences! Does it? Yes.", i)
                } else {
                    format!("Paragraph number {}.", i)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&text, 45);
        assert_well_formed(&text, &chunks, 45);

        assert_eq!(chunks.first().unwrap().start, 0);
        assert_eq!(chunks.last().unwrap().end, text.len());
        for pair in chunks.windows(2) {
            let gap = &text[pair[0].end..pair[1].start];
            assert!(gap.chars().all(|c| c == '\n'), "unexpected gap {:?}", gap);
        }

        let strip = |s: &str| s.replace('\n', "");
        let joined: String = chunks.iter().map(|c| strip(&c.text)).collect();
        assert_eq!(joined, strip(&text));
    }

    #[test]
    fn test_multibyte_text_counts_chars() {
        let text = "Él está aquí. ¿Qué pasó? Ñandú corrió rápido. Café con leche.";
        let chunks = chunk_text(text, 16);
        assert_well_formed(text, &chunks, 16);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha.\n\nBeta beta beta.\n\nGamma! Gamma? Gamma.\n\nDelta";
        let c1 = chunk_text(text, 10);
        let c2 = chunk_text(text, 10);
        assert_eq!(c1, c2);
    }
}
