use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChunkConfigError {
    #[error("hard_limit must be at least 1")]
    ZeroHardLimit,
    #[error("overlap ({overlap}) must be strictly smaller than hard_limit ({hard_limit})")]
    OverlapTooLarge { overlap: usize, hard_limit: usize },
    #[error("target_size ({target_size}) must be between 1 and hard_limit ({hard_limit})")]
    BadTargetSize {
        target_size: usize,
        hard_limit: usize,
    },
}

/// Sizing for the chunker. `target_size` is the greedy accumulation goal,
/// `hard_limit` the ceiling no emitted chunk may cross, `overlap` the
/// trailing region carried between adjacent chunks. All byte lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkConfig {
    pub target_size: usize,
    pub overlap: usize,
    pub hard_limit: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_size: 1000,
            overlap: 100,
            hard_limit: 8000,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), ChunkConfigError> {
        if self.hard_limit == 0 {
            return Err(ChunkConfigError::ZeroHardLimit);
        }
        if self.overlap >= self.hard_limit {
            return Err(ChunkConfigError::OverlapTooLarge {
                overlap: self.overlap,
                hard_limit: self.hard_limit,
            });
        }
        if self.target_size == 0 || self.target_size > self.hard_limit {
            return Err(ChunkConfigError::BadTargetSize {
                target_size: self.target_size,
                hard_limit: self.hard_limit,
            });
        }
        Ok(())
    }

    // >= 1 once validated, so fixed-width slicing always makes progress.
    fn stride(&self) -> usize {
        self.hard_limit - self.overlap
    }
}

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern"));

/// Split `text` into bounded, overlapping chunks suitable for embedding.
///
/// Whitespace is normalized first (newline runs become one newline, other
/// runs one space). Text at or under `hard_limit` comes back as a single
/// chunk. Longer text is split paragraph-first, then by sentence, then by
/// fixed-width slices, with a trailing-sentence overlap stitched between
/// adjacent chunks.
pub fn chunk(text: &str, config: &ChunkConfig) -> Result<Vec<String>, ChunkConfigError> {
    config.validate()?;

    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }
    if normalized.len() <= config.hard_limit {
        return Ok(vec![normalized]);
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for paragraph in normalized.split('\n') {
        if paragraph.len() > config.hard_limit {
            flush(&mut chunks, &mut current);
            split_oversized_paragraph(paragraph, config, &mut chunks);
        } else if !current.is_empty() && current.len() + 1 + paragraph.len() > config.target_size {
            flush(&mut chunks, &mut current);
            current.push_str(paragraph);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(paragraph);
        }
    }
    flush(&mut chunks, &mut current);

    let stitched = stitch_overlaps(chunks, config);
    Ok(enforce_hard_limit(stitched, config))
}

/// Collapse whitespace runs: any run containing a newline becomes a single
/// newline (paragraph break), any other run a single space. Ends trimmed.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<char> = None;
    for c in text.chars() {
        if c.is_whitespace() {
            if c == '\n' || pending == Some('\n') {
                pending = Some('\n');
            } else {
                pending = Some(' ');
            }
        } else {
            if let Some(sep) = pending.take() {
                if !out.is_empty() {
                    out.push(sep);
                }
            }
            out.push(c);
        }
    }
    out
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Sentence-level pass for a paragraph that alone exceeds the hard limit.
fn split_oversized_paragraph(paragraph: &str, config: &ChunkConfig, chunks: &mut Vec<String>) {
    let mut sentence_chunk = String::new();
    for sentence in split_sentences(paragraph) {
        if sentence.len() > config.hard_limit {
            flush(chunks, &mut sentence_chunk);
            slice_fixed_width(sentence, config, chunks);
        } else if !sentence_chunk.is_empty()
            && sentence_chunk.len() + 1 + sentence.len() > config.target_size
        {
            flush(chunks, &mut sentence_chunk);
            sentence_chunk.push_str(sentence);
        } else {
            if !sentence_chunk.is_empty() {
                sentence_chunk.push(' ');
            }
            sentence_chunk.push_str(sentence);
        }
    }
    flush(chunks, &mut sentence_chunk);
}

/// Sentence boundary: `.`, `!`, or `?` followed by whitespace. The
/// punctuation stays with the sentence to its left.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        let end = boundary.start() + 1;
        if end > start {
            sentences.push(&text[start..end]);
        }
        start = boundary.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Last resort for text with no usable boundaries: overlapping windows of
/// `hard_limit` bytes advancing by `hard_limit - overlap`.
fn slice_fixed_width(text: &str, config: &ChunkConfig, chunks: &mut Vec<String>) {
    let stride = config.stride();
    let mut raw_start = 0;
    let mut last_start = usize::MAX;
    while raw_start < text.len() {
        let start = floor_char_boundary(text, raw_start);
        let end = floor_char_boundary(text, (raw_start + config.hard_limit).min(text.len()));
        if start != last_start && end > start {
            let piece = text[start..end].trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }
            last_start = start;
        }
        raw_start += stride;
    }
}

/// For each chunk after the first, carry the last full sentence fragment
/// from the trailing `overlap` bytes of its (pre-stitch) predecessor,
/// unless the chunk already starts with it. A fragment that would push the
/// chunk past `hard_limit` is truncated to fit, or dropped when no room
/// is left.
fn stitch_overlaps(chunks: Vec<String>, config: &ChunkConfig) -> Vec<String> {
    if chunks.len() < 2 {
        return chunks;
    }
    let mut stitched = Vec::with_capacity(chunks.len());
    stitched.push(chunks[0].clone());
    for i in 1..chunks.len() {
        let prev = &chunks[i - 1];
        let mut current = chunks[i].clone();
        if prev.len() > config.overlap {
            let tail_start = floor_char_boundary(prev, prev.len() - config.overlap);
            if let Some(rel) = prev[tail_start..].rfind(". ") {
                let fragment = &prev[tail_start + rel + 2..];
                if rel > 0 && !fragment.is_empty() && !current.starts_with(fragment) {
                    if fragment.len() + 1 + current.len() <= config.hard_limit {
                        current = format!("{fragment} {current}");
                    } else {
                        let available = config.hard_limit.saturating_sub(current.len() + 1);
                        let cut = floor_char_boundary(fragment, available.min(fragment.len()));
                        if cut > 0 {
                            current = format!("{} {}", &fragment[..cut], current);
                        }
                    }
                }
            }
        }
        stitched.push(current);
    }
    stitched
}

/// Final validation pass: anything still over the limit gets the
/// fixed-width treatment.
fn enforce_hard_limit(chunks: Vec<String>, config: &ChunkConfig) -> Vec<String> {
    let mut validated = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.len() <= config.hard_limit {
            validated.push(chunk);
        } else {
            slice_fixed_width(&chunk, config, &mut validated);
        }
    }
    validated
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
