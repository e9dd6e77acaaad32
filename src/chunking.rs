use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SENTENCE_TERMINATORS: Regex = Regex::new(r"[.!?]+").unwrap();
}

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum bytes per chunk
    pub max_length: usize,
    /// Split at sentence/word boundaries instead of raw byte slices
    pub preserve_words: bool,
    /// Append `.` to sentences that lack terminal punctuation
    pub append_terminator: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_length: crate::config::constants::CLIENT_DEFAULT_MAX_LENGTH,
            preserve_words: true,
            append_terminator: true,
        }
    }
}

/// Split text into ordered chunks no longer than `config.max_length` bytes.
///
/// With `preserve_words` the splitter packs whole sentences greedily, falls
/// back to word packing for oversized sentences, and byte-slices single
/// words that still exceed the bound. Without it the text is sliced at raw
/// length boundaries (snapped to char boundaries) and concatenating the
/// chunks reproduces the input. Output is deterministic for a given input
/// and configuration.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_length = config.max_length.max(1);

    if text.len() <= max_length {
        return vec![text.to_string()];
    }

    let chunks = if config.preserve_words {
        split_preserving_sentences(text, max_length, config.append_terminator)
    } else {
        split_bytes(text, max_length)
    };

    chunks
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .collect()
}

fn split_preserving_sentences(text: &str, max_length: usize, append_terminator: bool) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_by_sentences(text) {
        let mut sentence = sentence;
        if append_terminator
            && !sentence.ends_with('.')
            && !sentence.ends_with('!')
            && !sentence.ends_with('?')
        {
            sentence.push('.');
        }

        let candidate_len = if current.is_empty() {
            sentence.len()
        } else {
            current.len() + 1 + sentence.len()
        };

        if candidate_len <= max_length {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
            continue;
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
            current = String::new();
        }

        if sentence.len() > max_length {
            chunks.extend(split_by_words(&sentence, max_length));
        } else {
            current = sentence;
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Sentences are the runs between `.`, `!`, `?` terminators, trimmed.
fn split_by_sentences(text: &str) -> Vec<String> {
    SENTENCE_TERMINATORS
        .split(text)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn split_by_words(text: &str, max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };

        if candidate_len <= max_length {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }

        if !current.is_empty() {
            chunks.push(current.clone());
            current.clear();
        }

        if word.len() > max_length {
            chunks.extend(split_bytes(word, max_length));
        } else {
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Slice at `max_length` byte boundaries, snapped back to char boundaries.
fn split_bytes(text: &str, max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_length).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // a single multi-byte char wider than max_length; take it whole
            end = start + 1;
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        chunks.push(text[start..end].to_string());
        start = end;
    }

    chunks
}
