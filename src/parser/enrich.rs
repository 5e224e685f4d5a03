//! Optional summarization + keyword extraction over a product's running
//! text. Keywords come back as ordinary candidates and go through the same
//! filter chain as everything else.

use std::collections::HashMap;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::error::EnrichError;

use super::lexicon::{detect_language, is_stop_word, tokenize, Language};

static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").unwrap());

const MIN_KEYWORD_CHARS: usize = 3;

pub trait TextEnricher: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Extractive summary of at most `sentences` sentences.
    fn summarize(&self, text: &str, lang: Language, sentences: usize) -> Result<String, EnrichError>;

    /// Up to `count` single-token keywords, most salient first.
    fn keywords(&self, text: &str, lang: Language, count: usize) -> Result<Vec<String>, EnrichError>;
}

/// Selected when enrichment is unavailable; the stage becomes a no-op.
pub struct NoEnricher;

impl TextEnricher for NoEnricher {
    fn is_available(&self) -> bool {
        false
    }

    fn summarize(&self, _: &str, _: Language, _: usize) -> Result<String, EnrichError> {
        Err(EnrichError::Unavailable)
    }

    fn keywords(&self, _: &str, _: Language, _: usize) -> Result<Vec<String>, EnrichError> {
        Err(EnrichError::Unavailable)
    }
}

/// Word-frequency enricher: sentences are ranked by the average frequency
/// of their content words (Luhn), keywords by raw frequency.
#[derive(Default)]
pub struct FrequencyEnricher;

impl FrequencyEnricher {
    fn content_words(text: &str, lang: Language) -> impl Iterator<Item = &str> {
        tokenize(text).into_iter().filter(move |t| {
            t.chars().count() >= MIN_KEYWORD_CHARS
                && !t.chars().all(char::is_numeric)
                && !is_stop_word(t, lang)
        })
    }

    fn frequencies(text: &str, lang: Language) -> HashMap<String, usize> {
        Self::content_words(text, lang).map(str::to_lowercase).counts()
    }
}

impl TextEnricher for FrequencyEnricher {
    fn summarize(&self, text: &str, lang: Language, sentences: usize) -> Result<String, EnrichError> {
        if text.trim().is_empty() {
            return Err(EnrichError::EmptyInput);
        }
        let freq = Self::frequencies(text, lang);
        let scored: Vec<(usize, &str, f64)> = SENTENCE_RE
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .filter_map(|(i, s)| {
                let words: Vec<String> = Self::content_words(s, lang).map(str::to_lowercase).collect();
                if words.is_empty() {
                    return None;
                }
                let total: usize = words.iter().map(|w| freq.get(w).copied().unwrap_or(0)).sum();
                Some((i, s, total as f64 / words.len() as f64))
            })
            .collect();
        if scored.is_empty() {
            return Err(EnrichError::NoSentences);
        }

        let summary = scored
            .iter()
            .sorted_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)))
            .take(sentences.max(1))
            .sorted_by_key(|(i, _, _)| *i)
            .map(|(_, s, _)| *s)
            .join(". ");
        Ok(summary)
    }

    fn keywords(&self, text: &str, lang: Language, count: usize) -> Result<Vec<String>, EnrichError> {
        if text.trim().is_empty() {
            return Err(EnrichError::EmptyInput);
        }
        // lowercase form → (frequency, first position, surface form)
        let mut stats: HashMap<String, (usize, usize, &str)> = HashMap::new();
        for (pos, word) in Self::content_words(text, lang).enumerate() {
            stats
                .entry(word.to_lowercase())
                .and_modify(|s| s.0 += 1)
                .or_insert((1, pos, word));
        }
        Ok(stats
            .into_values()
            .sorted_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)))
            .take(count)
            .map(|(_, _, word)| word.to_string())
            .collect())
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Summarize the product's concatenated text, then pull keywords out of the
/// summary. The language of both steps is guessed from the buffer.
pub fn enrich_product(
    enricher: &dyn TextEnricher,
    texts: &[String],
    max_chars: usize,
    sentences: usize,
    keyword_count: usize,
) -> Result<Vec<String>, EnrichError> {
    if !enricher.is_available() {
        return Err(EnrichError::Unavailable);
    }
    let joined = texts.join("\n");
    let buffer = cap_chars(&joined, max_chars);
    if buffer.trim().is_empty() {
        return Err(EnrichError::EmptyInput);
    }
    let lang = detect_language(buffer);
    let summary = enricher.summarize(buffer, lang, sentences)?;
    enricher.keywords(&summary, detect_language(&summary), keyword_count)
}
