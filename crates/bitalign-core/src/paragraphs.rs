use once_cell::sync::Lazy;
use regex::Regex;

use crate::Paragraph;
use crate::sentences::SentenceSplitter;

/// Blank-line separator: two or more `\n`, or two or more `\r\n` pairs.
static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n+|\r\n\r\n+").unwrap());

/// Split extracted text into paragraphs on blank-line boundaries.
///
/// Nothing is trimmed or filtered: a leading separator yields a leading empty
/// paragraph, and empty input yields one empty paragraph.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK_RE.split(text).collect()
}

/// Split `text` into indexed paragraphs and segment each into sentences.
pub fn build_paragraphs(text: &str, splitter: &SentenceSplitter) -> Vec<Paragraph> {
    let paragraphs: Vec<Paragraph> = split_paragraphs(text)
        .into_iter()
        .enumerate()
        .map(|(index, p)| Paragraph {
            index,
            text: p.to_string(),
            sentences: splitter.split(p),
        })
        .collect();

    tracing::debug!(
        language = splitter.language().name(),
        paragraphs = paragraphs.len(),
        sentences = paragraphs.iter().map(|p| p.sentences.len()).sum::<usize>(),
        "split text into paragraphs"
    );
    paragraphs
}
