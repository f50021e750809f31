//! Rule-based sentence boundary detection.
//!
//! The [`SentenceModel`] carries the language data the rules consult (the
//! abbreviation table). It is built once per process through
//! [`ensure_model`]; a [`SentenceSplitter`] pairs a model with the
//! [`Language`] of the text it segments.

use std::collections::HashSet;
use std::path::PathBuf;

use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;

use crate::{Language, Sentence};

#[derive(Error, Debug)]
pub enum SentenceModelError {
    #[error("sentence model data unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Words that are commonly followed by a period without ending a sentence.
const BUILTIN_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "ft", "vs", "cf", "al", "fig",
    "figs", "eq", "eqs", "no", "nos", "vol", "vols", "pp", "p", "ed", "eds", "ch", "sec",
    "inc", "ltd", "co", "corp", "dept", "univ", "approx", "est", "jan", "feb", "mar", "apr",
    "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "gen", "gov", "sen", "rep",
    "rev", "capt", "col", "lt", "sgt", "hon", "op", "cit", "ibid",
];

/// Options for building the process-wide sentence model.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// Extra abbreviations, one per line; blank lines and `#` comments are ignored.
    pub extra_abbreviations: Option<PathBuf>,
}

/// Language data used by the boundary rules.
#[derive(Debug, Clone)]
pub struct SentenceModel {
    abbreviations: HashSet<String>,
}

static BUILTIN_MODEL: Lazy<SentenceModel> = Lazy::new(|| SentenceModel {
    abbreviations: BUILTIN_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
});

static MODEL: OnceCell<SentenceModel> = OnceCell::new();

/// Make sure the process-wide sentence model is loaded and return it.
///
/// The first successful call builds the model from `options`; every later
/// call returns that same instance and ignores its argument. A failed load
/// leaves nothing cached, so the call can be retried.
pub fn ensure_model(options: &ModelOptions) -> Result<&'static SentenceModel, SentenceModelError> {
    MODEL.get_or_try_init(|| {
        let model = SentenceModel::load(options)?;
        tracing::debug!(
            abbreviations = model.abbreviations.len(),
            "sentence model initialised"
        );
        Ok(model)
    })
}

impl SentenceModel {
    /// The model with only the built-in abbreviation table.
    pub fn builtin() -> &'static SentenceModel {
        &BUILTIN_MODEL
    }

    /// Build a model from `options` without touching the process-wide cache.
    pub fn load(options: &ModelOptions) -> Result<SentenceModel, SentenceModelError> {
        let mut model = BUILTIN_MODEL.clone();
        if let Some(path) = &options.extra_abbreviations {
            let content =
                std::fs::read_to_string(path).map_err(|source| SentenceModelError::Unavailable {
                    path: path.clone(),
                    source,
                })?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                model
                    .abbreviations
                    .insert(line.trim_end_matches('.').to_lowercase());
            }
        }
        Ok(model)
    }

    pub fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations.contains(&word.to_lowercase())
    }
}

/// Splits paragraph text into sentences for one language.
#[derive(Debug, Clone, Copy)]
pub struct SentenceSplitter<'m> {
    language: Language,
    model: &'m SentenceModel,
}

impl SentenceSplitter<'static> {
    /// Splitter backed by the built-in model.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            model: SentenceModel::builtin(),
        }
    }
}

impl<'m> SentenceSplitter<'m> {
    pub fn with_model(language: Language, model: &'m SentenceModel) -> Self {
        Self { language, model }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Split `text` into trimmed, non-empty sentences in document order.
    pub fn split(&self, text: &str) -> Vec<Sentence> {
        self.split_spans(text)
            .into_iter()
            .map(Sentence::new)
            .collect()
    }

    /// Sentence boundaries as trimmed sub-slices of `text`.
    pub fn split_spans<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let n = chars.len();
        let byte_at = |i: usize| byte_of(&chars, i, text);

        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < n {
            let c = chars[i].1;

            if is_cjk_terminator(c) {
                let mut j = i + 1;
                while j < n && (is_cjk_terminator(chars[j].1) || is_closing(chars[j].1)) {
                    j += 1;
                }
                push_span(&mut spans, &text[start..byte_at(j)]);
                start = byte_at(j);
                i = j;
                continue;
            }

            if matches!(c, '.' | '?' | '!') {
                let mut j = i + 1;
                while j < n && (matches!(chars[j].1, '.' | '?' | '!') || is_closing(chars[j].1)) {
                    j += 1;
                }
                let next = chars.get(j).map(|&(_, ch)| ch);
                let periods_only = chars[i..j]
                    .iter()
                    .all(|&(_, ch)| ch == '.' || is_closing(ch));

                let boundary = match next {
                    None => true,
                    Some(ch) if ch.is_whitespace() => {
                        !periods_only || self.period_ends_sentence(text, &chars, i, j)
                    }
                    Some(ch) => {
                        self.language == Language::Chinese && !periods_only && is_cjk(ch)
                    }
                };

                if boundary {
                    push_span(&mut spans, &text[start..byte_at(j)]);
                    start = byte_at(j);
                }
                i = j;
                continue;
            }

            i += 1;
        }

        push_span(&mut spans, &text[start..]);
        spans
    }

    /// Decide whether the period run `chars[i..j]`, followed by whitespace,
    /// closes a sentence.
    fn period_ends_sentence(&self, text: &str, chars: &[(usize, char)], i: usize, j: usize) -> bool {
        // Next word starting lowercase continues the sentence.
        match chars[j..].iter().map(|&(_, c)| c).find(|c| !c.is_whitespace()) {
            None => return true,
            Some(c) if c.is_lowercase() => return false,
            Some(_) => {}
        }

        // Only a single period can belong to an abbreviation.
        if j - i > 1 && chars[i + 1].1 == '.' {
            return true;
        }

        let word_start = chars[..i]
            .iter()
            .rposition(|&(_, c)| c.is_whitespace())
            .map_or(0, |k| k + 1);
        let word = text[byte_of(chars, word_start, text)..chars[i].0]
            .trim_start_matches(|c: char| is_opening(c));

        if word.is_empty() {
            return true;
        }
        if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
            return false;
        }
        if word.contains('.') && word.chars().any(char::is_alphabetic) {
            return false;
        }
        !self.model.is_abbreviation(word)
    }
}

fn byte_of(chars: &[(usize, char)], i: usize, text: &str) -> usize {
    chars.get(i).map_or(text.len(), |&(b, _)| b)
}

fn push_span<'t>(spans: &mut Vec<&'t str>, span: &'t str) {
    let span = span.trim();
    if !span.is_empty() {
        spans.push(span);
    }
}

fn is_cjk_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '．' | '｡')
}

fn is_closing(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | ')' | ']' | '}' | '”' | '’' | '」' | '』' | '）' | '】' | '》' | '〕' | '〉'
    )
}

fn is_opening(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '{' | '“' | '‘')
}

fn is_cjk(c: char) -> bool {
    crate::tokenize::is_cjk_char(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en(text: &str) -> Vec<&str> {
        SentenceSplitter::new(Language::English).split_spans(text)
    }

    fn zh(text: &str) -> Vec<&str> {
        SentenceSplitter::new(Language::Chinese).split_spans(text)
    }

    #[test]
    fn test_basic_english() {
        assert_eq!(
            en("The cat sat. Dogs bark loudly! Why? Because."),
            vec!["The cat sat.", "Dogs bark loudly!", "Why?", "Because."]
        );
    }

    #[test]
    fn test_no_terminator() {
        assert_eq!(en("  a heading without a period \n"), vec!["a heading without a period"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(en("").is_empty());
        assert!(en(" \n\t ").is_empty());
        assert!(zh("").is_empty());
    }

    #[test]
    fn test_abbreviations_and_initials() {
        assert_eq!(
            en("Dr. Smith met J. R. Tolkien. They talked."),
            vec!["Dr. Smith met J. R. Tolkien.", "They talked."]
        );
        assert_eq!(
            en("See Fig. 3 for details, e.g. the table. Next one."),
            vec!["See Fig. 3 for details, e.g. the table.", "Next one."]
        );
    }

    #[test]
    fn test_lowercase_continuation() {
        assert_eq!(en("It costs approx. ten dollars."), vec!["It costs approx. ten dollars."]);
        assert_eq!(en("Use the foo. bar API."), vec!["Use the foo. bar API."]);
    }

    #[test]
    fn test_decimal_not_boundary() {
        assert_eq!(en("Pi is 3.14 roughly. Yes."), vec!["Pi is 3.14 roughly.", "Yes."]);
    }

    #[test]
    fn test_closing_quotes_attach() {
        assert_eq!(
            en("He said \"stop.\" Then left."),
            vec!["He said \"stop.\"", "Then left."]
        );
    }

    #[test]
    fn test_chinese_terminators() {
        assert_eq!(zh("猫坐着。狗大声叫！真的吗？"), vec!["猫坐着。", "狗大声叫！", "真的吗？"]);
        assert_eq!(zh("他说：“好。”然后走了。"), vec!["他说：“好。”", "然后走了。"]);
    }

    #[test]
    fn test_chinese_halfwidth_marks() {
        assert_eq!(zh("你好!我很好?"), vec!["你好!", "我很好?"]);
        // English mode keeps requiring whitespace after half-width marks.
        assert_eq!(en("你好!我很好?"), vec!["你好!我很好?"]);
    }

    #[test]
    fn test_cjk_terminators_split_in_english_mode() {
        assert_eq!(en("Intro 猫坐着。Then more."), vec!["Intro 猫坐着。", "Then more."]);
    }

    #[test]
    fn test_split_builds_tokens() {
        let sentences = SentenceSplitter::new(Language::Chinese).split("猫坐着。");
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].tokens, vec!["猫", "坐", "着", "。"]);
    }

    #[test]
    fn test_load_extra_abbreviations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abbrev.txt");
        std::fs::write(&path, "# custom\n\nAssn.\nDiv\n").unwrap();

        let model = SentenceModel::load(&ModelOptions {
            extra_abbreviations: Some(path),
        })
        .unwrap();
        assert!(model.is_abbreviation("assn"));
        assert!(model.is_abbreviation("Div"));
        assert!(model.is_abbreviation("dr"));

        let splitter = SentenceSplitter::with_model(Language::English, &model);
        assert_eq!(
            splitter.split_spans("The Assn. Board met. Done."),
            vec!["The Assn. Board met.", "Done."]
        );
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let err = SentenceModel::load(&ModelOptions {
            extra_abbreviations: Some(PathBuf::from("/nonexistent/abbrev.txt")),
        })
        .unwrap_err();
        assert!(matches!(err, SentenceModelError::Unavailable { .. }));
    }

    #[test]
    fn test_ensure_model_is_idempotent() {
        let a = ensure_model(&ModelOptions::default()).unwrap();
        let b = ensure_model(&ModelOptions::default()).unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(a.is_abbreviation("mr"));
    }
}
