use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod aligner;
pub mod backend;
pub mod bleu;
pub mod config_file;
pub mod paragraphs;
pub mod sentences;
pub mod text_processing;
pub mod tokenize;

// Re-export for convenience
pub use aligner::{AlignError, Aligner, BleuScorer, SentenceScorer, paragraph_score};
pub use backend::{BackendError, PdfBackend};
pub use bleu::{BleuConfig, Smoothing, sentence_bleu};
pub use config_file::{ConfigError, ConfigFile};
pub use paragraphs::{build_paragraphs, split_paragraphs};
pub use sentences::{ModelOptions, SentenceModel, SentenceModelError, SentenceSplitter, ensure_model};
pub use tokenize::tokenize;

/// Language of one side of the document pair.
///
/// Drives the sentence boundary rules; the word tokenizer is script-aware on
/// its own and does not need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Chinese => "Chinese",
        }
    }
}

/// A sentence together with its word tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub tokens: Vec<String>,
}

impl Sentence {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text).into_iter().map(str::to_string).collect();
        Self { text, tokens }
    }
}

/// A blank-line delimited span of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// 0-based position in the split sequence.
    pub index: usize,
    pub text: String,
    pub sentences: Vec<Sentence>,
}

/// A source paragraph paired with its best-scoring target paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub source_index: usize,
    pub target_index: usize,
    pub source: String,
    pub target: String,
    pub score: f64,
}

/// Extract the text of `pdf_path` through `backend` and split it into
/// paragraphs with sentences.
pub fn extract_paragraphs(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    splitter: &SentenceSplitter<'_>,
) -> Result<Vec<Paragraph>, BackendError> {
    let text = backend.extract_text(pdf_path)?;
    tracing::debug!(
        path = %pdf_path.display(),
        chars = text.chars().count(),
        "extracted PDF text"
    );
    Ok(build_paragraphs(&text, splitter))
}

/// Failure anywhere in the extract, split and align pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to extract text from {}: {source}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("sentence model error: {0}")]
    SentenceModel(#[from] SentenceModelError),
    #[error("alignment error: {0}")]
    Align(#[from] AlignError),
}

/// [`extract_paragraphs`] with the failing path attached to the error.
pub fn load_document(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    splitter: &SentenceSplitter<'_>,
) -> Result<Vec<Paragraph>, CoreError> {
    extract_paragraphs(pdf_path, backend, splitter).map_err(|source| CoreError::Extraction {
        path: pdf_path.to_path_buf(),
        source,
    })
}
