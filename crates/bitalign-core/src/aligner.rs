use rayon::prelude::*;
use thiserror::Error;

use crate::bleu::{BleuConfig, sentence_bleu};
use crate::{AlignedPair, Paragraph, Sentence};

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("failed to build scoring thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Scores how well a target sentence matches a source sentence.
pub trait SentenceScorer: Send + Sync {
    fn score(&self, source: &Sentence, target: &Sentence) -> f64;
}

/// Sentence BLEU with the source sentence as reference and the target
/// sentence as hypothesis.
#[derive(Debug, Clone, Default)]
pub struct BleuScorer {
    config: BleuConfig,
}

impl BleuScorer {
    pub fn new(config: BleuConfig) -> Self {
        Self { config }
    }
}

impl SentenceScorer for BleuScorer {
    fn score(&self, source: &Sentence, target: &Sentence) -> f64 {
        sentence_bleu(&source.tokens, &target.tokens, &self.config)
    }
}

/// Mean over source sentences of the best score against any target sentence.
///
/// A source paragraph without sentences scores 0; a source sentence scores 0
/// against a target paragraph without sentences.
pub fn paragraph_score<S: SentenceScorer + ?Sized>(
    source: &Paragraph,
    target: &Paragraph,
    scorer: &S,
) -> f64 {
    if source.sentences.is_empty() {
        return 0.0;
    }
    let total: f64 = source
        .sentences
        .iter()
        .map(|s| {
            target
                .sentences
                .iter()
                .map(|t| scorer.score(s, t))
                .reduce(f64::max)
                .unwrap_or(0.0)
        })
        .sum();
    total / source.sentences.len() as f64
}

/// Greedy paragraph aligner.
///
/// Every source paragraph is compared with every target paragraph; the first
/// target with the strictly highest score above 0 wins.
pub struct Aligner<S> {
    scorer: S,
    threads: Option<usize>,
}

impl<S: SentenceScorer> Aligner<S> {
    pub fn new(scorer: S) -> Self {
        Self {
            scorer,
            threads: None,
        }
    }

    /// Number of scoring threads. `None` uses the global rayon pool,
    /// `Some(1)` scores on the calling thread.
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Best target for one source paragraph, or `None` if no target scores
    /// above 0. Ties keep the earliest target.
    pub fn best_match(&self, source: &Paragraph, targets: &[Paragraph]) -> Option<AlignedPair> {
        let mut best_score = 0.0;
        let mut best: Option<&Paragraph> = None;

        for target in targets {
            let score = paragraph_score(source, target, &self.scorer);
            if score > best_score {
                best_score = score;
                best = Some(target);
            }
        }

        let target = best?;
        tracing::debug!(
            source = source.index,
            target = target.index,
            score = best_score,
            "paragraph matched"
        );
        Some(AlignedPair {
            source_index: source.index,
            target_index: target.index,
            source: source.text.clone(),
            target: target.text.clone(),
            score: best_score,
        })
    }

    /// Align every source paragraph, in source order.
    ///
    /// `progress` is called once per finished source paragraph with its index;
    /// with more than one thread the calls arrive out of order.
    pub fn align<F>(
        &self,
        sources: &[Paragraph],
        targets: &[Paragraph],
        progress: F,
    ) -> Result<Vec<AlignedPair>, AlignError>
    where
        F: Fn(usize) + Sync,
    {
        let score_one = |source: &Paragraph| {
            let pair = self.best_match(source, targets);
            progress(source.index);
            pair
        };

        let matches: Vec<Option<AlignedPair>> = match self.threads {
            Some(1) => sources.iter().map(score_one).collect(),
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()?
                .install(|| sources.par_iter().map(score_one).collect()),
            None => sources.par_iter().map(score_one).collect(),
        };

        let pairs: Vec<AlignedPair> = matches.into_iter().flatten().collect();
        tracing::info!(
            sources = sources.len(),
            targets = targets.len(),
            aligned = pairs.len(),
            "alignment complete"
        );
        Ok(pairs)
    }
}
