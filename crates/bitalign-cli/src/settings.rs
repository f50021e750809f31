use std::path::PathBuf;

use bitalign_core::{BleuConfig, ConfigFile};
use bitalign_pdf_mupdf::MupdfBackend;

use crate::Cli;

const DEFAULT_ENGLISH: &str = "english.pdf";
const DEFAULT_CHINESE: &str = "chinese.pdf";
const DEFAULT_CSV: &str = "output.csv";
const DEFAULT_XLSX: &str = "output.xlsx";

/// Fully resolved run settings: CLI flags > env vars > config file > defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub english: PathBuf,
    pub chinese: PathBuf,
    pub csv: PathBuf,
    pub xlsx: PathBuf,
    pub threads: Option<usize>,
    pub abbreviations: Option<PathBuf>,
    pub include_scores: bool,
    pub bleu: BleuConfig,
    pub header_exclusion: Option<f32>,
    pub footer_exclusion: Option<f32>,
    pub expand_ligatures: bool,
}

fn path_or(flag: Option<&PathBuf>, configured: Option<&String>, default: &str) -> PathBuf {
    flag.cloned()
        .or_else(|| configured.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

impl Settings {
    pub fn resolve(
        cli: &Cli,
        config: &ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let input = config.input.clone().unwrap_or_default();
        let output = config.output.clone().unwrap_or_default();
        let alignment = config.alignment.clone().unwrap_or_default();
        let sentences = config.sentences.clone().unwrap_or_default();
        let pdf = config.pdf.clone().unwrap_or_default();

        let env_threads = env("BITALIGN_THREADS").and_then(|v| match v.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!(value = %v, "ignoring invalid BITALIGN_THREADS");
                None
            }
        });
        // 0 means "let rayon decide"
        let threads = cli
            .threads
            .or(env_threads)
            .or(alignment.threads)
            .filter(|&n| n > 0);

        let abbreviations = cli
            .abbreviations
            .clone()
            .or_else(|| env("BITALIGN_ABBREVIATIONS").map(PathBuf::from))
            .or_else(|| sentences.abbreviations_path.map(PathBuf::from));

        Ok(Self {
            english: path_or(cli.english.as_ref(), input.english.as_ref(), DEFAULT_ENGLISH),
            chinese: path_or(cli.chinese.as_ref(), input.chinese.as_ref(), DEFAULT_CHINESE),
            csv: path_or(cli.csv.as_ref(), output.csv.as_ref(), DEFAULT_CSV),
            xlsx: path_or(cli.xlsx.as_ref(), output.xlsx.as_ref(), DEFAULT_XLSX),
            threads,
            abbreviations,
            include_scores: cli.include_scores || output.include_scores.unwrap_or(false),
            bleu: config.bleu_config()?,
            header_exclusion: pdf.header_exclusion,
            footer_exclusion: pdf.footer_exclusion,
            expand_ligatures: pdf.expand_ligatures.unwrap_or(true),
        })
    }

    pub fn backend(&self) -> MupdfBackend {
        let mut backend = MupdfBackend::new().with_ligature_expansion(self.expand_ligatures);
        if let Some(ratio) = self.header_exclusion {
            backend = backend.with_header_exclusion(ratio);
        }
        if let Some(ratio) = self.footer_exclusion {
            backend = backend.with_footer_exclusion(ratio);
        }
        backend
    }
}
