use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use bitalign_core::config_file::{load_config, read_config};
use bitalign_core::{
    Aligner, BleuScorer, CoreError, Language, ModelOptions, Paragraph, SentenceSplitter,
    ensure_model, load_document,
};
use bitalign_reporting::{ExportOptions, export_all};

mod output;
mod settings;

use output::ColorMode;
use settings::Settings;

/// Bilingual paragraph aligner - pair English and Chinese PDF paragraphs by BLEU
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// English PDF (default: english.pdf)
    #[arg(long, value_name = "PATH")]
    english: Option<PathBuf>,

    /// Chinese PDF (default: chinese.pdf)
    #[arg(long, value_name = "PATH")]
    chinese: Option<PathBuf>,

    /// CSV output path (default: output.csv)
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// XLSX output path (default: output.xlsx)
    #[arg(long, value_name = "PATH")]
    xlsx: Option<PathBuf>,

    /// Config file to use instead of the .bitalign.toml / user config cascade
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of scoring threads (1 scores sequentially)
    #[arg(long)]
    threads: Option<usize>,

    /// Extra sentence abbreviations, one per line
    #[arg(long, value_name = "PATH")]
    abbreviations: Option<PathBuf>,

    /// Add a BLEU Score column to both outputs
    #[arg(long)]
    include_scores: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Dry run: extract and split both PDFs, print counts, skip scoring and export
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    // Explicit --config replaces the cascade and must load cleanly
    let config = match &cli.config {
        Some(path) => read_config(path)?,
        None => load_config(),
    };
    let settings = Settings::resolve(&cli, &config, |key| std::env::var(key).ok())?;
    let color = ColorMode(!cli.no_color);

    if cli.dry_run {
        dry_run(&settings, color)
    } else {
        align(&settings, color)
    }
}

fn check_inputs(settings: &Settings) -> anyhow::Result<()> {
    for path in [&settings.english, &settings.chinese] {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }
    Ok(())
}

/// Load the sentence model, then extract and split both documents.
fn load_documents(settings: &Settings) -> Result<(Vec<Paragraph>, Vec<Paragraph>), CoreError> {
    let model = ensure_model(&ModelOptions {
        extra_abbreviations: settings.abbreviations.clone(),
    })?;
    let backend = settings.backend();

    let english = load_document(
        &settings.english,
        &backend,
        &SentenceSplitter::with_model(Language::English, model),
    )?;
    let chinese = load_document(
        &settings.chinese,
        &backend,
        &SentenceSplitter::with_model(Language::Chinese, model),
    )?;
    Ok((english, chinese))
}

fn dry_run(settings: &Settings, color: ColorMode) -> anyhow::Result<()> {
    check_inputs(settings)?;
    let (english, chinese) = load_documents(settings)?;

    let mut stdout = std::io::stdout();
    for (language, path, paragraphs) in [
        (Language::English, &settings.english, &english),
        (Language::Chinese, &settings.chinese, &chinese),
    ] {
        output::print_document_summary(&mut stdout, language, path, paragraphs, color)?;
    }
    stdout.flush()?;
    Ok(())
}

fn align(settings: &Settings, color: ColorMode) -> anyhow::Result<()> {
    check_inputs(settings)?;
    let (english, chinese) = load_documents(settings)?;

    let bar = ProgressBar::new(english.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len} paragraphs (eta {eta})",
        )?
        .progress_chars("=> "),
    );
    bar.set_message("Scoring");

    let aligner =
        Aligner::new(BleuScorer::new(settings.bleu.clone())).with_threads(settings.threads);
    let pairs = aligner.align(&english, &chinese, |_| bar.inc(1))?;
    bar.finish_and_clear();

    let options = ExportOptions {
        include_scores: settings.include_scores,
    };
    export_all(&pairs, &settings.csv, &settings.xlsx, &options).with_context(|| {
        format!(
            "failed to export to {} and {}",
            settings.csv.display(),
            settings.xlsx.display()
        )
    })?;

    let mut stdout = std::io::stdout();
    output::print_completion(&mut stdout, &settings.csv, &settings.xlsx, color)?;
    stdout.flush()?;
    Ok(())
}
