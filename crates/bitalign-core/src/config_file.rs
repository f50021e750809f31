use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bleu::{BleuConfig, Smoothing};

/// Epsilon used by `smoothing = "epsilon"` when none is configured.
pub const DEFAULT_EPSILON: f64 = 0.1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub input: Option<InputConfig>,
    pub output: Option<OutputConfig>,
    pub alignment: Option<AlignmentConfig>,
    pub sentences: Option<SentencesConfig>,
    pub pdf: Option<PdfConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    pub english: Option<String>,
    pub chinese: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub csv: Option<String>,
    pub xlsx: Option<String>,
    pub include_scores: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub threads: Option<usize>,
    pub max_ngram: Option<usize>,
    /// `"floor"` or `"epsilon"`.
    pub smoothing: Option<String>,
    pub epsilon: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentencesConfig {
    pub abbreviations_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfConfig {
    pub header_exclusion: Option<f32>,
    pub footer_exclusion: Option<f32>,
    pub expand_ligatures: Option<bool>,
}

/// Platform config directory path: `<config_dir>/bitalign/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bitalign").join("config.toml"))
}

/// Load config by cascading CWD `.bitalign.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".bitalign.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }
    match read_config(path) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config file");
            None
        }
    }
}

/// Read and parse a config file, failing on any error.
pub fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// First value found in `overlay`, falling back to `base`.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        input: Some(InputConfig {
            english: pick(&overlay.input, &base.input, |i| i.english.clone()),
            chinese: pick(&overlay.input, &base.input, |i| i.chinese.clone()),
        }),
        output: Some(OutputConfig {
            csv: pick(&overlay.output, &base.output, |o| o.csv.clone()),
            xlsx: pick(&overlay.output, &base.output, |o| o.xlsx.clone()),
            include_scores: pick(&overlay.output, &base.output, |o| o.include_scores),
        }),
        alignment: Some(AlignmentConfig {
            threads: pick(&overlay.alignment, &base.alignment, |a| a.threads),
            max_ngram: pick(&overlay.alignment, &base.alignment, |a| a.max_ngram),
            smoothing: pick(&overlay.alignment, &base.alignment, |a| a.smoothing.clone()),
            epsilon: pick(&overlay.alignment, &base.alignment, |a| a.epsilon),
        }),
        sentences: Some(SentencesConfig {
            abbreviations_path: pick(&overlay.sentences, &base.sentences, |s| {
                s.abbreviations_path.clone()
            }),
        }),
        pdf: Some(PdfConfig {
            header_exclusion: pick(&overlay.pdf, &base.pdf, |p| p.header_exclusion),
            footer_exclusion: pick(&overlay.pdf, &base.pdf, |p| p.footer_exclusion),
            expand_ligatures: pick(&overlay.pdf, &base.pdf, |p| p.expand_ligatures),
        }),
    }
}

impl ConfigFile {
    /// BLEU settings from the `[alignment]` table, defaults where unset.
    pub fn bleu_config(&self) -> Result<BleuConfig, ConfigError> {
        let alignment = self.alignment.clone().unwrap_or_default();
        let mut config = BleuConfig::default();

        if let Some(n) = alignment.max_ngram {
            if n == 0 {
                return Err(ConfigError::Invalid("alignment.max_ngram must be at least 1".into()));
            }
            config.max_ngram = n;
        }

        config.smoothing = match alignment.smoothing.as_deref() {
            None | Some("floor") => Smoothing::Floor,
            Some("epsilon") => {
                let eps = alignment.epsilon.unwrap_or(DEFAULT_EPSILON);
                if eps.is_nan() || eps <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "alignment.epsilon must be positive, got {eps}"
                    )));
                }
                Smoothing::Epsilon(eps)
            }
            Some(other) => {
                return Err(ConfigError::Invalid(format!(
                    "unknown alignment.smoothing \"{other}\" (expected \"floor\" or \"epsilon\")"
                )));
            }
        };

        Ok(config)
    }
}
