use std::path::Path;

use bitalign_core::AlignedPair;

use crate::ReportError;

pub const ENGLISH_HEADER: &str = "English Paragraph";
pub const CHINESE_HEADER: &str = "Chinese Paragraph";
pub const SCORE_HEADER: &str = "BLEU Score";

/// Options shared by the CSV and XLSX writers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Append a third column with the paragraph-pair score.
    pub include_scores: bool,
}

/// Column headers for the given options.
pub(crate) fn headers(options: &ExportOptions) -> Vec<&'static str> {
    let mut headers = vec![ENGLISH_HEADER, CHINESE_HEADER];
    if options.include_scores {
        headers.push(SCORE_HEADER);
    }
    headers
}

/// Write aligned pairs to both the CSV and the XLSX file.
pub fn export_all(
    pairs: &[AlignedPair],
    csv_path: &Path,
    xlsx_path: &Path,
    options: &ExportOptions,
) -> Result<(), ReportError> {
    export_csv(pairs, csv_path, options)?;
    crate::xlsx::export_xlsx(pairs, xlsx_path, options)?;
    tracing::info!(
        rows = pairs.len(),
        csv = %csv_path.display(),
        xlsx = %xlsx_path.display(),
        "exported aligned pairs"
    );
    Ok(())
}

/// Write aligned pairs as CSV, header first, no index column.
pub fn export_csv(
    pairs: &[AlignedPair],
    path: &Path,
    options: &ExportOptions,
) -> Result<(), ReportError> {
    std::fs::write(path, render_csv(pairs, options))?;
    Ok(())
}

/// Score text shared by both writers. Scores below 1e-4 use exponent
/// notation; `Display` alone would print hundreds of leading zeros.
pub(crate) fn format_score(score: f64) -> String {
    if score != 0.0 && score.abs() < 1e-4 {
        format!("{score:e}")
    } else {
        score.to_string()
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Render aligned pairs as CSV text with `\n` record terminators.
pub fn render_csv(pairs: &[AlignedPair], options: &ExportOptions) -> String {
    let mut out = headers(options).join(",");
    out.push('\n');
    for pair in pairs {
        out.push_str(&csv_escape(&pair.source));
        out.push(',');
        out.push_str(&csv_escape(&pair.target));
        if options.include_scores {
            out.push(',');
            out.push_str(&format_score(pair.score));
        }
        out.push('\n');
    }
    out
}
