use std::io::Write;
use std::path::Path;

use bitalign_core::{Language, Paragraph};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print paragraph and sentence counts for one extracted document.
pub fn print_document_summary(
    w: &mut dyn Write,
    language: Language,
    path: &Path,
    paragraphs: &[Paragraph],
    color: ColorMode,
) -> std::io::Result<()> {
    let sentences: usize = paragraphs.iter().map(|p| p.sentences.len()).sum();
    let empty = paragraphs.iter().filter(|p| p.sentences.is_empty()).count();

    if color.enabled() {
        writeln!(w, "{} {}", format!("{}:", language.name()).bold(), path.display())?;
    } else {
        writeln!(w, "{}: {}", language.name(), path.display())?;
    }
    writeln!(
        w,
        "  {} paragraphs, {} sentences",
        paragraphs.len(),
        sentences
    )?;
    if empty > 0 {
        let note = format!("  ({} paragraphs without sentences)", empty);
        if color.enabled() {
            writeln!(w, "{}", note.dimmed())?;
        } else {
            writeln!(w, "{}", note)?;
        }
    }
    Ok(())
}

/// Print the completion line naming both output files.
pub fn print_completion(
    w: &mut dyn Write,
    csv: &Path,
    xlsx: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let msg = format!(
        "Data exported to '{}' and '{}'",
        csv.display(),
        xlsx.display()
    );
    if color.enabled() {
        writeln!(w, "{}", msg.green())
    } else {
        writeln!(w, "{}", msg)
    }
}
