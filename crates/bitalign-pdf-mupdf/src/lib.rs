use std::path::Path;

use mupdf::{Document, TextPageFlags};

use bitalign_core::text_processing::expand_ligatures;
use bitalign_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// Kept in its own crate so the AGPL-3.0 mupdf dependency stays out of the
/// alignment and export crates.
///
/// Every text line ends with `\n`, every text block is followed by a blank
/// line and pages are joined with `\n`, so blank lines in the output are the
/// block (paragraph) gaps MuPDF reports. Header and footer bands are kept
/// unless an exclusion ratio is set.
pub struct MupdfBackend {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    /// `None` keeps the whole page.
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    /// `None` keeps the whole page.
    header_exclusion_ratio: Option<f32>,
    /// Replace typographic ligatures (`ﬁ`, `ﬂ`, …) with plain letters.
    expand_ligatures: bool,
}

impl Default for MupdfBackend {
    fn default() -> Self {
        Self {
            footer_exclusion_ratio: None,
            header_exclusion_ratio: None,
            expand_ligatures: true,
        }
    }
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = band_ratio(ratio, "footer");
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = band_ratio(ratio, "header");
        self
    }

    pub fn with_ligature_expansion(mut self, enabled: bool) -> Self {
        self.expand_ligatures = enabled;
        self
    }
}

/// `0.0` disables the band. Ratios outside `[0, 1)` would drop nothing or
/// the whole page, so they are ignored with a warning.
fn band_ratio(ratio: f32, band: &'static str) -> Option<f32> {
    if ratio == 0.0 {
        None
    } else if (0.0..1.0).contains(&ratio) {
        Some(ratio)
    } else {
        tracing::warn!(band, ratio, "ignoring exclusion ratio outside [0, 1)");
        None
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages_text = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let page_bounds = page
                .bounds()
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let page_height = page_bounds.y1 - page_bounds.y0;

            let header_threshold = self
                .header_exclusion_ratio
                .map(|r| page_bounds.y0 + page_height * r);
            let footer_threshold = self
                .footer_exclusion_ratio
                .map(|r| page_bounds.y1 - page_height * r);

            let mut page_text = String::new();
            for block in text_page.blocks() {
                let block_bounds = block.bounds();

                if let Some(threshold) = header_threshold
                    && block_bounds.y1 <= threshold
                {
                    continue;
                }
                if let Some(threshold) = footer_threshold
                    && block_bounds.y0 >= threshold
                {
                    continue;
                }

                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
                // Blank line between blocks marks a paragraph gap.
                page_text.push('\n');
            }
            pages_text.push(page_text);
        }

        let text = pages_text.join("\n");

        if self.expand_ligatures {
            Ok(expand_ligatures(&text))
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitalign_core::split_paragraphs;

    /// A one-page PDF with a line near the top and another half a page
    /// lower, far enough apart for MuPDF to report two text blocks.
    fn two_block_pdf() -> Vec<u8> {
        let content = "BT /F1 12 Tf 72 720 Td (First block.) Tj ET\n\
                       BT /F1 12 Tf 72 400 Td (Second block.) Tj ET\n";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}endstream",
                content.len(),
                content
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_offset = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        pdf
    }

    fn write_pdf(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("two-blocks.pdf");
        std::fs::write(&path, two_block_pdf()).unwrap();
        path
    }

    #[test]
    fn blocks_become_separate_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let text = MupdfBackend::new().extract_text(&write_pdf(&dir)).unwrap();

        let paragraphs: Vec<&str> = split_paragraphs(&text)
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        assert_eq!(paragraphs, vec!["First block.", "Second block."]);
    }

    #[test]
    fn header_band_drops_top_block() {
        let dir = tempfile::tempdir().unwrap();
        let text = MupdfBackend::new()
            .with_header_exclusion(0.2)
            .extract_text(&write_pdf(&dir))
            .unwrap();
        assert!(!text.contains("First block."));
        assert!(text.contains("Second block."));
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = MupdfBackend::new()
            .extract_text(Path::new("/nonexistent/english.pdf"))
            .unwrap_err();
        assert!(matches!(err, BackendError::OpenError(_)));
    }

    #[test]
    fn zero_ratio_disables_exclusion() {
        let backend = MupdfBackend::new()
            .with_header_exclusion(0.04)
            .with_footer_exclusion(0.0);
        assert_eq!(backend.header_exclusion_ratio, Some(0.04));
        assert_eq!(backend.footer_exclusion_ratio, None);
    }

    #[test]
    fn out_of_range_ratios_are_ignored() {
        let backend = MupdfBackend::new()
            .with_header_exclusion(1.5)
            .with_footer_exclusion(-0.1);
        assert_eq!(backend.header_exclusion_ratio, None);
        assert_eq!(backend.footer_exclusion_ratio, None);
        assert_eq!(band_ratio(f32::NAN, "header"), None);
        assert_eq!(band_ratio(0.999, "footer"), Some(0.999));
    }
}
