use thiserror::Error;

pub mod export;
pub mod xlsx;

pub use export::{
    CHINESE_HEADER, ENGLISH_HEADER, ExportOptions, SCORE_HEADER, export_all, export_csv,
    render_csv,
};
pub use xlsx::export_xlsx;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write spreadsheet archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write spreadsheet XML: {0}")]
    Xml(String),
}
