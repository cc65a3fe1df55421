use thiserror::Error;

/// Errors surfaced by the running log.
///
/// Per-cell parse problems never show up here: a bad date becomes a null date
/// and a bad duration becomes zero. Only whole-file and input-boundary problems
/// reach the caller.
#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("could not write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid file structure: {0}")]
    Structure(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no record at index {index} (log has {len} records)")]
    RecordNotFound { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, RunLogError>;
