use thiserror::Error;

/// Errors raised while building a band report.
///
/// Anything listed here aborts the whole run before an output file is
/// written. Bad individual cells are not errors; those rows are dropped.
#[derive(Error, Debug)]
pub enum ReportError {
    /// None of the accepted names for a required column is present
    #[error("Column not found: expected one of [{expected}]")]
    ColumnNotFound { expected: String },

    /// No configured subject has both a score and a rank column
    #[error("No valid subjects: none of [{subjects}] has both a score column and a rank column")]
    NoValidSubjects { subjects: String },

    #[error("Malformed threshold input '{0}': use non-negative integers separated by commas or spaces")]
    MalformedThresholdInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Sheet '{0}' is empty or has no header row")]
    EmptySheet(String),

    #[error("Unsupported input format for '{0}'")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Workbook(#[from] calamine::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn column_not_found(expected: &[String]) -> Self {
        ReportError::ColumnNotFound {
            expected: expected.join(", "),
        }
    }
}
