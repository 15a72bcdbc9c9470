use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchError {
    #[error("Cannot read {path}: {source}")]
    Discovery {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Format '{format}' cannot render a {kind} report")]
    FormatMismatch { format: String, kind: String },
    #[error("Link report has no legend entry for label {0}")]
    MissingLegend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchError>;
