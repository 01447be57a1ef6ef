use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf conversion failed: {0}")]
    Conversion(String),

    #[error("recognition failed on page {page}: {reason}")]
    Recognition { page: u32, reason: String },

    #[error("required tool is not available: {0}")]
    MissingTool(String),

    #[error("{stage} exceeded its {limit:?} deadline")]
    DeadlineExceeded { stage: &'static str, limit: Duration },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no relevant documents found")]
    NoDocumentsResolved,

    #[error("documents not found: {}", .0.join(", "))]
    MissingDocuments(Vec<String>),

    #[error("language model request failed: {0}")]
    Upstream(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid query: {0}")]
    InvalidArgument(String),
}

impl QueryError {
    /// Whether the failure came from the language model side rather than the
    /// caller's request or the document store.
    pub fn is_upstream(&self) -> bool {
        matches!(self, QueryError::Upstream(_))
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
