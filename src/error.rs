use thiserror::Error;

/// Failure to obtain a document. Recovered per URL: the document is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} is not HTML ({content_type})")]
    NotHtml { url: String, content_type: String },
}

/// Failure inside the optional summarization / keyword stage.
/// Recovered per product: that product simply gets no extra features.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("text enrichment backend is not available")]
    Unavailable,
    #[error("nothing to enrich")]
    EmptyInput,
    #[error("no sentence could be scored")]
    NoSentences,
}

/// Errors that abort a whole run. Everything else is recovered locally.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no search backend configured; pass --url or enable search")]
    NoSearchBackend,
    #[error("search backend unavailable: {0}")]
    SearchUnavailable(String),
}

impl From<config::ConfigError> for RunError {
    fn from(err: config::ConfigError) -> Self {
        RunError::Config(err.to_string())
    }
}
