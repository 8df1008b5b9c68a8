use reqwest::StatusCode;
use thiserror::Error;

/// Why a single source failed to produce a price.
///
/// Transport variants come from the fetcher; the rest come from page parsing.
/// Both end up as the `error` text of a failure quote.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid selector `{0}`")]
    Selector(String),

    /// Page fetched but the expected structure was not there.
    #[error("{0}")]
    NotFound(String),
}

impl SourceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        SourceError::NotFound(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SourceError::Timeout { .. } | SourceError::Transport { .. } | SourceError::Status { .. }
        )
    }
}
