use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider failed: {0}")]
    Provider(String),

    #[error("invalid provider base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
