use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed url: {0}")]
    MalformedUrl(#[from] url::ParseError),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("page at {url} is missing {what}")]
    MissingElement { url: String, what: &'static str },

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("couldn't serialize a record: {0}")]
    Json(#[from] serde_json::Error),
}
