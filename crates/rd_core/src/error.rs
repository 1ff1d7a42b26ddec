use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Reasons a single raw article does not become a new stored article.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("article is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("article already stored: {0}")]
    DuplicateUrl(String),

    #[error("failed to persist article: {0}")]
    PersistenceFailure(String),
}

impl IngestError {
    pub fn persistence(err: Error) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
