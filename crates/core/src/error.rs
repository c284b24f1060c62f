use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to extract {}: {reason}", path.display())]
    ExtractionFailure { path: PathBuf, reason: String },

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("no extractable documents: {0}")]
    NoDocuments(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vectors and metadata must have the same length (vectors={vectors}, metadata={metadata})")]
    InputMismatch { vectors: usize, metadata: usize },

    #[error("remote index unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("missing credentials for {0}")]
    MissingCredentials(String),

    #[error("{0} returned an empty response")]
    EmptyResponse(String),

    #[error("{backend} returned {actual} embeddings for {expected} inputs")]
    CountMismatch {
        backend: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
