//! Errors surfaced by tree construction, insertion and queries.
//!
//! Everything is in memory, so none of these are transient: a failed call leaves the tree exactly
//! as it was.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dimension mismatch: tree has {expected} dimensions, point has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("query on an empty tree")]
    EmptyTree,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
