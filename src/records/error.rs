use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid graph data JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} {args:?} failed: {stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        stderr: String,
    },
    #[error("command output was not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unknown knowledge link type `{0}`")]
    UnknownLinkType(String),
    #[error("knowledge link {0} does not exist")]
    LinkNotFound(String),
}

pub type DataResult<T> = Result<T, DataError>;
