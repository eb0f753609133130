use std::io;
use std::path::PathBuf;

/// Errors raised outside the pure template engine: settings, providers,
/// note sinks and the script capability check.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings file: {0}")]
    Settings(#[from] serde_yaml::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid provider url: {0}")]
    InvalidUrl(String),

    #[error("no book found for isbn {0}")]
    BookNotFound(String),

    #[error("no results for query {0:?}")]
    NoResults(String),

    #[error("note already exists: {}", .0.display())]
    NoteExists(PathBuf),

    /// The template uses `<%= %>` tokens but no expression engine is available.
    #[error("template contains script expressions but script execution is not available")]
    ScriptEngineUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
