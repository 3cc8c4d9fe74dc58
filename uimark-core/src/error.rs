use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UimarkError {
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("chapter {index} out of range (item has {len} chapters)")]
    ChapterOutOfRange { index: usize, len: usize },

    #[error("no HTML in response, received: {excerpt}")]
    NoHtml { excerpt: String },

    #[error("image lookup failed: {0}")]
    ImageLookup(String),

    #[error("transcript file is empty: {path}")]
    EmptyTranscript { path: PathBuf },

    #[error("edit file is empty: {path}")]
    EmptyEditFile { path: PathBuf },

    #[error("transcript file is not valid UTF-8: {path}")]
    NonUtf8Transcript { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, UimarkError>;
