use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a run before any output is written.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("no anchors extracted from {source_desc}; nothing to align against")]
    NoAnchors { source_desc: String },

    #[error("wordlist {path:?} contains no usable terms")]
    EmptyWordlist { path: PathBuf },

    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid or missing configuration, reported before processing starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input file not found: {0:?}")]
    MissingInput(PathBuf),

    #[error("similarity threshold {0} outside (0, 1]")]
    Threshold(f64),

    #[error("page range {start}..={end} is empty")]
    PageRange { start: u32, end: u32 },

    #[error("delimiter and interpolation marker must be distinct single characters")]
    Delimiter,

    #[error("invalid {name} pattern {pattern:?}")]
    Pattern {
        name: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("key pattern {0:?} must contain the <key> placeholder")]
    KeyPlaceholder(String),

    #[error("keyed page sources need a key_pattern")]
    MissingKeyPattern,

    #[error("replacement {0:?} is not in FROM|TO form")]
    Replacement(String),

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}
