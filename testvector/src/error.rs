//! Error types for loading test vectors and wiring handlers.

use {std::path::PathBuf, thiserror::Error};

/// Setup-time failures. Any of these aborts the run before a test executes.
#[derive(Error, Debug)]
pub enum TestVectorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path} as YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file extension is not one of `.json`, `.yaml` or `.yml`.
    #[error("unsupported test vector format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// A handler is already registered for this kind.
    #[error("duplicate {unit} handler for kind {kind:?}")]
    Duplicate { unit: &'static str, kind: String },
}

pub type Result<T> = std::result::Result<T, TestVectorError>;
