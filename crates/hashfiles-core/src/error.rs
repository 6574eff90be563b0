//! Error types for graph construction and configuration

use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Errors raised by the graph, the options and the manifest loader.
///
/// Cyclic dependencies and rename conflicts are not errors: they are
/// reported as [`crate::Warning`]s and processing continues.
#[derive(Debug, Error)]
pub enum Error {
    /// The build root is not an absolute directory URL or path.
    #[error("invalid build root {0:?}")]
    InvalidRoot(String),

    /// The static directory would not land inside the build root.
    #[error("invalid static directory {0:?}: expected a relative path below the root")]
    InvalidStaticDir(String),

    /// The CDN root is neither an absolute nor a protocol-relative URL.
    #[error("invalid CDN root {0:?}: expected https://host/ or //host/")]
    InvalidCdnRoot(String),

    /// A URL could not be parsed or resolved.
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A file-level asset was declared without a URL.
    #[error("file asset declared without a url")]
    MissingUrl,

    /// Another file asset already lives at this URL.
    #[error("url already in use: {0}")]
    UrlInUse(Url),

    /// A manifest relation names an asset that was never declared.
    #[error("manifest references unknown asset {0:?}")]
    UnknownAsset(String),

    /// Two assets would be written to the same output file.
    #[error("{first} and {second} both write to {path}")]
    OutputCollision {
        path: PathBuf,
        first: Url,
        second: Url,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by invalid options rather than graph content.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidRoot(_) | Error::InvalidStaticDir(_) | Error::InvalidCdnRoot(_)
        )
    }
}

/// Result type for hashfiles operations.
pub type Result<T> = std::result::Result<T, Error>;
