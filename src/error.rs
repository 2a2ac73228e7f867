//! Error handling for obsup.
//!
//! Each stage of the install pipeline has its own error type so the
//! orchestrator can decide what is recoverable. Only [`ConfigError`] is fatal
//! for a run; every other class is reported per object and the run carries on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a download object into a concrete asset.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The source answered but nothing matched the filename pattern.
    #[error("no asset matching '{pattern}' in {source_desc}")]
    NotFound { source_desc: String, pattern: String },

    /// The source answered with a non-success status code.
    #[error("{url} answered with HTTP {status}")]
    Http {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The GitHub API budget is exhausted.
    #[error("GitHub API rate limit exhausted, resets in {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest_middleware::Error,
    },

    /// The response body could not be understood.
    #[error("could not parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// A URL could not be built or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised by the archive extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Neither a ZIP nor a 7z archive.
    #[error("unsupported archive format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The archive could not be opened or its index could not be read.
    #[error("cannot read archive {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// Filesystem error outside of a single entry (target or temp directory).
    #[error("I/O error while extracting")]
    Io {
        #[from]
        source: io::Error,
    },

    /// The run was cancelled between two entries.
    #[error("extraction cancelled")]
    Cancelled,
}

/// Errors raised while writing the version-state file.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("cannot serialize version state")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("cannot write version state to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot move version state into place at {}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Errors raised while loading the configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot fetch configuration from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("configuration is not valid JSON")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    #[error("object '{name}' has an invalid filename pattern '{pattern}'")]
    InvalidPattern { name: String, pattern: String },

    #[error("configuration defines no download objects")]
    Empty,

    #[error("no download object named '{0}'")]
    UnknownObject(String),
}

/// Errors that can happen when using obsup.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the URL parser.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O Error.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the middleware stack wrapped around Reqwest.
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type alias for operations that can fail with an obsup error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_pattern() {
        let err = ResolveError::NotFound {
            source_desc: "github:obsproject/obs-studio".into(),
            pattern: "*.zip".into(),
        };
        assert_eq!(
            err.to_string(),
            "no asset matching '*.zip' in github:obsproject/obs-studio"
        );
    }

    #[test]
    fn test_config_error_converts_into_crate_error() {
        let err: Error = ConfigError::Empty.into();
        assert!(matches!(err, Error::Config(ConfigError::Empty)));
        assert_eq!(err.to_string(), "configuration defines no download objects");
    }
}
