// Error types shared by the core operations and the action loop.
// Every failure keeps its underlying cause so the console can print a
// descriptive message; `Error::severity` tells the action loop whether
// it may return to the menu or has to stop.

use std::io;
use std::path::{Path, PathBuf};

/// Failure talking to the storage backend (or to the token endpoint).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
}

impl BackendError {
    /// HTTP status reported by the backend, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            BackendError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("credential file {} is unusable: {reason}", .path.display())]
    Credentials { path: PathBuf, reason: String },
    #[error("could not sign token assertion: {0}")]
    Signing(String),
    #[error("token request failed: {0}")]
    Token(#[source] BackendError),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("could not list folder {folder_id}: {source}")]
    Query {
        folder_id: String,
        #[source]
        source: BackendError,
    },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("upload of {name} failed: {source}")]
    Upload {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("download of {object_id} failed: {source}")]
    Download {
        object_id: String,
        #[source]
        source: BackendError,
    },
    #[error("delete of {object_id} failed: {source}")]
    Delete {
        object_id: String,
        #[source]
        source: BackendError,
    },
    #[error("selection refers to an outdated folder listing")]
    StaleSelection,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("console input failed: {0}")]
    Prompt(#[source] io::Error),
}

/// How the action loop reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Report and go back to the menu.
    Recoverable,
    /// Report and stop the process.
    Fatal,
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Error::Auth(AuthError::Credentials { .. })
            | Error::Auth(AuthError::Signing(_))
            | Error::Config(_)
            | Error::Prompt(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    /// True when a local path did not exist.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
