//! Request-scoped error taxonomy.
//!
//! Every variant is recovered at the request boundary and surfaced to the
//! client as a JSON error response carrying a `return` status code and an
//! `error` message. Nothing here aborts the server process; a failing
//! request only ever costs its own connection.

use thiserror::Error;

/// Status code for a successful response.
pub const STATUS_OK: &str = "0";
/// Status code for a generic request failure.
pub const STATUS_ERROR: &str = "1";
/// Status code for a missing or mismatched secret key.
pub const STATUS_AUTH_ERROR: &str = "3";

/// Errors produced while decoding, authorizing, or executing a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The payload was not parseable JSON.
    #[error("invalid request JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field the selected action needs was absent from the envelope.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The client secret was absent or did not match the configured secret.
    #[error("secret keys do not match")]
    SecretKeyMismatch,

    /// `pull` target does not exist.
    #[error("file not found at path: {path}")]
    FileNotFound { path: String },

    /// `pull` target exists but could not be read.
    #[error("could not read file at path: {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// `push` destination could not be created or written.
    #[error("could not write file at path: {path}: {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// `push` carried file content that is not valid base64.
    #[error("failed to base64-decode file content: {0}")]
    Codec(#[from] base64::DecodeError),

    /// `shell` was given an empty command line.
    #[error("shell command must not be empty")]
    EmptyCommand,

    /// The shell interpreter itself could not be launched.
    #[error("failed to launch shell command: {0}")]
    Process(#[source] std::io::Error),

    /// `action` named no known command.
    #[error("unknown action")]
    UnknownAction,
}

impl RequestError {
    /// The `return` status code this error maps to on the wire.
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::SecretKeyMismatch => STATUS_AUTH_ERROR,
            _ => STATUS_ERROR,
        }
    }
}
