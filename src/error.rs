// Error types shared by the collaborators and the session.
//
// Every failure a background task can hit is one of these values; they are
// carried inside completion messages and rendered once by the session.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to a remote HTTP endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// `git diff` could not be executed or exited unsuccessfully.
#[derive(Debug, Error)]
pub enum DiffUnavailable {
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git diff exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Errors raised while reading or writing the cached token.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access token file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse token file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize token: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Outcomes of the device authorization flow that end it without a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("error while generating github access code: {0}")]
    CodeRequest(#[source] ApiError),

    #[error("access was denied")]
    Denied,

    #[error("the device code expired before access was granted")]
    Expired,

    #[error("{0}")]
    Transport(#[source] ApiError),

    #[error("error while storing access token: {0}")]
    Store(#[source] StoreError),
}

/// Failure creating the gist.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("gist response has no raw url for '{0}'")]
    MissingFile(String),
}

/// Anything that stops the session from being constructed.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no configuration directory available for this user")]
    NoConfigDir,

    #[error("cannot prepare configuration directory '{path}': {source}")]
    ConfigDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error while retrieving git diff: {0}")]
    DiffUnavailable(#[from] DiffUnavailable),

    #[error("error while retrieving token: {0}")]
    Credential(#[from] StoreError),
}
