// Gist upload: creates a public gist holding the diff and returns the raw
// URL of its single file.

use std::collections::HashMap;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client, AccessToken, ApiError};
use crate::config;
use crate::error::UploadError;

/// A gist to create, always with exactly one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGist {
    pub filename: String,
    pub content: String,
    pub description: String,
    pub public: bool,
}

impl NewGist {
    /// The gist diffshare uploads for `diff`.
    pub fn for_diff(diff: &[u8]) -> Self {
        NewGist {
            filename: config::GIST_FILENAME.to_string(),
            content: String::from_utf8_lossy(diff).into_owned(),
            description: config::GIST_DESCRIPTION.to_string(),
            public: true,
        }
    }
}

/// Artifact hosting, as seen by the session.
pub trait Uploader: Send + Sync {
    /// Create `gist` and return the raw-content URL of its file.
    fn create_gist(&self, token: &AccessToken, gist: &NewGist) -> Result<String, UploadError>;
}

#[derive(Serialize)]
struct CreateGistRequest<'a> {
    description: &'a str,
    public: bool,
    files: HashMap<&'a str, FileContent<'a>>,
}

#[derive(Serialize)]
struct FileContent<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct GistResponse {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Deserialize)]
struct GistFile {
    raw_url: Option<String>,
}

/// Blocking client for the gists endpoint.
#[derive(Clone)]
pub struct GistClient {
    client: Client,
    url: String,
}

impl GistClient {
    pub fn github() -> Result<Self, ApiError> {
        Self::with_url(config::GIST_API_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, ApiError> {
        Ok(GistClient {
            client: http_client()?,
            url: url.into(),
        })
    }
}

impl Uploader for GistClient {
    fn create_gist(&self, token: &AccessToken, gist: &NewGist) -> Result<String, UploadError> {
        let body = CreateGistRequest {
            description: &gist.description,
            public: gist.public,
            files: HashMap::from([(
                gist.filename.as_str(),
                FileContent {
                    content: &gist.content,
                },
            )]),
        };

        tracing::debug!(bytes = gist.content.len(), file = %gist.filename, "creating gist");
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&token.access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .map_err(ApiError::from)?;
        let res = check_status(res)?;
        let created: GistResponse = res.json().map_err(ApiError::from)?;

        created
            .files
            .get(&gist.filename)
            .and_then(|f| f.raw_url.clone())
            .ok_or_else(|| UploadError::MissingFile(gist.filename.clone()))
    }
}
