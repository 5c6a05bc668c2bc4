// Remote API clients: the GitHub device authorization flow and the gist
// endpoint. Both use a small blocking reqwest client, which suits the
// one-request-at-a-time background tasks that call them.

pub mod device;
pub mod gist;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

pub use crate::error::ApiError;

const USER_AGENT: &str = concat!("diffshare/", env!("CARGO_PKG_VERSION"));

/// OAuth access token granted to diffshare.
///
/// This is also the on-disk record of the credential store. The token value
/// never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        AccessToken {
            access_token: access_token.into(),
            token_type: "bearer".into(),
            scope: String::new(),
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"••••••••")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Build the HTTP client shared by both API clients.
fn http_client() -> Result<Client, ApiError> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Turn a non-success response into `ApiError::Status` carrying the body.
fn check_status(res: Response) -> Result<Response, ApiError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().unwrap_or_default();
    Err(ApiError::Status { status, body })
}
