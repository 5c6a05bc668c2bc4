// OAuth device authorization flow (RFC 8628) against GitHub.
//
// `request_code` asks for a user code the human types into the browser;
// `poll_for_token` then blocks, polling at the server-given interval, until
// the grant is approved, denied or expires.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::{check_status, http_client, AccessToken, ApiError};
use crate::config;
use crate::error::AuthError;

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Pacing of the token poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Floor for the wait between two polls, whatever the server says.
    pub min_interval: Duration,
    /// Added to the wait when `slow_down` comes without a new interval.
    pub slow_down_step: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        PollTiming {
            min_interval: Duration::from_secs(1),
            slow_down_step: Duration::from_secs(5),
        }
    }
}

impl PollTiming {
    /// Wait derived from a server-given interval in seconds.
    pub fn interval(&self, secs: u64) -> Duration {
        Duration::from_secs(secs).max(self.min_interval)
    }

    /// Wait after a `slow_down` answer.
    pub fn slowed(&self, current: Duration, server_interval: Option<u64>) -> Duration {
        match server_interval {
            Some(secs) => self.interval(secs),
            None => current.saturating_add(self.slow_down_step),
        }
    }
}

/// Device code handed out by the authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until `device_code` stops being accepted.
    pub expires_in: u64,
    /// Minimum seconds between two polls.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// The device authorization protocol, as seen by the session.
pub trait Authorizer: Send + Sync {
    /// Request a fresh device and user code.
    fn request_code(&self) -> Result<DeviceCode, AuthError>;

    /// Block until the user approves `code`, denies it, or it expires.
    fn poll_for_token(&self, code: &DeviceCode) -> Result<AccessToken, AuthError>;
}

/// Body of the token endpoint, which answers 200 for both grants and
/// protocol errors.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    interval: Option<u64>,
}

enum Poll {
    Granted(AccessToken),
    Pending,
    SlowDown(Option<u64>),
}

/// Blocking device flow client.
#[derive(Clone)]
pub struct DeviceFlow {
    client: Client,
    client_id: String,
    scopes: Vec<String>,
    device_code_url: String,
    token_url: String,
    timing: PollTiming,
}

impl DeviceFlow {
    /// Client for GitHub's public endpoints with diffshare's app id.
    pub fn github() -> Result<Self, ApiError> {
        Self::with_endpoints(config::DEVICE_CODE_URL, config::TOKEN_URL)
    }

    /// Client for arbitrary endpoints; used against mock servers.
    pub fn with_endpoints(
        device_code_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Ok(DeviceFlow {
            client: http_client()?,
            client_id: config::CLIENT_ID.to_string(),
            scopes: config::SCOPES.iter().map(|s| s.to_string()).collect(),
            device_code_url: device_code_url.into(),
            token_url: token_url.into(),
            timing: PollTiming::default(),
        })
    }

    /// Replace the poll pacing.
    pub fn with_timing(mut self, timing: PollTiming) -> Self {
        self.timing = timing;
        self
    }

    fn poll_once(&self, code: &DeviceCode) -> Result<Poll, AuthError> {
        let res = self
            .client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", code.device_code.as_str()),
                ("grant_type", GRANT_TYPE),
            ])
            .send()
            .map_err(|e| AuthError::Transport(e.into()))?;
        let res = check_status(res).map_err(AuthError::Transport)?;
        let body: TokenResponse = res
            .json()
            .map_err(|e| AuthError::Transport(ApiError::Transport(e)))?;

        if let Some(access_token) = body.access_token {
            return Ok(Poll::Granted(AccessToken {
                access_token,
                token_type: body.token_type.unwrap_or_default(),
                scope: body.scope.unwrap_or_default(),
            }));
        }

        match body.error.as_deref() {
            Some("authorization_pending") => Ok(Poll::Pending),
            Some("slow_down") => Ok(Poll::SlowDown(body.interval)),
            Some("expired_token") => Err(AuthError::Expired),
            Some("access_denied") => Err(AuthError::Denied),
            Some(other) => Err(AuthError::Transport(ApiError::Protocol(format!(
                "{}: {}",
                other,
                body.error_description.unwrap_or_default()
            )))),
            None => Err(AuthError::Transport(ApiError::Protocol(
                "token response has neither a token nor an error".into(),
            ))),
        }
    }
}

impl Authorizer for DeviceFlow {
    fn request_code(&self) -> Result<DeviceCode, AuthError> {
        let scope = self.scopes.join(" ");
        let res = self
            .client
            .post(&self.device_code_url)
            .header(ACCEPT, "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .map_err(|e| AuthError::CodeRequest(e.into()))?;
        let res = check_status(res).map_err(AuthError::CodeRequest)?;
        let code: DeviceCode = res
            .json()
            .map_err(|e| AuthError::CodeRequest(ApiError::Transport(e)))?;

        tracing::info!(
            verification_uri = %code.verification_uri,
            expires_in = code.expires_in,
            interval = code.interval,
            "received device code"
        );
        Ok(code)
    }

    fn poll_for_token(&self, code: &DeviceCode) -> Result<AccessToken, AuthError> {
        // An expiry too far out to represent never comes.
        let deadline = Instant::now().checked_add(Duration::from_secs(code.expires_in));
        let mut interval = self.timing.interval(code.interval);

        loop {
            thread::sleep(interval);
            if deadline.map_or(false, |d| Instant::now() >= d) {
                tracing::warn!("device code expired locally");
                return Err(AuthError::Expired);
            }

            match self.poll_once(code)? {
                Poll::Granted(token) => {
                    tracing::info!(scope = %token.scope, "device authorization granted");
                    return Ok(token);
                }
                Poll::Pending => tracing::trace!("authorization pending"),
                Poll::SlowDown(server_interval) => {
                    interval = self.timing.slowed(interval, server_interval);
                    tracing::debug!(interval_ms = interval.as_millis() as u64, "asked to slow down");
                }
            }
        }
    }
}
