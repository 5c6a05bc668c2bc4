// Credential store: the access token cached between runs as a small JSON
// file inside the diffshare config directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::api::AccessToken;
use crate::error::StoreError;

/// Persistence for the single cached credential.
pub trait CredentialStore: Send + Sync {
    /// Load the cached token. A missing file is `Ok(None)`.
    fn load(&self) -> Result<Option<AccessToken>, StoreError>;

    /// Replace the cached token.
    fn save(&self, token: &AccessToken) -> Result<(), StoreError>;
}

/// Token stored as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for TokenFile {
    fn load(&self) -> Result<Option<AccessToken>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no cached token");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let token = serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "loaded cached token");
        Ok(Some(token))
    }

    fn save(&self, token: &AccessToken) -> Result<(), StoreError> {
        let buf = serde_json::to_vec(token).map_err(StoreError::Serialize)?;
        let mut file = open_private(&self.path).map_err(|e| self.io_error(e))?;
        file.write_all(&buf).map_err(|e| self.io_error(e))?;

        tracing::info!(path = %self.path.display(), "stored access token");
        Ok(())
    }
}

/// Open `path` for writing, truncated, readable by the owner only.
///
/// The token must never hit the disk under a wider mode: an existing file is
/// tightened before it is opened, a new one is created as 0600.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    match fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
