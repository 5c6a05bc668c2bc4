// Configuration layout: where diffshare keeps its per-user state and the
// fixed remote settings it talks to.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StartupError;

/// Namespace used under the user's configuration directory.
pub const APP_NAME: &str = "diffshare";

/// OAuth application registered for the device flow.
pub const CLIENT_ID: &str = "5fcb127516083e890182";
pub const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const GIST_API_URL: &str = "https://api.github.com/gists";

/// Least privilege needed to create a gist.
pub const SCOPES: &[&str] = &["gist"];

/// Name of the single file inside every uploaded gist.
pub const GIST_FILENAME: &str = "diffshare.diff";
pub const GIST_DESCRIPTION: &str = "created using diffshare";

const TOKEN_FILE: &str = "token.json";

/// Returns `<config_dir>/diffshare`, e.g. `~/.config/diffshare` on Linux.
pub fn config_dir() -> Result<PathBuf, StartupError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .ok_or(StartupError::NoConfigDir)
}

/// Path of the cached token inside `dir`.
pub fn token_path(dir: &Path) -> PathBuf {
    dir.join(TOKEN_FILE)
}

/// Make sure `dir` exists as a directory.
///
/// An existing directory is fine. A path that exists but is not a directory,
/// or one that cannot be inspected or created, is reported instead of being
/// silently skipped.
pub fn ensure_config_dir(dir: &Path) -> Result<(), StartupError> {
    let fail = |source: io::Error| StartupError::ConfigDir {
        path: dir.to_path_buf(),
        source,
    };

    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(fail(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a directory",
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %dir.display(), "creating config directory");
            fs::create_dir_all(dir).map_err(fail)
        }
        Err(e) => Err(fail(e)),
    }
}
