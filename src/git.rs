// Diff source: the working-tree diff of the repository we are run from.

use std::process::Command;

use crate::error::DiffUnavailable;

/// Run `git diff` in the current directory and return its raw stdout.
///
/// Empty output (a clean tree) is returned as an empty vector, not an error.
pub fn working_tree_diff() -> Result<Vec<u8>, DiffUnavailable> {
    let output = Command::new("git")
        .arg("diff")
        .output()
        .map_err(DiffUnavailable::Spawn)?;

    if !output.status.success() {
        return Err(DiffUnavailable::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    tracing::debug!(bytes = output.stdout.len(), "captured working tree diff");
    Ok(output.stdout)
}
