//! Authenticated repository cloning into the orchestrator workspace.
//!
//! Authentication goes through `http.extraheader`; the token never appears
//! in the clone URL (and therefore never in process listings or error
//! output). `GIT_TERMINAL_PROMPT=0` keeps a missing credential from hanging
//! a worker on an interactive prompt.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::errors::ScoutError;
use crate::scanners::github::api::RepoInfo;

/// Clone shape flags.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    pub shallow: bool,
    pub depth: u32,
    /// `--filter=blob:none`; speeds scanning on servers that support it.
    pub blobless: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            shallow: true,
            depth: 1,
            blobless: true,
        }
    }
}

/// Clone `repo` into `<clones_root>/<owner>__<name>`, replacing leftovers
/// from a previous run.
pub fn clone_repo(
    repo: &RepoInfo,
    clones_root: &Path,
    token: Option<&str>,
    opts: &CloneOptions,
) -> Result<PathBuf, ScoutError> {
    fs::create_dir_all(clones_root).map_err(|e| {
        ScoutError::scan_with(
            format!("Failed creating clone workspace: {}", clones_root.display()),
            e.to_string(),
        )
    })?;

    let safe_dir = format!("{}__{}", repo.owner_login, repo.name).replace('/', "__");
    let dest = clones_root.join(safe_dir);

    // Only ever delete inside our own workspace.
    if dest.exists() && dest.starts_with(clones_root) {
        fs::remove_dir_all(&dest).map_err(|e| {
            ScoutError::scan_with(
                format!("Failed clearing stale clone: {}", dest.display()),
                e.to_string(),
            )
        })?;
    }

    let mut args: Vec<String> = Vec::new();
    if let Some(token) = token {
        args.push("-c".to_string());
        args.push(format!("http.extraheader=AUTHORIZATION: bearer {token}"));
    }
    args.push("clone".to_string());
    if opts.shallow {
        args.push("--depth".to_string());
        args.push(opts.depth.max(1).to_string());
    }
    if opts.blobless {
        args.push("--filter=blob:none".to_string());
    }
    args.push(repo.clone_url.clone());
    args.push(dest.display().to_string());

    debug!(repo = %repo.full_name, dest = %dest.display(), "cloning");

    let output = Command::new("git")
        .args(&args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScoutError::dependency("git executable not found on PATH")
            } else {
                ScoutError::scan_with("Failed to invoke git clone", e.to_string())
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScoutError::scan_with(
            format!("git clone failed for {}", repo.full_name),
            stderr.trim().to_string(),
        ));
    }

    Ok(dest)
}
