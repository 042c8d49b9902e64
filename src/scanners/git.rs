//! Git working-tree enumerator built on `git ls-files` plumbing.
//!
//! Produces the union of tracked, optionally untracked-not-ignored, and
//! optionally ignored files at HEAD's working tree. History is never walked.
//! NUL-delimited listings keep unusual filenames intact; `skip_dirs` and
//! `ignore_globs` still apply as a safety net on top of git's own filters.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::errors::ScoutError;
use crate::matcher::{any_glob_match, normalize_rel_path};
use crate::model::{FileCandidate, ScanConfig};
use crate::scanners::{extension_of, is_probably_binary};

/// Run a git command, returning stdout bytes.
pub(crate) fn run_git(cwd: &Path, args: &[&str]) -> Result<Vec<u8>, ScoutError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScoutError::dependency("git executable not found on PATH")
            } else {
                ScoutError::scan_with(format!("Failed to invoke git {}", args.join(" ")), e.to_string())
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScoutError::scan_with(
            format!("git {} failed", args.join(" ")),
            stderr.trim().to_string(),
        ));
    }
    Ok(output.stdout)
}

/// Locate the enclosing repository root.
pub fn git_root(start_dir: &Path) -> Result<PathBuf, ScoutError> {
    let out = run_git(start_dir, &["rev-parse", "--show-toplevel"])?;
    let s = String::from_utf8_lossy(&out).trim().to_string();
    let root = PathBuf::from(s);
    Ok(root.canonicalize().unwrap_or(root))
}

fn split_nul_paths(data: &[u8]) -> Vec<String> {
    data.split(|&b| b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

fn path_has_skip_dir(rel_path: &str, skip_dirs: &[String]) -> bool {
    rel_path
        .split('/')
        .any(|part| skip_dirs.iter().any(|d| d == part))
}

/// Enumerate the working tree as a candidate stream.
///
/// Returns the repository root plus a lazy iterator; size, binary sniff, and
/// extension are populated per file exactly like the filesystem enumerator.
/// `include_ignored` defaults to the config value when `None`.
pub fn scan_git_repo(
    start_dir: &Path,
    config: &ScanConfig,
    include_untracked: bool,
    include_ignored: Option<bool>,
    ignore_globs: &[String],
) -> Result<(PathBuf, impl Iterator<Item = FileCandidate> + use<>), ScoutError> {
    let include_ignored = include_ignored.unwrap_or(config.include_ignored);
    let root = git_root(start_dir)?;

    // BTreeSet both dedupes the union and keeps enumeration sorted.
    let mut paths: BTreeSet<String> = BTreeSet::new();
    paths.extend(split_nul_paths(&run_git(&root, &["ls-files", "-z"])?));

    if include_untracked {
        paths.extend(split_nul_paths(&run_git(
            &root,
            &["ls-files", "-z", "--others", "--exclude-standard"],
        )?));
        if include_ignored {
            paths.extend(split_nul_paths(&run_git(
                &root,
                &["ls-files", "-z", "--others", "-i", "--exclude-standard"],
            )?));
        }
    }

    debug!(root = %root.display(), files = paths.len(), "git enumeration complete");

    let skip_dirs = config.skip_dirs.clone();
    let ignore_globs: Vec<String> = ignore_globs.to_vec();
    let iter_root = root.clone();

    let iter = paths.into_iter().filter_map(move |rel| {
        let rel = normalize_rel_path(&rel);

        if path_has_skip_dir(&rel, &skip_dirs) {
            return None;
        }
        if !ignore_globs.is_empty() && any_glob_match(&rel, &ignore_globs) {
            return None;
        }

        let abs = iter_root.join(&rel);
        // Drops deleted entries and symlinks to directories.
        if !abs.is_file() {
            return None;
        }

        let size_bytes = abs.metadata().map(|m| m.len()).unwrap_or(0);
        Some(FileCandidate {
            rel_path: rel,
            size_bytes,
            is_binary: is_probably_binary(&abs),
            extension: extension_of(&abs),
            abs_path: abs,
        })
    });

    Ok((root, iter))
}
