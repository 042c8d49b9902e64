//! Filesystem enumerator: deterministic directory walk producing candidates.
//!
//! The walk prunes `skip_dirs` by basename before descending, skips symlinks
//! unless asked to follow them, and never reads full file contents — only a
//! stat and an 8 KiB binary sniff per file. Sibling ordering is sorted under
//! deterministic config so CI runs enumerate identically.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::matcher::{any_glob_match, normalize_rel_path};
use crate::model::{FileCandidate, ScanConfig};
use crate::scanners::{extension_of, is_probably_binary};

/// Safe reader honoring the candidate's binary/size precheck contract.
///
/// Returns `None` for binary, oversize, or unreadable files. Content decodes
/// as UTF-8 when valid, falling back to latin-1 so no byte sequence can fail.
#[must_use]
pub fn read_text_candidate(candidate: &FileCandidate, config: &ScanConfig) -> Option<String> {
    if candidate.is_binary || candidate.size_bytes > config.max_file_bytes {
        return None;
    }
    let bytes = fs::read(&candidate.abs_path).ok()?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => Some(latin1_decode(err.as_bytes())),
    }
}

fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Walk `root` and yield [`FileCandidate`]s lazily.
pub fn scan_path(
    root: &Path,
    config: &ScanConfig,
    ignore_globs: &[String],
    follow_symlinks: bool,
) -> impl Iterator<Item = FileCandidate> + use<> {
    let root: PathBuf = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let skip_dirs: HashSet<String> = config.skip_dirs.iter().cloned().collect();
    let ignore_globs: Vec<String> = ignore_globs.to_vec();

    let mut walker = WalkDir::new(&root).follow_links(follow_symlinks);
    if config.deterministic {
        walker = walker.sort_by_file_name();
    }

    walker
        .into_iter()
        .filter_entry(move |entry| !is_pruned(entry, &skip_dirs))
        .filter_map(Result::ok)
        .filter(move |entry| {
            if !follow_symlinks && entry.path_is_symlink() {
                return false;
            }
            entry.file_type().is_file()
        })
        .filter_map(move |entry| make_candidate(&entry, &root, &ignore_globs))
}

/// Prune directories by basename; the root itself is never pruned.
fn is_pruned(entry: &DirEntry, skip_dirs: &HashSet<String>) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| skip_dirs.contains(name))
}

fn make_candidate(entry: &DirEntry, root: &Path, ignore_globs: &[String]) -> Option<FileCandidate> {
    let path = entry.path();
    let rel = normalize_rel_path(&path.strip_prefix(root).ok()?.to_string_lossy());

    if !ignore_globs.is_empty() && any_glob_match(&rel, ignore_globs) {
        return None;
    }

    // A failed stat still yields the candidate (size 0); the sniff marks it
    // binary so the engine skips it and accounts for it.
    let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);

    Some(FileCandidate {
        abs_path: path.to_path_buf(),
        rel_path: rel,
        size_bytes,
        is_binary: is_probably_binary(path),
        extension: extension_of(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn rel_paths(candidates: impl Iterator<Item = FileCandidate>) -> Vec<String> {
        candidates.map(|c| c.rel_path).collect()
    }

    #[test]
    fn walk_is_sorted_when_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "z.txt", b"z");
        write(tmp.path(), "a.txt", b"a");
        write(tmp.path(), "sub/m.txt", b"m");

        let config = ScanConfig::default();
        let got = rel_paths(scan_path(tmp.path(), &config, &[], false));
        assert_eq!(got, vec!["a.txt", "sub/m.txt", "z.txt"]);
    }

    #[test]
    fn skip_dirs_are_pruned_by_basename() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "keep/a.txt", b"a");
        write(tmp.path(), "node_modules/dep/index.js", b"x");
        write(tmp.path(), "sub/node_modules/other.js", b"y");

        let config = ScanConfig::default();
        let got = rel_paths(scan_path(tmp.path(), &config, &[], false));
        assert_eq!(got, vec!["keep/a.txt"]);
    }

    #[test]
    fn ignore_globs_filter_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/a.rs", b"a");
        write(tmp.path(), "docs/b.md", b"b");

        let config = ScanConfig::default();
        let got = rel_paths(scan_path(tmp.path(), &config, &["docs/*".to_string()], false));
        assert_eq!(got, vec!["src/a.rs"]);
    }

    #[test]
    fn candidates_carry_size_binary_flag_and_extension() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "app.BIN", b"PK\x00binary");
        write(tmp.path(), "app.txt", b"hello");

        let config = ScanConfig::default();
        let cands: Vec<FileCandidate> = scan_path(tmp.path(), &config, &[], false).collect();
        let bin = cands.iter().find(|c| c.rel_path == "app.BIN").unwrap();
        let txt = cands.iter().find(|c| c.rel_path == "app.txt").unwrap();

        assert!(bin.is_binary);
        assert_eq!(bin.extension.as_deref(), Some(".bin"));
        assert!(!txt.is_binary);
        assert_eq!(txt.size_bytes, 5);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped_unless_followed() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "real.txt", b"content");
        std::os::unix::fs::symlink(tmp.path().join("real.txt"), tmp.path().join("link.txt"))
            .unwrap();

        let config = ScanConfig::default();
        let got = rel_paths(scan_path(tmp.path(), &config, &[], false));
        assert_eq!(got, vec!["real.txt"]);

        let followed = rel_paths(scan_path(tmp.path(), &config, &[], true));
        assert_eq!(followed, vec!["link.txt", "real.txt"]);
    }

    #[test]
    fn read_text_respects_precheck_contract() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.txt", b"hello world");
        let config = ScanConfig::default();

        let ok = FileCandidate {
            abs_path: tmp.path().join("a.txt"),
            rel_path: "a.txt".into(),
            size_bytes: 11,
            is_binary: false,
            extension: Some(".txt".into()),
        };
        assert_eq!(read_text_candidate(&ok, &config).as_deref(), Some("hello world"));

        let binary = FileCandidate {
            is_binary: true,
            ..ok.clone()
        };
        assert!(read_text_candidate(&binary, &config).is_none());

        let oversize = FileCandidate {
            size_bytes: config.max_file_bytes + 1,
            ..ok.clone()
        };
        assert!(read_text_candidate(&oversize, &config).is_none());

        let missing = FileCandidate {
            abs_path: PathBuf::from("/nope"),
            ..ok
        };
        assert!(read_text_candidate(&missing, &config).is_none());
    }

    #[test]
    fn non_utf8_content_falls_back_to_latin1() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "latin.txt", &[b'c', b'a', b'f', 0xE9]);
        let config = ScanConfig::default();
        let cand = FileCandidate {
            abs_path: tmp.path().join("latin.txt"),
            rel_path: "latin.txt".into(),
            size_bytes: 4,
            is_binary: false,
            extension: Some(".txt".into()),
        };
        assert_eq!(read_text_candidate(&cand, &config).as_deref(), Some("café"));
    }
}
