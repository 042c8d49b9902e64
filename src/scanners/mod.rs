//! File-candidate enumerators and the remote-repository orchestrator.
//!
//! Both local enumerators produce the same lazy [`crate::model::FileCandidate`]
//! stream: the filesystem walker for arbitrary directories, and the git
//! plumbing enumerator for working trees. The `github` module fans the same
//! pipeline out across remote repositories.

pub mod fs;
pub mod git;
pub mod github;

/// First bytes sniffed when classifying a file as binary.
pub(crate) const BINARY_SNIFF_BYTES: usize = 8192;

/// Heuristic binary detection: a NUL byte in the first 8 KiB means binary.
/// Unreadable files classify as binary so the engine skips them.
#[must_use]
pub fn is_probably_binary(path: &std::path::Path) -> bool {
    use std::io::Read;

    let Ok(file) = std::fs::File::open(path) else {
        return true;
    };
    let mut chunk = Vec::with_capacity(BINARY_SNIFF_BYTES);
    if file
        .take(BINARY_SNIFF_BYTES as u64)
        .read_to_end(&mut chunk)
        .is_err()
    {
        return true;
    }
    memchr::memchr(0, &chunk).is_some()
}

/// Lower-case extension including the dot, or `None`.
pub(crate) fn extension_of(path: &std::path::Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn nul_byte_classifies_as_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("archive.zip");
        std::fs::write(&bin, b"PK\x03\x04\x00rest").unwrap();
        assert!(is_probably_binary(&bin));

        let text = tmp.path().join("notes.txt");
        std::fs::write(&text, "plain text\n").unwrap();
        assert!(!is_probably_binary(&text));
    }

    #[test]
    fn missing_file_classifies_as_binary() {
        assert!(is_probably_binary(Path::new("/definitely/not/here")));
    }

    #[test]
    fn extension_is_lowercased_with_dot() {
        assert_eq!(extension_of(Path::new("a/b/Key.PEM")), Some(".pem".into()));
        assert_eq!(extension_of(Path::new("a/b/Makefile")), None);
    }
}
