//! Core data model: candidates, findings, stats, targets, results, config.
//!
//! Everything here serializes to stable JSON (snake_case tags, optional
//! fields omitted) so `--format json` output can be diffed in CI.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file an enumerator has decided is eligible for evaluation, with enough
/// metadata to decide skipping without reading it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCandidate {
    pub abs_path: PathBuf,
    /// Repository-relative, forward-slash normalized.
    pub rel_path: String,
    pub size_bytes: u64,
    pub is_binary: bool,
    /// Lower-case extension including the dot, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// Rule severity, ordered critical-first for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// What kind of evidence produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Filename,
    Content,
    Structured,
}

impl FindingKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::Content => "content",
            Self::Structured => "structured",
        }
    }
}

/// A single rule-positive outcome attached to a target/file location.
///
/// Samples and value hints have already been truncated and (when configured)
/// redacted; raw match text never leaves the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub target: String,
    pub file: String,
    pub kind: FindingKind,
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// 1-indexed, only for line-scoped regex matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    /// Offending key, for structured findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_hint: Option<String>,
    /// Stable short digest for dedupe and baseline identity.
    pub match_hash: String,
}

/// Per-scan counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub files_considered: usize,
    pub files_scanned: usize,
    pub files_skipped_binary: usize,
    pub files_skipped_too_large: usize,
    pub findings: usize,
    pub duration_ms: u64,
}

/// Where a target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Local,
    Github,
}

/// A logical scan unit: a directory or one remote repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    pub name: String,
    pub kind: TargetKind,
    pub root_path: String,
    /// Free-form metadata (scanner type, remote URL, clone timing, flags).
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl ScanTarget {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TargetKind, root_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            root_path: root_path.into(),
            meta: BTreeMap::new(),
        }
    }
}

/// A recoverable per-file or per-repo error recorded on the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The sealed outcome of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub targets: Vec<ScanTarget>,
    pub findings: Vec<Finding>,
    pub errors: Vec<ScanError>,
    pub stats: ScanStats,
}

impl ScanResult {
    #[must_use]
    pub fn new(target: ScanTarget) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            targets: vec![target],
            findings: Vec::new(),
            errors: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    /// Name of the primary target, for reporting.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.targets.first().map_or("", |t| t.name.as_str())
    }
}

/// Engine configuration, read-only during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Files larger than this are never read.
    pub max_file_bytes: u64,
    /// Directory basenames pruned during enumeration.
    pub skip_dirs: Vec<String>,
    /// Default for including gitignored files in git mode.
    pub include_ignored: bool,
    /// Forces sorted candidate and sibling orderings.
    pub deterministic: bool,
    /// Controls whether samples are redacted.
    pub redact: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_048_576,
            skip_dirs: [
                ".git",
                ".hg",
                ".svn",
                "node_modules",
                "__pycache__",
                ".venv",
                "venv",
                "dist",
                "build",
                "target",
                ".idea",
                ".vscode",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            include_ignored: false,
            deterministic: true,
            redact: true,
        }
    }
}
