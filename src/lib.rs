//! secret-scout: a secret-leak scanner for directories, git working trees,
//! and GitHub organizations.
//!
//! The engine evaluates a stream of file candidates against a rule pack
//! (filename rules, content regexes, structured-key policies) and reports
//! deterministic, redacted findings suitable for CI gating.
//!
//! # Architecture
//!
//! ```text
//! enumerators (fs | git)          rules (builtin → global → repo → extra)
//!        │                                        │
//!        ▼                                        ▼
//!   FileCandidate stream ───► engine::run_scan ───► policy::evaluate_file
//!                                    │
//!                                    ▼
//!                          dedupe + stable sort ───► ScanResult
//! ```
//!
//! Remote mode (`scanners::github`) fans the same pipeline out across
//! repositories with a bounded worker pool, one lane per clone.

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod errors;
pub mod matcher;
pub mod model;
pub mod policy;
pub mod redaction;
pub mod rules;
pub mod scanners;

pub use engine::{Baseline, ScanContext, run_scan};
pub use errors::{ExitCode, ScoutError};
pub use model::{
    FileCandidate, Finding, FindingKind, ScanConfig, ScanError, ScanResult, ScanStats, ScanTarget,
    Severity, TargetKind,
};
pub use policy::{StructuredParsers, TextReader, evaluate_file};
pub use rules::{Rule, RulePack, RuleSet};
