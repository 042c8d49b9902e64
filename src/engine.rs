//! Scan engine: drives the evaluator over a candidate stream.
//!
//! The engine is single-threaded per scan. It materializes the candidate
//! stream (sorting it under deterministic config), applies the binary/size
//! skip policy before any file is read, converts per-file evaluator failures
//! into recoverable [`ScanError`] entries, then runs the optional baseline
//! suppressor and deduplication before sealing the result.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::model::{FileCandidate, Finding, ScanConfig, ScanError, ScanResult, ScanTarget};
use crate::policy::{StructuredParsers, TextReader, evaluate_file};
use crate::rules::RuleSet;

/// Optional post-scan suppressor (user-authored baselines).
///
/// A failed suppression leaves the original findings untouched and records a
/// single recoverable error.
pub trait Baseline: Sync {
    fn suppress(&self, findings: &[Finding]) -> Result<Vec<Finding>, String>;
}

/// Everything a scan needs besides its target and candidates.
pub struct ScanContext<'a> {
    pub ruleset: &'a RuleSet,
    pub config: &'a ScanConfig,
    pub read_text: &'a dyn TextReader,
    pub baseline: Option<&'a dyn Baseline>,
    pub structured_parsers: Option<&'a StructuredParsers>,
    pub dedupe: bool,
}

/// Orchestrate one scan: candidates → policy eval → baseline → dedupe.
pub fn run_scan(
    target: ScanTarget,
    candidates: impl IntoIterator<Item = FileCandidate>,
    ctx: &ScanContext<'_>,
) -> ScanResult {
    let t0 = Instant::now();
    let mut result = ScanResult::new(target);
    let target_name = result.target_name().to_string();

    let mut cand_list: Vec<FileCandidate> = candidates.into_iter().collect();
    if ctx.config.deterministic {
        cand_list.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    }

    result.stats.files_considered = cand_list.len();

    let mut findings: Vec<Finding> = Vec::new();

    for candidate in &cand_list {
        if candidate.is_binary {
            result.stats.files_skipped_binary += 1;
            continue;
        }
        if candidate.size_bytes > ctx.config.max_file_bytes {
            result.stats.files_skipped_too_large += 1;
            continue;
        }

        result.stats.files_scanned += 1;

        match evaluate_file(
            &target_name,
            candidate,
            ctx.ruleset,
            ctx.config,
            ctx.read_text,
            ctx.structured_parsers,
        ) {
            Ok(file_findings) => findings.extend(file_findings),
            Err(e) => {
                // Non-fatal per-file error; keep scanning.
                warn!(file = %candidate.rel_path, error = %e, "file evaluation failed");
                result.errors.push(ScanError {
                    target: target_name.clone(),
                    message: format!("Failed scanning file: {}", candidate.rel_path),
                    detail: Some(e.to_string()),
                });
            }
        }
    }

    if let Some(baseline) = ctx.baseline {
        match baseline.suppress(&findings) {
            Ok(suppressed) => findings = suppressed,
            Err(detail) => {
                result.errors.push(ScanError {
                    target: target_name.clone(),
                    message: "Baseline suppression failed".to_string(),
                    detail: Some(detail),
                });
            }
        }
    }

    if ctx.dedupe {
        findings = dedupe_findings(findings);
    }

    result.stats.findings = findings.len();
    result.findings = findings;
    result.stats.duration_ms = t0.elapsed().as_millis() as u64;
    result.finished_at = Some(Utc::now());
    debug!(
        target = %target_name,
        scanned = result.stats.files_scanned,
        findings = result.stats.findings,
        errors = result.errors.len(),
        "scan sealed"
    );
    result
}

/// Drop repeats and impose a stable order for CI diffs.
///
/// Key: `(target, file, rule_id, line, match_hash)`, first occurrence wins.
fn dedupe_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen: HashSet<(String, String, String, String, String)> = HashSet::new();
    let mut out: Vec<Finding> = Vec::with_capacity(findings.len());

    for f in findings {
        let key = (
            f.target.clone(),
            f.file.clone(),
            f.rule_id.clone(),
            f.line.map(|l| l.to_string()).unwrap_or_default(),
            f.match_hash.clone(),
        );
        if seen.insert(key) {
            out.push(f);
        }
    }

    out.sort_by(|a, b| {
        let ka = (&a.file, &a.rule_id, a.line.unwrap_or(0), &a.match_hash);
        let kb = (&b.file, &b.rule_id, b.line.unwrap_or(0), &b.match_hash);
        ka.cmp(&kb)
    });
    out
}
