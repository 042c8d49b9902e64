//! Rule pack loading and precedence merge.
//!
//! Precedence, low to high: built-in pack → global pack (well-known home
//! paths) → repository pack (nearest `.secret-scout/rules.{yaml,yml}` walking
//! up from the scan root) → explicit extra packs in the order given. Packs
//! merge by rule id: a reappearing id fully replaces the earlier rule while
//! keeping the base ordering; new ids append in first-appearance order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::ScoutError;
use crate::matcher;
use crate::rules::validate::{build_ruleset, validate_rule_pack};
use crate::rules::{Rule, RulePack, RuleSet};

const REPO_RULE_FILES: [&str; 2] = [".secret-scout/rules.yaml", ".secret-scout/rules.yml"];

const BUILTIN_DEFAULT: &str = include_str!("builtin/default.yaml");

/// A built ruleset plus the ordered pack sources that produced it.
#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub ruleset: RuleSet,
    pub sources: Vec<String>,
}

/// Candidate global rule files, in precedence order (first hit wins).
fn global_rule_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(base) = dirs::config_dir() {
        out.push(base.join("secret-scout/rules.yaml"));
        out.push(base.join("secret-scout/rules.yml"));
    }
    if let Some(home) = dirs::home_dir() {
        out.push(home.join(".secret-scout/rules.yaml"));
        out.push(home.join(".secret-scout/rules.yml"));
    }
    out
}

/// Walk up from `start_dir` to the first repo rule pack.
#[must_use]
pub fn find_repo_rules(start_dir: &Path) -> Option<PathBuf> {
    let start = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.to_path_buf());
    let mut cur = Some(start.as_path());
    while let Some(dir) = cur {
        for rel in REPO_RULE_FILES {
            let p = dir.join(rel);
            if p.is_file() {
                return Some(p);
            }
        }
        cur = dir.parent();
    }
    None
}

#[must_use]
pub fn find_global_rules() -> Option<PathBuf> {
    global_rule_paths().into_iter().find(|p| p.is_file())
}

fn parse_pack(text: &str, source: &str) -> Result<RulePack, ScoutError> {
    let mut pack: RulePack = serde_yaml::from_str(text).map_err(|e| {
        ScoutError::rules_with(format!("Rule pack failed validation: {source}"), e.to_string())
    })?;
    pack.metadata.source = Some(source.to_string());
    Ok(pack)
}

/// Load and validate one pack from disk.
pub fn load_rule_pack_from_path(path: &Path) -> Result<RulePack, ScoutError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ScoutError::rules_with(
            format!("Failed reading rule pack: {}", path.display()),
            e.to_string(),
        )
    })?;
    let pack = parse_pack(&text, &path.display().to_string())?;
    validate_rule_pack(&pack, &matcher::shared_cache())?;
    Ok(pack)
}

/// Load and validate a packaged builtin pack by name.
pub fn load_builtin_rule_pack(name: &str) -> Result<RulePack, ScoutError> {
    let text = match name {
        "default" => BUILTIN_DEFAULT,
        other => {
            return Err(ScoutError::rules(format!(
                "Unknown builtin rule pack '{other}'"
            )));
        }
    };
    let pack = parse_pack(text, &format!("builtin:{name}"))?;
    validate_rule_pack(&pack, &matcher::shared_cache())?;
    Ok(pack)
}

/// Merge rules by id; overrides win, base order is preserved, new ids append.
#[must_use]
pub fn merge_rules_by_id(base: Vec<Rule>, overrides: Vec<Rule>) -> Vec<Rule> {
    let mut by_id: HashMap<String, Rule> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for rule in base {
        order.push(rule.id.clone());
        by_id.insert(rule.id.clone(), rule);
    }
    for rule in overrides {
        if !by_id.contains_key(&rule.id) {
            order.push(rule.id.clone());
        }
        by_id.insert(rule.id.clone(), rule);
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

/// Load the effective ruleset for a scan rooted at `start_dir`.
pub fn load_ruleset(
    start_dir: &Path,
    builtin: &str,
    extra_rule_files: &[PathBuf],
) -> Result<LoadedRules, ScoutError> {
    let mut packs: Vec<RulePack> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    let builtin_pack = load_builtin_rule_pack(builtin)?;
    sources.push(format!("builtin:{builtin}"));
    packs.push(builtin_pack);

    if let Some(gp) = find_global_rules() {
        debug!(path = %gp.display(), "loading global rule pack");
        let pack = load_rule_pack_from_path(&gp)?;
        sources.push(gp.display().to_string());
        packs.push(pack);
    }

    if let Some(rp) = find_repo_rules(start_dir) {
        debug!(path = %rp.display(), "loading repo rule pack");
        let pack = load_rule_pack_from_path(&rp)?;
        sources.push(rp.display().to_string());
        packs.push(pack);
    }

    for path in extra_rule_files {
        if !path.is_file() {
            return Err(ScoutError::rules(format!(
                "Extra rule file not found: {}",
                path.display()
            )));
        }
        let pack = load_rule_pack_from_path(path)?;
        sources.push(path.display().to_string());
        packs.push(pack);
    }

    let mut merged: Vec<Rule> = Vec::new();
    for pack in packs {
        merged = merge_rules_by_id(merged, pack.rules);
    }

    let ruleset = build_ruleset(merged, matcher::shared_cache())?;
    debug!(rules = ruleset.len(), sources = sources.len(), "ruleset built");
    Ok(LoadedRules { ruleset, sources })
}
