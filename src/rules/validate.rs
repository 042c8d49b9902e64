//! Cross-field rule validation and [`RuleSet`] construction.
//!
//! Validation runs once at load time so evaluation can assume every enabled
//! pattern compiles. Disabled rules are exempt from compilation checks but
//! still participate in duplicate-id detection.

use std::collections::HashSet;

use crate::errors::ScoutError;
use crate::matcher::{RegexCache, RegexOpts};
use crate::rules::{Rule, RulePack, RuleSet, RuleType};

/// Validate a single pack: unique ids plus per-rule checks.
pub fn validate_rule_pack(pack: &RulePack, cache: &RegexCache) -> Result<(), ScoutError> {
    validate_rules(&pack.rules, cache)
}

/// Validate a rule list (possibly merged from several packs).
pub fn validate_rules(rules: &[Rule], cache: &RegexCache) -> Result<(), ScoutError> {
    ensure_unique_ids(rules)?;
    for rule in rules {
        if !rule.enabled {
            continue;
        }
        validate_rule(rule, cache)?;
    }
    Ok(())
}

fn validate_rule(rule: &Rule, cache: &RegexCache) -> Result<(), ScoutError> {
    ensure_payload_matches_tag(rule)?;

    for arx in &rule.allow_regexes {
        compile_checked(cache, arx, RegexOpts::default(), rule, "allow_regexes")?;
    }

    match (rule.rule_type, &rule.filename, &rule.regex, &rule.structured) {
        // Glob patterns validate lazily; only regex filenames compile here.
        (RuleType::Filename, Some(filename), _, _) => {
            if filename.pattern_type == crate::rules::PatternType::Regex {
                compile_checked(
                    cache,
                    &filename.pattern,
                    RegexOpts::default(),
                    rule,
                    "filename.pattern",
                )?;
            }
        }
        (RuleType::Regex, _, Some(regex), _) => {
            let opts = RegexOpts {
                multiline: regex.multiline,
            };
            compile_checked(cache, &regex.regex, opts, rule, "regex.regex")?;
            if regex.max_matches == 0 {
                return Err(ScoutError::rules(format!(
                    "Rule '{}' has max_matches of 0; it could never emit",
                    rule.id
                )));
            }
        }
        (RuleType::Structured, _, _, Some(structured)) => {
            let fold = |k: &String| {
                if structured.case_insensitive_keys {
                    k.to_uppercase()
                } else {
                    k.clone()
                }
            };
            let forbidden: HashSet<String> = structured.forbidden_keys.iter().map(fold).collect();
            let allowed: HashSet<String> = structured.allowed_keys.iter().map(fold).collect();
            let mut overlap: Vec<&String> = forbidden.intersection(&allowed).collect();
            if !overlap.is_empty() {
                overlap.sort();
                return Err(ScoutError::rules(format!(
                    "Rule '{}' has keys present in both forbidden_keys and allowed_keys: {overlap:?}",
                    rule.id
                )));
            }
        }
        // Tag/payload correspondence was checked above.
        _ => {}
    }
    Ok(())
}

fn ensure_payload_matches_tag(rule: &Rule) -> Result<(), ScoutError> {
    let (want, present) = match rule.rule_type {
        RuleType::Filename => ("filename", rule.filename.is_some()),
        RuleType::Regex => ("regex", rule.regex.is_some()),
        RuleType::Structured => ("structured", rule.structured.is_some()),
    };
    if !present {
        return Err(ScoutError::rules(format!(
            "Rule '{}' is typed '{want}' but has no '{want}' payload",
            rule.id
        )));
    }

    let extras: Vec<&str> = [
        ("filename", rule.filename.is_some(), RuleType::Filename),
        ("regex", rule.regex.is_some(), RuleType::Regex),
        ("structured", rule.structured.is_some(), RuleType::Structured),
    ]
    .into_iter()
    .filter(|(_, some, tag)| *some && *tag != rule.rule_type)
    .map(|(name, _, _)| name)
    .collect();
    if !extras.is_empty() {
        return Err(ScoutError::rules(format!(
            "Rule '{}' is typed '{want}' but also carries {extras:?} payloads",
            rule.id
        )));
    }
    Ok(())
}

fn ensure_unique_ids(rules: &[Rule]) -> Result<(), ScoutError> {
    let mut seen = HashSet::new();
    let mut dups: Vec<&str> = Vec::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            dups.push(rule.id.as_str());
        }
    }
    if !dups.is_empty() {
        dups.sort_unstable();
        dups.dedup();
        return Err(ScoutError::rules(format!("Duplicate rule IDs: {dups:?}")));
    }
    Ok(())
}

fn compile_checked(
    cache: &RegexCache,
    pattern: &str,
    opts: RegexOpts,
    rule: &Rule,
    context: &str,
) -> Result<(), ScoutError> {
    cache.compile(pattern, opts).map_err(|e| {
        ScoutError::rules_with(
            format!("Invalid regex in {}.{context}", rule.id),
            e.to_string(),
        )
    })?;
    Ok(())
}

/// Build the evaluation-ready set: validate, keep enabled, sort by severity
/// descending (stable), then deduplicate by id keeping the first occurrence.
pub fn build_ruleset(rules: Vec<Rule>, cache: std::sync::Arc<RegexCache>) -> Result<RuleSet, ScoutError> {
    validate_rules(&rules, &cache)?;

    let mut enabled: Vec<Rule> = rules.into_iter().filter(|r| r.enabled).collect();
    enabled.sort_by_key(|r| std::cmp::Reverse(r.severity.rank()));

    let mut seen = HashSet::new();
    enabled.retain(|r| seen.insert(r.id.clone()));

    Ok(RuleSet::with_cache(enabled, cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher;
    use crate::model::Severity;
    use crate::rules::rule_fixture;

    fn cache() -> std::sync::Arc<RegexCache> {
        matcher::shared_cache()
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let rules = vec![
            rule_fixture("dup", Severity::Low, RuleType::Filename),
            rule_fixture("dup", Severity::High, RuleType::Regex),
        ];
        let err = validate_rules(&rules, &cache()).unwrap_err();
        assert!(err.to_string().contains("Duplicate rule IDs"));
    }

    #[test]
    fn bad_regex_in_enabled_rule_fails() {
        let mut rule = rule_fixture("r", Severity::High, RuleType::Regex);
        rule.regex.as_mut().unwrap().regex = "(unclosed".to_string();
        let err = validate_rules(std::slice::from_ref(&rule), &cache()).unwrap_err();
        assert!(matches!(err, ScoutError::Rules { .. }));
    }

    #[test]
    fn bad_regex_in_disabled_rule_is_tolerated() {
        let mut rule = rule_fixture("r", Severity::High, RuleType::Regex);
        rule.regex.as_mut().unwrap().regex = "(unclosed".to_string();
        rule.enabled = false;
        assert!(validate_rules(std::slice::from_ref(&rule), &cache()).is_ok());
    }

    #[test]
    fn bad_allow_regex_fails() {
        let mut rule = rule_fixture("r", Severity::Low, RuleType::Filename);
        rule.allow_regexes = vec!["[".to_string()];
        assert!(validate_rules(std::slice::from_ref(&rule), &cache()).is_err());
    }

    #[test]
    fn overlapping_key_sets_fail_after_case_folding() {
        let mut rule = rule_fixture("r", Severity::Medium, RuleType::Structured);
        {
            let s = rule.structured.as_mut().unwrap();
            s.forbidden_keys = vec!["db_password".to_string()];
            s.allowed_keys = vec!["DB_PASSWORD".to_string()];
            s.case_insensitive_keys = true;
        }
        let err = validate_rules(std::slice::from_ref(&rule), &cache()).unwrap_err();
        assert!(err.to_string().contains("forbidden_keys and allowed_keys"));
    }

    #[test]
    fn case_sensitive_key_sets_may_differ_only_by_case() {
        let mut rule = rule_fixture("r", Severity::Medium, RuleType::Structured);
        {
            let s = rule.structured.as_mut().unwrap();
            s.forbidden_keys = vec!["db_password".to_string()];
            s.allowed_keys = vec!["DB_PASSWORD".to_string()];
            s.case_insensitive_keys = false;
        }
        assert!(validate_rules(std::slice::from_ref(&rule), &cache()).is_ok());
    }

    #[test]
    fn missing_payload_for_tag_fails() {
        let mut rule = rule_fixture("r", Severity::Low, RuleType::Regex);
        rule.regex = None;
        let err = validate_rules(std::slice::from_ref(&rule), &cache()).unwrap_err();
        assert!(err.to_string().contains("no 'regex' payload"));
    }

    #[test]
    fn extra_payload_for_other_tag_fails() {
        let mut rule = rule_fixture("r", Severity::Low, RuleType::Filename);
        rule.regex = rule_fixture("x", Severity::Low, RuleType::Regex).regex;
        let err = validate_rules(std::slice::from_ref(&rule), &cache()).unwrap_err();
        assert!(err.to_string().contains("also carries"));
    }

    #[test]
    fn ruleset_keeps_enabled_sorted_and_deduped() {
        let mut low = rule_fixture("b-low", Severity::Low, RuleType::Filename);
        low.enabled = true;
        let mut disabled = rule_fixture("c-off", Severity::Critical, RuleType::Filename);
        disabled.enabled = false;
        let crit = rule_fixture("a-crit", Severity::Critical, RuleType::Filename);
        let med = rule_fixture("m-med", Severity::Medium, RuleType::Regex);

        let rs = build_ruleset(vec![low, disabled, med, crit], cache()).unwrap();
        let ids: Vec<&str> = rs.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a-crit", "m-med", "b-low"]);
    }

    #[test]
    fn ruleset_construction_is_idempotent() {
        let rules = vec![
            rule_fixture("a", Severity::High, RuleType::Regex),
            rule_fixture("b", Severity::Low, RuleType::Filename),
        ];
        let once = build_ruleset(rules.clone(), cache()).unwrap();
        let twice = build_ruleset(once.rules().to_vec(), cache()).unwrap();
        let once_ids: Vec<&str> = once.rules().iter().map(|r| r.id.as_str()).collect();
        let twice_ids: Vec<&str> = twice.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(once_ids, twice_ids);
    }
}
