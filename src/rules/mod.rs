//! Rule model: packs, typed rule variants, and the evaluation-ready rule set.
//!
//! A rule is identified by `id` and carries exactly one variant payload —
//! `filename`, `regex`, or `structured` — selected by its `type` tag. Packs
//! merge by precedence into a [`RuleSet`]: the enabled, severity-descending,
//! id-deduplicated list a scan iterates over.

pub mod loader;
pub mod validate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::matcher::{self, RegexCache};
use crate::model::Severity;

/// Variant tag carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Filename,
    Regex,
    Structured,
}

impl RuleType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::Regex => "regex",
            Self::Structured => "structured",
        }
    }
}

/// How a filename rule interprets its pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    #[default]
    Glob,
    Regex,
}

/// Whether a regex applies to the whole file text or line-by-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    File,
    #[default]
    Line,
}

/// Structured file formats with a registered parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredFormat {
    Json,
    Yaml,
    Toml,
    Env,
}

impl StructuredFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Env => "env",
        }
    }
}

/// Policy applied to values of matched structured keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePolicy {
    /// The key alone violates, whatever the value.
    #[default]
    Any,
    NonEmpty,
    MustReferenceEnv,
    MustReferenceVault,
    /// Heuristic: the value looks like an inline plaintext secret.
    Plaintext,
}

/// Filename variant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilenameRule {
    pub pattern: String,
    #[serde(default)]
    pub pattern_type: PatternType,
}

const fn default_max_matches() -> usize {
    20
}

/// Regex variant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexRule {
    pub regex: String,
    /// Combines multi-line with dot-matches-newline.
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub scope: MatchScope,
    /// Cap on emissions per file.
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

const fn default_true() -> bool {
    true
}

/// Structured variant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredRule {
    pub format: StructuredFormat,
    #[serde(default)]
    pub forbidden_keys: Vec<String>,
    #[serde(default)]
    pub allowed_keys: Vec<String>,
    #[serde(default = "default_true")]
    pub case_insensitive_keys: bool,
    #[serde(default)]
    pub value_policy: ValuePolicy,
}

/// One rule of a pack. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub id: String,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Include globs over the relative path; empty means everything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Suppression globs: a match silences this rule for the file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_paths: Vec<String>,
    /// Suppression regexes applied to matched text (and whole lines).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_regexes: Vec<String>,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<FilenameRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<RegexRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredRule>,
}

impl Rule {
    /// Short human label used in default finding messages.
    #[must_use]
    pub fn message(&self) -> &str {
        self.description.as_deref().unwrap_or(match self.rule_type {
            RuleType::Filename => "Suspicious filename detected",
            RuleType::Regex => "Secret-like pattern detected",
            RuleType::Structured => "Forbidden key detected",
        })
    }
}

/// Pack metadata. `source` identifies the pack's origin (path or `builtin:`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Rule>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // A commented-out `rules:` section parses as null; treat it as [].
    let opt = Option::<Vec<Rule>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// An ordered rule document, as parsed from one YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulePack {
    pub metadata: PackMetadata,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rules: Vec<Rule>,
}

/// The enabled, severity-descending, id-unique rule list used by one scan.
///
/// Carries the compiled-regex cache handle so evaluation shares one LRU
/// across concurrent scans.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    cache: Arc<RegexCache>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            cache: matcher::shared_cache(),
        }
    }

    #[must_use]
    pub fn with_cache(rules: Vec<Rule>, cache: Arc<RegexCache>) -> Self {
        Self { rules, cache }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn cache(&self) -> &RegexCache {
        &self.cache
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn rule_fixture(id: &str, severity: Severity, rule_type: RuleType) -> Rule {
    Rule {
        id: id.to_string(),
        severity,
        enabled: true,
        description: None,
        include: Vec::new(),
        exclude: Vec::new(),
        allow_paths: Vec::new(),
        allow_regexes: Vec::new(),
        rule_type,
        filename: match rule_type {
            RuleType::Filename => Some(FilenameRule {
                pattern: "**/id_rsa".to_string(),
                pattern_type: PatternType::Glob,
            }),
            _ => None,
        },
        regex: match rule_type {
            RuleType::Regex => Some(RegexRule {
                regex: "secret".to_string(),
                multiline: false,
                scope: MatchScope::Line,
                max_matches: default_max_matches(),
            }),
            _ => None,
        },
        structured: match rule_type {
            RuleType::Structured => Some(StructuredRule {
                format: StructuredFormat::Env,
                forbidden_keys: vec!["DB_PASSWORD".to_string()],
                allowed_keys: Vec::new(),
                case_insensitive_keys: true,
                value_policy: ValuePolicy::Any,
            }),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_yaml_round_trips() {
        let yaml = r#"
id: aws-access-key
severity: critical
description: AWS access key id
type: regex
regex:
  regex: "AKIA[0-9A-Z]{16}"
  scope: line
  max_matches: 5
"#;
        let rule: Rule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.id, "aws-access-key");
        assert!(rule.enabled, "enabled defaults to true");
        assert_eq!(rule.rule_type, RuleType::Regex);
        let rx = rule.regex.as_ref().unwrap();
        assert_eq!(rx.scope, MatchScope::Line);
        assert_eq!(rx.max_matches, 5);
        assert!(!rx.multiline);

        let back: Rule = serde_yaml::from_str(&serde_yaml::to_string(&rule).unwrap()).unwrap();
        assert_eq!(back.id, rule.id);
    }

    #[test]
    fn unknown_rule_fields_are_rejected() {
        let yaml = "id: x\nseverity: low\ntype: filename\nfilename: {pattern: '*.pem'}\nbogus: 1\n";
        assert!(serde_yaml::from_str::<Rule>(yaml).is_err());
    }

    #[test]
    fn commented_out_rules_section_parses_as_empty() {
        let yaml = "metadata:\n  name: p\n  version: '1'\nrules:\n";
        let pack: RulePack = serde_yaml::from_str(yaml).unwrap();
        assert!(pack.rules.is_empty());
    }

    #[test]
    fn structured_defaults() {
        let yaml = "format: env\nforbidden_keys: [DB_PASSWORD]\n";
        let s: StructuredRule = serde_yaml::from_str(yaml).unwrap();
        assert!(s.case_insensitive_keys);
        assert_eq!(s.value_policy, ValuePolicy::Any);
        assert!(s.allowed_keys.is_empty());
    }

    #[test]
    fn default_message_tracks_variant() {
        let rule = rule_fixture("x", Severity::Low, RuleType::Filename);
        assert_eq!(rule.message(), "Suspicious filename detected");
    }
}
