//! Layered scan configuration loading.
//!
//! Precedence, low to high: built-in defaults → global config
//! (`~/.config/secret-scout/config.{yaml,yml}`, then the legacy
//! `~/.secret-scout/` location) → the nearest `.secret-scout/config.{yaml,yml}`
//! walking up from the scan root → CLI overrides. Only keys under the `scan:`
//! table are consumed; unknown keys are rejected so typos fail loudly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::ScoutError;
use crate::model::ScanConfig;

const REPO_CONFIG_FILES: [&str; 2] = [
    ".secret-scout/config.yaml",
    ".secret-scout/config.yml",
];

/// Partial config overlay: unset keys fall through to the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanOverlay {
    pub max_file_bytes: Option<u64>,
    pub skip_dirs: Option<Vec<String>>,
    pub include_ignored: Option<bool>,
    pub deterministic: Option<bool>,
    pub redact: Option<bool>,
}

impl ScanOverlay {
    fn apply(&self, config: &mut ScanConfig) {
        if let Some(v) = self.max_file_bytes {
            config.max_file_bytes = v;
        }
        if let Some(v) = &self.skip_dirs {
            config.skip_dirs = v.clone();
        }
        if let Some(v) = self.include_ignored {
            config.include_ignored = v;
        }
        if let Some(v) = self.deterministic {
            config.deterministic = v;
        }
        if let Some(v) = self.redact {
            config.redact = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDoc {
    #[serde(default)]
    scan: ScanOverlay,
}

/// A merged config plus the file paths that contributed to it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ScanConfig,
    pub global_path: Option<PathBuf>,
    pub repo_path: Option<PathBuf>,
}

/// Candidate global config files, in precedence order (first hit wins).
fn global_config_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(base) = dirs::config_dir() {
        out.push(base.join("secret-scout/config.yaml"));
        out.push(base.join("secret-scout/config.yml"));
    }
    if let Some(home) = dirs::home_dir() {
        out.push(home.join(".secret-scout/config.yaml"));
        out.push(home.join(".secret-scout/config.yml"));
    }
    out
}

/// Walk up from `start_dir` to the first repo config file.
#[must_use]
pub fn find_repo_config(start_dir: &Path) -> Option<PathBuf> {
    let start = start_dir.canonicalize().unwrap_or_else(|_| start_dir.to_path_buf());
    let mut cur = Some(start.as_path());
    while let Some(dir) = cur {
        for rel in REPO_CONFIG_FILES {
            let p = dir.join(rel);
            if p.is_file() {
                return Some(p);
            }
        }
        cur = dir.parent();
    }
    None
}

fn read_overlay(path: &Path) -> Result<ScanOverlay, ScoutError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ScoutError::config_with(
            format!("Failed reading config file: {}", path.display()),
            e.to_string(),
        )
    })?;
    let doc: ConfigDoc = serde_yaml::from_str(&text).map_err(|e| {
        ScoutError::config_with(
            format!("Invalid config file: {}", path.display()),
            e.to_string(),
        )
    })?;
    Ok(doc.scan)
}

/// Load the effective [`ScanConfig`] for a scan rooted at `start_dir`.
pub fn load_scan_config(
    start_dir: &Path,
    cli_overrides: &ScanOverlay,
) -> Result<LoadedConfig, ScoutError> {
    let mut config = ScanConfig::default();

    let global_path = global_config_paths().into_iter().find(|p| p.is_file());
    if let Some(gp) = &global_path {
        debug!(path = %gp.display(), "applying global config");
        read_overlay(gp)?.apply(&mut config);
    }

    let repo_path = find_repo_config(start_dir);
    if let Some(rp) = &repo_path {
        debug!(path = %rp.display(), "applying repo config");
        read_overlay(rp)?.apply(&mut config);
    }

    cli_overrides.apply(&mut config);

    Ok(LoadedConfig {
        config,
        global_path,
        repo_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_applies_only_set_keys() {
        let mut cfg = ScanConfig::default();
        let overlay = ScanOverlay {
            max_file_bytes: Some(42),
            redact: Some(false),
            ..ScanOverlay::default()
        };
        overlay.apply(&mut cfg);
        assert_eq!(cfg.max_file_bytes, 42);
        assert!(!cfg.redact);
        // untouched keys keep their defaults
        assert!(cfg.deterministic);
        assert!(cfg.skip_dirs.iter().any(|d| d == ".git"));
    }

    #[test]
    fn repo_config_is_found_walking_up() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        let cfg_dir = tmp.path().join("a/.secret-scout");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(cfg_dir.join("config.yaml"), "scan:\n  redact: false\n").unwrap();

        let found = find_repo_config(&nested).expect("config should be found");
        assert!(found.ends_with(".secret-scout/config.yaml"));
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg_dir = tmp.path().join(".secret-scout");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(cfg_dir.join("config.yaml"), "scan: [not, a, map\n").unwrap();

        let err = load_scan_config(tmp.path(), &ScanOverlay::default()).unwrap_err();
        assert!(matches!(err, ScoutError::Config { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg_dir = tmp.path().join(".secret-scout");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(cfg_dir.join("config.yaml"), "scan:\n  max_file_byte: 1\n").unwrap();

        let err = load_scan_config(tmp.path(), &ScanOverlay::default()).unwrap_err();
        assert!(matches!(err, ScoutError::Config { .. }));
    }

    #[test]
    fn repo_layer_overrides_defaults_and_cli_overrides_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg_dir = tmp.path().join(".secret-scout");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(
            cfg_dir.join("config.yaml"),
            "scan:\n  max_file_bytes: 2048\n  include_ignored: true\n",
        )
        .unwrap();

        let cli = ScanOverlay {
            max_file_bytes: Some(99),
            ..ScanOverlay::default()
        };
        let loaded = load_scan_config(tmp.path(), &cli).unwrap();
        assert_eq!(loaded.config.max_file_bytes, 99);
        assert!(loaded.config.include_ignored);
        assert!(loaded.repo_path.is_some());
    }
}
