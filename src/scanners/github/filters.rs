//! Repository selection filters applied to provider listings.

use crate::matcher::{any_glob_match, normalize_rel_path};
use crate::scanners::github::api::RepoInfo;

/// Filter over `owner/name` full names plus descriptor flags.
///
/// Application order: explicit allow list, archived/fork/disabled flags,
/// exclude globs, include globs. Survivors sort by `(full_name, id)` and are
/// clamped to `max_repos` when set.
#[derive(Debug, Clone, Default)]
pub struct RepoFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Explicit allow list of full names (case-insensitive).
    pub repos: Vec<String>,
    pub include_archived: bool,
    pub include_forks: bool,
    pub include_disabled: bool,
    pub max_repos: Option<usize>,
}

impl RepoFilter {
    #[must_use]
    pub fn apply(&self, repos: Vec<RepoInfo>) -> Vec<RepoInfo> {
        let allow: Vec<String> = self.repos.iter().map(|r| r.to_lowercase()).collect();

        let mut out: Vec<RepoInfo> = repos
            .into_iter()
            .filter(|r| {
                let name = if r.full_name.is_empty() {
                    format!("{}/{}", r.owner_login, r.name)
                } else {
                    r.full_name.clone()
                };
                let key = name.to_lowercase();

                if !allow.is_empty() && !allow.contains(&key) {
                    return false;
                }
                if !self.include_archived && r.archived {
                    return false;
                }
                if !self.include_forks && r.fork {
                    return false;
                }
                if !self.include_disabled && r.disabled {
                    return false;
                }
                let norm = normalize_rel_path(&name);
                if !self.exclude.is_empty() && any_glob_match(&norm, &self.exclude) {
                    return false;
                }
                if !self.include.is_empty() && !any_glob_match(&norm, &self.include) {
                    return false;
                }
                true
            })
            .collect();

        out.sort_by(|a, b| (a.full_name.as_str(), a.id).cmp(&(b.full_name.as_str(), b.id)));
        if let Some(max) = self.max_repos {
            out.truncate(max);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(full_name: &str, id: u64) -> RepoInfo {
        let (owner, name) = full_name.split_once('/').unwrap();
        RepoInfo {
            id,
            name: name.to_string(),
            full_name: full_name.to_string(),
            clone_url: String::new(),
            ssh_url: String::new(),
            html_url: String::new(),
            private: false,
            fork: false,
            archived: false,
            disabled: false,
            default_branch: "main".to_string(),
            owner_login: owner.to_string(),
        }
    }

    #[test]
    fn default_filter_drops_archived_and_forks() {
        let mut archived = repo("acme/old", 1);
        archived.archived = true;
        let mut forked = repo("acme/forked", 2);
        forked.fork = true;
        let active = repo("acme/app", 3);

        let out = RepoFilter::default().apply(vec![archived, forked, active]);
        let names: Vec<&str> = out.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["acme/app"]);
    }

    #[test]
    fn explicit_allow_list_is_case_insensitive() {
        let filter = RepoFilter {
            repos: vec!["ACME/App".to_string()],
            ..RepoFilter::default()
        };
        let out = filter.apply(vec![repo("acme/app", 1), repo("acme/other", 2)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].full_name, "acme/app");
    }

    #[test]
    fn include_and_exclude_globs() {
        let filter = RepoFilter {
            include: vec!["acme/*".to_string()],
            exclude: vec!["acme/legacy-*".to_string()],
            ..RepoFilter::default()
        };
        let out = filter.apply(vec![
            repo("acme/app", 1),
            repo("acme/legacy-api", 2),
            repo("other/app", 3),
        ]);
        let names: Vec<&str> = out.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["acme/app"]);
    }

    #[test]
    fn survivors_are_sorted_and_clamped() {
        let filter = RepoFilter {
            max_repos: Some(2),
            ..RepoFilter::default()
        };
        let out = filter.apply(vec![
            repo("acme/zeta", 9),
            repo("acme/alpha", 5),
            repo("acme/mid", 7),
        ]);
        let names: Vec<&str> = out.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["acme/alpha", "acme/mid"]);
    }

    #[test]
    fn flags_can_be_opted_in() {
        let mut archived = repo("acme/old", 1);
        archived.archived = true;
        let filter = RepoFilter {
            include_archived: true,
            ..RepoFilter::default()
        };
        assert_eq!(filter.apply(vec![archived]).len(), 1);
    }
}
