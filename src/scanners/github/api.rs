//! Hosted-provider client for listing GitHub repositories.
//!
//! Synchronous on purpose: each orchestrator worker owns its lane and the
//! listing happens once up front. Pagination follows RFC 5988 `Link` headers
//! (`rel="next"`); retries are localized to the HTTP call, not the
//! pagination loop. No finding content ever travels through this module.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ScoutError;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "secret-scout";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const PER_PAGE: u32 = 100;

/// Repository descriptor returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub html_url: String,
    pub private: bool,
    pub fork: bool,
    pub archived: bool,
    pub disabled: bool,
    pub default_branch: String,
    pub owner_login: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Defensive payload shape: absent fields get neutral defaults rather than
/// failing the whole listing.
#[derive(Debug, Deserialize)]
struct RepoPayload {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    clone_url: String,
    #[serde(default)]
    ssh_url: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default = "default_branch")]
    default_branch: String,
    #[serde(default)]
    owner: Option<OwnerPayload>,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    #[serde(default)]
    login: String,
}

impl From<RepoPayload> for RepoInfo {
    fn from(p: RepoPayload) -> Self {
        Self {
            id: p.id,
            name: p.name,
            full_name: p.full_name,
            clone_url: p.clone_url,
            ssh_url: p.ssh_url,
            html_url: p.html_url,
            private: p.private,
            fork: p.fork,
            archived: p.archived,
            disabled: p.disabled,
            default_branch: p.default_branch,
            owner_login: p.owner.map(|o| o.login).unwrap_or_default(),
        }
    }
}

/// Parse a `Link` header into `rel -> url`.
#[must_use]
pub fn parse_link_header(link: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for part in link.split(',') {
        let part = part.trim();
        let mut segments = part.split(';');
        let Some(url_part) = segments.next().map(str::trim) else {
            continue;
        };
        if !(url_part.starts_with('<') && url_part.ends_with('>')) {
            continue;
        }
        let url = &url_part[1..url_part.len() - 1];
        for param in segments {
            let param = param.trim();
            if let Some(rel) = param.strip_prefix("rel=") {
                let rel = rel.trim_matches('"');
                out.insert(rel.to_string(), url.to_string());
            }
        }
    }
    out
}

/// GitHub API client with token auth and bounded retries.
pub struct GitHubClient {
    agent: ureq::Agent,
    token: Option<String>,
    api_base: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token itself must never reach debug output.
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// `token` falls back to the `GITHUB_TOKEN` environment variable.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            token: token.or_else(|| std::env::var("GITHUB_TOKEN").ok()),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the API base (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// One GET with retry policy; returns the body plus the `next` page URL.
    fn request_json(&self, url: &str) -> Result<(serde_json::Value, Option<String>), ScoutError> {
        let mut last_err: Option<String> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let mut request = self
                .agent
                .get(url)
                .set("Accept", "application/vnd.github+json")
                .set("User-Agent", USER_AGENT);
            if let Some(token) = &self.token {
                request = request.set("Authorization", &format!("Bearer {token}"));
            }

            match request.call() {
                Ok(response) => {
                    let next = response
                        .header("link")
                        .map(parse_link_header)
                        .and_then(|mut links| links.remove("next"));
                    let value: serde_json::Value = response.into_json().map_err(|e| {
                        ScoutError::provider(
                            "GitHub API returned an unreadable body.",
                            None,
                            Some(e.to_string()),
                        )
                    })?;
                    return Ok((value, next));
                }
                Err(ureq::Error::Status(status, response))
                    if matches!(status, 429 | 500 | 502 | 503 | 504) =>
                {
                    last_err = Some(format!(
                        "HTTP {status}: {}",
                        response.into_string().unwrap_or_default()
                    ));
                    std::thread::sleep(Duration::from_millis(500 * u64::from(attempt + 1)));
                }
                Err(ureq::Error::Status(403, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    return Err(ScoutError::provider(
                        "GitHub API forbidden (possible rate limit or insufficient scopes).",
                        Some(403),
                        Some(body),
                    ));
                }
                Err(ureq::Error::Status(status, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    return Err(ScoutError::provider(
                        "GitHub API request failed.",
                        Some(status),
                        Some(body),
                    ));
                }
                Err(transport) => {
                    last_err = Some(transport.to_string());
                    std::thread::sleep(Duration::from_millis(250 * u64::from(attempt + 1)));
                }
            }
        }

        Err(ScoutError::provider(
            "GitHub API request failed after retries.",
            None,
            last_err,
        ))
    }

    /// Collect every page of a listing endpoint.
    fn paginate(&self, first_url: &str) -> Result<Vec<serde_json::Value>, ScoutError> {
        let mut url = first_url.to_string();
        let mut items = Vec::new();
        loop {
            let (value, next) = self.request_json(&url)?;
            let serde_json::Value::Array(page) = value else {
                return Err(ScoutError::provider(
                    "Unexpected GitHub response (expected list).",
                    None,
                    Some(crate::redaction::truncate(&value.to_string(), 500)),
                ));
            };
            items.extend(page.into_iter().filter(|v| v.is_object()));
            match next {
                Some(n) => url = n,
                None => break,
            }
        }
        Ok(items)
    }

    fn to_repos(items: Vec<serde_json::Value>) -> Vec<RepoInfo> {
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<RepoPayload>(item).ok())
            .map(RepoInfo::from)
            .collect()
    }

    /// List an organization's repositories.
    pub fn list_org_repos(
        &self,
        org: &str,
        include_private: bool,
    ) -> Result<Vec<RepoInfo>, ScoutError> {
        let url = format!(
            "{}/orgs/{org}/repos?per_page={PER_PAGE}&type=all",
            self.api_base
        );
        let mut repos = Self::to_repos(self.paginate(&url)?);
        if !include_private {
            repos.retain(|r| !r.private);
        }
        Ok(repos)
    }

    /// List a user's repositories.
    ///
    /// With a token and `include_private`, uses the authenticated
    /// `/user/repos` listing filtered to the requested owner; otherwise the
    /// public `/users/{user}/repos` endpoint.
    pub fn list_user_repos(
        &self,
        user: &str,
        include_private: bool,
    ) -> Result<Vec<RepoInfo>, ScoutError> {
        if include_private && self.token.is_some() {
            let url = format!(
                "{}/user/repos?per_page={PER_PAGE}&affiliation=owner,collaborator,organization&visibility=all",
                self.api_base
            );
            let mut repos = Self::to_repos(self.paginate(&url)?);
            repos.retain(|r| r.owner_login.eq_ignore_ascii_case(user));
            return Ok(repos);
        }

        let url = format!(
            "{}/users/{user}/repos?per_page={PER_PAGE}&type=all",
            self.api_base
        );
        let mut repos = Self::to_repos(self.paginate(&url)?);
        if !include_private {
            repos.retain(|r| !r.private);
        }
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_header_parses_next_and_last() {
        let link = r#"<https://api.github.com/orgs/acme/repos?page=2>; rel="next", <https://api.github.com/orgs/acme/repos?page=9>; rel="last""#;
        let links = parse_link_header(link);
        assert_eq!(
            links.get("next").map(String::as_str),
            Some("https://api.github.com/orgs/acme/repos?page=2")
        );
        assert_eq!(
            links.get("last").map(String::as_str),
            Some("https://api.github.com/orgs/acme/repos?page=9")
        );
    }

    #[test]
    fn link_header_tolerates_garbage() {
        assert!(parse_link_header("").is_empty());
        assert!(parse_link_header("nonsense").is_empty());
        assert!(parse_link_header("<no-rel>").is_empty());
    }

    #[test]
    fn repo_payload_fills_defaults() {
        let value = serde_json::json!({
            "id": 7,
            "name": "tools",
            "full_name": "acme/tools",
            "clone_url": "https://github.com/acme/tools.git",
            "owner": {"login": "acme"}
        });
        let repo: RepoInfo = serde_json::from_value::<RepoPayload>(value).unwrap().into();
        assert_eq!(repo.id, 7);
        assert_eq!(repo.owner_login, "acme");
        assert_eq!(repo.default_branch, "main");
        assert!(!repo.private);
        assert!(!repo.archived);
    }

    #[test]
    fn repo_payload_without_owner() {
        let value = serde_json::json!({"id": 1, "name": "x", "full_name": "a/x"});
        let repo: RepoInfo = serde_json::from_value::<RepoPayload>(value).unwrap().into();
        assert_eq!(repo.owner_login, "");
    }
}
