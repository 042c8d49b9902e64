//! GitHub multi-repository scanning: provider client, filters, clone, and
//! the bounded-parallel orchestrator.

pub mod api;
pub mod clone;
pub mod filters;
pub mod scan;

pub use api::{GitHubClient, RepoInfo};
pub use clone::CloneOptions;
pub use filters::RepoFilter;
pub use scan::{GitHubScanOptions, OnEvent, ScanEvent, Workspace, scan_github, scan_repo_list};
