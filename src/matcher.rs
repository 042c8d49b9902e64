//! Path normalization, glob matching, and cached regex compilation.
//!
//! Globs are shell-style (`*`, `?`, character classes) and case-sensitive;
//! `*` is allowed to cross `/` so `*.pem` matches at any depth. Regexes are
//! Unicode-aware and always case-insensitive; callers may OR in multi-line
//! plus dot-matches-newline via [`RegexOpts`].
//!
//! Compiled regexes are held in a process-wide bounded LRU keyed by
//! `(pattern, opts)`. The cache is safe under concurrent lookup/insert; a
//! handle is threaded through the rule set so tests can substitute their own.
//! The shared cache lives from first compile to process exit.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Upper bound on distinct compiled patterns kept alive.
const CACHE_CAPACITY: usize = 512;

/// Replace backslashes so Windows-style inputs compare like POSIX paths.
#[must_use]
pub fn normalize_rel_path(rel_path: &str) -> String {
    rel_path.replace('\\', "/")
}

/// True when `rel_path` matches any of `globs`.
///
/// Invalid glob patterns never match.
#[must_use]
pub fn any_glob_match(rel_path: &str, globs: &[String]) -> bool {
    let rp = normalize_rel_path(rel_path);
    globs
        .iter()
        .any(|g| glob::Pattern::new(g).is_ok_and(|p| p.matches(&rp)))
}

/// Include/exclude gate applied to a relative path.
///
/// An empty include list means "include unless excluded"; a non-empty one
/// requires at least one include match in addition to no exclude match.
#[must_use]
pub fn is_path_included(rel_path: &str, include: &[String], exclude: &[String]) -> bool {
    let rp = normalize_rel_path(rel_path);

    if !exclude.is_empty() && any_glob_match(&rp, exclude) {
        return false;
    }

    if include.is_empty() {
        return true;
    }

    any_glob_match(&rp, include)
}

/// Flag set participating in the cache key.
///
/// Case-insensitivity is unconditional; `multiline` combines multi-line with
/// dot-matches-newline, mirroring the rule grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegexOpts {
    pub multiline: bool,
}

impl RegexOpts {
    #[must_use]
    pub const fn multiline() -> Self {
        Self { multiline: true }
    }
}

/// Bounded LRU of compiled regexes, shared across scan workers.
pub struct RegexCache {
    inner: Mutex<LruCache<(String, RegexOpts), Arc<Regex>>>,
}

impl std::fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl RegexCache {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Compile `pattern` under `opts`, reusing a cached instance when present.
    pub fn compile(&self, pattern: &str, opts: RegexOpts) -> Result<Arc<Regex>, regex::Error> {
        let key = (pattern.to_string(), opts);
        if let Ok(mut cache) = self.inner.lock() {
            if let Some(rx) = cache.get(&key) {
                return Ok(Arc::clone(rx));
            }
        }

        let rx = Arc::new(
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .unicode(true)
                .multi_line(opts.multiline)
                .dot_matches_new_line(opts.multiline)
                .build()?,
        );

        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, Arc::clone(&rx));
        }
        Ok(rx)
    }

    /// Number of currently cached patterns (test/diagnostic aid).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|c| c.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }
}

static SHARED_CACHE: Lazy<Arc<RegexCache>> = Lazy::new(|| Arc::new(RegexCache::default()));

/// The process-wide cache handle; clones share one LRU.
#[must_use]
pub fn shared_cache() -> Arc<RegexCache> {
    Arc::clone(&SHARED_CACHE)
}
