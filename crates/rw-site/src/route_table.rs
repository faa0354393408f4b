//! Route table: resolves concrete paths to the route that owns them.
//!
//! Wraps `matchit` radix tries keyed by router paths (see [`crate::path`]).
//! The payload of each registration is the index of the owning route in the
//! site's registration order.
//!
//! Catch-all patterns live in their own tries, consulted only when no other
//! pattern matches. `matchit` refuses a catch-all next to a parameter at the
//! same level (`/posts/:slug` and `/posts/**`), so a catch-all that conflicts
//! with the ones already registered opens a new trie instead of being lost.

use std::collections::BTreeMap;

use crate::path::{catch_all_param, path_to_router_path, strip_catch_all, to_trie_syntax};

/// Named parameters extracted from a matched path.
pub type Params = BTreeMap<String, String>;

/// Successful lookup in a [`RouteTable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableMatch {
    /// Index of the owning route in registration order.
    pub index: usize,
    /// Named parameters bound by the match.
    pub params: Params,
}

#[derive(Clone, Debug)]
struct CatchAll {
    index: usize,
    param: String,
}

/// Immutable lookup structure built from an ordered list of route patterns.
///
/// Catch-all patterns (`/docs/**`) are registered twice: once as the wildcard
/// pattern and once with the wildcard suffix stripped, so `/docs` resolves to
/// the same route as `/docs/a/b`. When two patterns claim the same router
/// path, the earlier registration wins.
///
/// Lookup prefers non-catch-all patterns. Among catch-alls, the one that
/// captures the shortest remainder (the most specific prefix) wins.
pub struct RouteTable {
    trie: matchit::Router<usize>,
    catch_alls: Vec<matchit::Router<CatchAll>>,
    registered: Vec<String>,
}

impl RouteTable {
    /// Build a table from patterns in registration order.
    pub fn build<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self {
            trie: matchit::Router::new(),
            catch_alls: Vec::new(),
            registered: Vec::new(),
        };

        for (index, pattern) in patterns.into_iter().enumerate() {
            match (strip_catch_all(pattern), catch_all_param(pattern)) {
                (Some(parent), Some(param)) => {
                    table.insert_catch_all(pattern, param, index);
                    table.insert(parent, index);
                }
                _ => table.insert(pattern, index),
            }
        }

        tracing::debug!(registrations = table.registered.len(), "built route table");
        table
    }

    /// Router paths that were accepted, in registration order.
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// Look up the route owning `path`.
    pub fn lookup(&self, path: &str) -> Option<TableMatch> {
        let router_path = path_to_router_path(path);
        tracing::debug!(path, %router_path, "looking up");

        if let Ok(matched) = self.trie.at(&router_path) {
            return Some(TableMatch {
                index: *matched.value,
                params: collect_params(&matched.params),
            });
        }

        self.catch_alls
            .iter()
            .filter_map(|trie| trie.at(&router_path).ok())
            .min_by_key(|matched| {
                matched
                    .params
                    .get(&matched.value.param)
                    .map_or(0, str::len)
            })
            .map(|matched| TableMatch {
                index: matched.value.index,
                params: collect_params(&matched.params),
            })
    }

    fn insert(&mut self, pattern: &str, index: usize) {
        let router_path = path_to_router_path(pattern);
        if self.registered.contains(&router_path) {
            tracing::debug!(pattern, %router_path, "already registered, skipped");
            return;
        }

        match self.trie.insert(to_trie_syntax(&router_path), index) {
            Ok(()) => {
                tracing::debug!(pattern, %router_path, "registered");
                self.registered.push(router_path);
            }
            Err(e) => {
                tracing::warn!(pattern, %router_path, error = %e, "route pattern conflicts with an earlier one, skipped");
            }
        }
    }

    fn insert_catch_all(&mut self, pattern: &str, param: &str, index: usize) {
        let router_path = path_to_router_path(pattern);
        if self.registered.contains(&router_path) {
            tracing::debug!(pattern, %router_path, "already registered, skipped");
            return;
        }

        let trie_path = to_trie_syntax(&router_path);
        let entry = CatchAll {
            index,
            param: param.to_owned(),
        };

        let inserted = self
            .catch_alls
            .iter_mut()
            .any(|trie| trie.insert(trie_path.clone(), entry.clone()).is_ok());
        if !inserted {
            let mut trie = matchit::Router::new();
            if let Err(e) = trie.insert(trie_path, entry) {
                tracing::warn!(pattern, %router_path, error = %e, "invalid catch-all pattern, skipped");
                return;
            }
            self.catch_alls.push(trie);
        }

        tracing::debug!(pattern, %router_path, "registered");
        self.registered.push(router_path);
    }
}

/// Extract the parameters `pattern` binds for the concrete `path`.
///
/// Returns empty parameters when `path` does not match `pattern`.
pub(crate) fn extract_params(pattern: &str, path: &str) -> Params {
    RouteTable::build([pattern])
        .lookup(path)
        .map(|matched| matched.params)
        .unwrap_or_default()
}

fn collect_params(params: &matchit::Params<'_, '_>) -> Params {
    params
        .iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
