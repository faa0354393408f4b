//! Translation between route paths, output file paths and router paths.
//!
//! Route paths are what users declare and request (`/`, `/posts/:slug`,
//! `/feed.json`, `/docs/**`). Output files always carry an extension, and the
//! router keys every path by that extension so that `/foo` and `/foo.json`
//! never share a route space:
//!
//! ```text
//! route path        file path           router path
//! /                 /index.html         /.rw/html/index
//! /posts/:slug      /posts/:slug.html   /.rw/html/posts/:slug
//! /:slug.json       /:slug.json         /.rw/json/:slug
//! /docs/**          /docs/**.html       /.rw/html/docs/**
//! ```

use std::borrow::Cow;

/// Suffix marking a catch-all route pattern.
pub const CATCH_ALL_SUFFIX: &str = "/**";

/// Router namespace segment that prefixes the file extension.
const ROUTER_NAMESPACE: &str = "/.rw/";

/// Name of the parameter bound by an unnamed catch-all (`**`).
const CATCH_ALL_PARAM: &str = "_";

/// Map a route path to the file written for it.
///
/// Paths whose last segment already has an extension are kept as-is,
/// directory paths get `index.html`, everything else gets `.html`.
pub fn path_to_file_path(path: &str) -> Cow<'_, str> {
    if has_extension(path) {
        Cow::Borrowed(path)
    } else if path.ends_with('/') {
        Cow::Owned(format!("{path}index.html"))
    } else {
        Cow::Owned(format!("{path}.html"))
    }
}

/// Map a route path (or pattern) to the router's internal path.
///
/// The extension of the file path becomes a leading namespace segment.
pub fn path_to_router_path(path: &str) -> String {
    let file_path = path_to_file_path(path);
    let (dir, last) = split_last_segment(&file_path);

    let routed = match last.split_once('.') {
        Some((stem, extension)) => format!("{ROUTER_NAMESPACE}{extension}{dir}{stem}"),
        None => file_path.into_owned(),
    };

    collapse_slashes(&routed)
}

/// Strip the catch-all suffix from a pattern, if present.
///
/// `/docs/**` becomes `/docs`, `/**` becomes the empty path.
pub fn strip_catch_all(pattern: &str) -> Option<&str> {
    pattern.strip_suffix(CATCH_ALL_SUFFIX).or_else(|| {
        // Named catch-all: `/docs/**:rest`
        let (dir, last) = split_last_segment(pattern);
        last.starts_with("**:").then(|| dir.trim_end_matches('/'))
    })
}

/// Name of the parameter a catch-all pattern binds: `_` for `**`, `name`
/// for `**:name`. `None` for patterns without a catch-all.
pub(crate) fn catch_all_param(pattern: &str) -> Option<&str> {
    let (_, last) = split_last_segment(pattern);
    if last == "**" {
        Some(CATCH_ALL_PARAM)
    } else {
        last.strip_prefix("**:")
    }
}

/// Translate router path syntax into the trie library's syntax.
///
/// `:name` segments become `{name}`, `**` becomes `{*_}` and `**:name`
/// becomes `{*name}`. Literal braces are escaped.
pub(crate) fn to_trie_syntax(router_path: &str) -> String {
    router_path
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix("**:") {
                format!("{{*{name}}}")
            } else if segment == "**" {
                format!("{{*{CATCH_ALL_PARAM}}}")
            } else if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else {
                segment.replace('{', "{{").replace('}', "}}")
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the last segment of `path` carries a file extension.
fn has_extension(path: &str) -> bool {
    let (_, last) = split_last_segment(path);
    last.contains('.')
}

/// Split `path` into everything up to and including the last `/`, and the rest.
fn split_last_segment(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}
