//! Line parsers for `xbps-query` output.
//!
//! Both listing (`-l`) and search (`-Rs`) print one package per line:
//!
//! ```text
//! ii htop-3.3.0_1           Interactive process viewer
//! [*] vim-9.1.0_1           Vim editor (vi clone)
//! ```
//!
//! The first column is a status field, the second a `<name>-<version>` token,
//! the rest a description. Parsing is best effort: lines with fewer than two
//! fields are skipped.

use crate::types::{InstalledPackage, NameParser, SearchHit};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static PKGVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+)-(?P<version>[^-]*\d[^-]*_\d+)$").expect("valid pkgver regex")
});

/// Split a `<name>-<version>` token into name and optional version.
pub fn split_pkgver(token: &str, parser: NameParser) -> (String, Option<String>) {
    if parser == NameParser::Strict
        && let Some(caps) = PKGVER.captures(token)
    {
        return (caps["name"].to_string(), Some(caps["version"].to_string()));
    }

    match token.split_once('-') {
        Some((name, version)) => (name.to_string(), Some(version.to_string())),
        None => (token.to_string(), None),
    }
}

/// Split a line into status, pkgver token and the remaining description.
fn fields(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim_start();
    let (status, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }

    match rest.split_once(char::is_whitespace) {
        Some((token, description)) => Some((status, token, description.trim())),
        None => Some((status, rest.trim_end(), "")),
    }
}

/// Parse `xbps-query -l` output.
pub fn parse_installed<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    parser: NameParser,
) -> Vec<InstalledPackage> {
    lines
        .into_iter()
        .filter_map(fields)
        .map(|(_, token, _)| {
            let (name, version) = split_pkgver(token, parser);
            InstalledPackage { name, version }
        })
        .collect()
}

/// Parse `xbps-query -Rs` output.
///
/// Names are unique in the result: later duplicates (another repository
/// offering the same package) are dropped.
pub fn parse_search<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    parser: NameParser,
) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter_map(fields)
        .filter_map(|(_status, token, description)| {
            let (name, version) = split_pkgver(token, parser);
            if !seen.insert(name.clone()) {
                return None;
            }
            Some(SearchHit {
                name,
                version,
                description: description.to_string(),
            })
        })
        .collect()
}
