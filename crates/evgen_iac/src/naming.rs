//! Path formatting and resource naming.
//!
//! Resource names are `prefix + path fragment + Method`, e.g. `/cache/{cacheName}`
//! with `delete` and prefix `Api` becomes `ApiCacheDelete`. The same inputs always
//! produce the same name, which the role permission backfill relies on.

use std::sync::OnceLock;

use regex::Regex;

/// Marker that replaces templated path segments.
pub const WILDCARD: &str = "*";

fn template_segment() -> &'static Regex {
    static TEMPLATE_SEGMENT: OnceLock<Regex> = OnceLock::new();
    TEMPLATE_SEGMENT.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("static regex is valid"))
}

/// Replace every `{identifier}` with a `*` wildcard.
pub fn to_wildcard_path(path: &str) -> String {
    template_segment().replace_all(path, WILDCARD).into_owned()
}

/// Build a PascalCase identifier fragment from a path.
///
/// Empty segments are dropped and wildcard markers removed, so
/// `/topics/*/*` becomes `Topics`.
pub fn to_name_fragment(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| capitalize(&segment.replace(WILDCARD, "")))
        .collect()
}

/// Name of the destination generated for `method` on `path`.
pub fn resource_name(prefix: &str, path: &str, method: &str) -> String {
    format!(
        "{}{}{}",
        prefix,
        to_name_fragment(&to_wildcard_path(path)),
        capitalize(method)
    )
}

/// Name of the rule that triggers the destination `resource_name`.
pub fn rule_name(resource_name: &str, suffix: &str) -> String {
    format!("{}{}", resource_name, suffix)
}

/// Names of all `{identifier}` segments, left to right.
pub fn extract_path_params(path: &str) -> Vec<String> {
    template_segment()
        .captures_iter(path)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
