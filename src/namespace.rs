//! Namespace resolution for body names.
//!
//! A body's full name may carry a path-like namespace prefix
//! (`/ambf/env/base`). Both pipelines share these helpers to split, strip and
//! re-qualify names against the session namespace.

/// Namespace assigned when a document does not declare one.
pub const DEFAULT_NAMESPACE: &str = "/ambf/env/";

/// Namespace prefix of `full_name`, up to and including the last `/`.
///
/// Returns an empty string when the name carries no namespace.
pub fn body_namespace(full_name: &str) -> &str {
    match full_name.rfind('/') {
        Some(idx) => &full_name[..=idx],
        None => "",
    }
}

/// Bare body name with any namespace prefix removed.
pub fn strip_namespace(full_name: &str) -> &str {
    match full_name.rfind('/') {
        Some(idx) if idx > 0 => &full_name[idx + 1..],
        _ => full_name,
    }
}

/// Whether `full_name` carries exactly the given session namespace.
///
/// A name without any namespace never matches.
pub fn matches_namespace(full_name: &str, namespace: &str) -> bool {
    match full_name.rfind('/') {
        Some(idx) => &full_name[..=idx] == namespace,
        None => false,
    }
}

/// Ensures a namespace ends with a trailing `/`, warning when it does not.
pub fn normalize_namespace(namespace: &str) -> String {
    if namespace.is_empty() || namespace.ends_with('/') {
        namespace.to_string()
    } else {
        log::warn!("multi-body namespace should end with '/': {namespace}");
        format!("{namespace}/")
    }
}

/// Prefixes `name` with `namespace`.
pub fn qualify(namespace: &str, name: &str) -> String {
    format!("{namespace}{name}")
}
