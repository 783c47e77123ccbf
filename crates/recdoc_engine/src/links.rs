use url::Url;

/// Resolves an `href`/`src` value against the page URL.
///
/// Absolute references are returned as written. Fragment-only, query-only and
/// `javascript:` references yield `None`. A relative reference with no usable
/// base is returned as written.
pub fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with('?') || lower.starts_with("javascript:") {
        return None;
    }
    if Url::parse(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }
    match base.and_then(|base| base.join(trimmed).ok()) {
        Some(joined) => Some(joined.into()),
        None => Some(trimmed.to_string()),
    }
}
