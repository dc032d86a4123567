/// Resolves a potentially relative URL against a base URL.
///
/// Absolute `http(s)` URLs are returned unchanged. Protocol-relative URLs take
/// the base's scheme (`https` when the base has none). Anything that cannot be
/// resolved is returned as-is.
pub fn resolve_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }

    let base = url::Url::parse(base_url).ok();

    // Protocol-relative: go through the parser so the result is normalized
    if href.starts_with("//") {
        let scheme = base.as_ref().map_or("https", |b| b.scheme());
        if let Ok(parsed) = url::Url::parse(&format!("{scheme}:{href}")) {
            return parsed.to_string();
        }
    }

    if let Some(resolved) = base.and_then(|b| b.join(href).ok()) {
        return resolved.to_string();
    }

    href.to_owned()
}
