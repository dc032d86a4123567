//! Feed autodiscovery in HTML pages.
//!
//! Pages advertise their feeds with
//! `<link rel="alternate" type="application/rss+xml" href="...">`. The scan is
//! tag-level rather than a full HTML parse: it only needs `<link>` attributes and
//! must tolerate the markup that real pages serve.

use crate::util::resolve_url;

/// MIME types that mark a `<link>` as a feed.
const FEED_TYPES: [&str; 3] = [
    "application/rss+xml",
    "application/atom+xml",
    "application/rdf+xml",
];

/// Returns the first feed advertised in `html`, resolved against `base_url`.
///
/// A match needs `alternate` in its `rel` list, a feed MIME type, and a non-empty
/// `href`. Attribute order, quoting and case are free.
pub fn extract_autodiscovery_link(html: &[u8], base_url: &str) -> Option<String> {
    let html = String::from_utf8_lossy(html);
    // ASCII lowering keeps byte offsets aligned with `html`.
    let html_lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(link_start) = html_lower[search_from..].find("<link") {
        let abs_start = search_from + link_start;
        let remaining = &html_lower[abs_start..];

        let tag_end = match remaining.find('>') {
            Some(pos) => pos,
            None => break,
        };
        search_from = abs_start + tag_end + 1;

        // `<linkfoo>` is some other element
        let after_name = remaining.as_bytes().get("<link".len()).copied();
        if !matches!(after_name, Some(b) if b.is_ascii_whitespace() || b == b'/') {
            continue;
        }

        let tag = &remaining[..=tag_end];
        let is_alternate = extract_attr_value(tag, "rel")
            .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r == "alternate"));
        if !is_alternate || !is_feed_type(tag) {
            continue;
        }

        // Extract href from the original HTML to preserve URL case
        let original_tag = &html[abs_start..abs_start + tag_end + 1];
        if let Some(href) = extract_attr_value(original_tag, "href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
        {
            return Some(resolve_url(href, base_url));
        }
    }

    None
}

/// Checks if a lowercased `<link>` tag declares a feed type.
fn is_feed_type(tag: &str) -> bool {
    extract_attr_value(tag, "type")
        .map(|t| t.split(';').next().unwrap_or_default().trim())
        .is_some_and(|t| FEED_TYPES.contains(&t))
}

/// Extracts an attribute value from a tag string, preserving its case.
///
/// The attribute name must follow whitespace, so `data-href` never matches `href`.
/// Double-quoted, single-quoted and bare values are accepted.
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_ascii_lowercase();
    let bytes = tag.as_bytes();
    let mut from = 0;

    while let Some(found) = tag_lower[from..].find(attr_name) {
        let start = from + found;
        from = start + attr_name.len();

        if !start
            .checked_sub(1)
            .is_some_and(|before| bytes[before].is_ascii_whitespace())
        {
            continue;
        }

        let rest = tag[from..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();

        return match rest.as_bytes().first()? {
            quote @ (b'"' | b'\'') => {
                let inner = &rest[1..];
                let end = inner.find(*quote as char)?;
                Some(&inner[..end])
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                Some(rest[..end].trim_end_matches('/'))
            }
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(html: &str, base: &str) -> Option<String> {
        extract_autodiscovery_link(html.as_bytes(), base)
    }

    #[test]
    fn test_find_rss_link_in_html() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/feed.xml" title="RSS">
        </head><body></body></html>"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/feed.xml".to_owned())
        );
    }

    #[test]
    fn test_find_atom_link_in_html() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/atom+xml" href="https://example.com/atom.xml">
        </head><body></body></html>"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/atom.xml".to_owned())
        );
    }

    #[test]
    fn test_find_rdf_link_in_html() {
        let html = r#"<link rel="alternate" type="application/rdf+xml" href="/index.rdf">"#;
        assert_eq!(
            find(html, "https://example.com/"),
            Some("https://example.com/index.rdf".to_owned())
        );
    }

    #[test]
    fn test_find_feed_link_reversed_attrs() {
        let html = r#"<html><head>
            <link href="/feed.xml" type="application/rss+xml" rel="alternate">
        </head><body></body></html>"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/feed.xml".to_owned())
        );
    }

    #[test]
    fn test_find_feed_link_single_quotes() {
        let html = r#"<html><head>
            <link rel='alternate' type='application/rss+xml' href='/rss'>
        </head><body></body></html>"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/rss".to_owned())
        );
    }

    #[test]
    fn test_find_feed_link_uppercase_and_self_closing() {
        let html = r#"<LINK REL="Alternate" TYPE="Application/RSS+XML" HREF="/Feed.XML" />"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/Feed.XML".to_owned())
        );
    }

    #[test]
    fn test_rel_list_and_type_parameters() {
        let html = r#"<link rel="home alternate" type="application/atom+xml; charset=utf-8" href="/a">"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/a".to_owned())
        );
    }

    #[test]
    fn test_unquoted_attributes() {
        let html = "<link rel=alternate type=application/rss+xml href=/feed>";
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/feed".to_owned())
        );
    }

    #[test]
    fn test_no_feed_link_in_html() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <link rel="alternate" hreflang="de" href="/de/">
        </head><body></body></html>"#;
        assert_eq!(find(html, "https://example.com"), None);
    }

    #[test]
    fn test_prefixed_attribute_names_do_not_match() {
        let html = r#"<link data-rel="alternate" type="application/rss+xml" href="/x">"#;
        assert_eq!(find(html, "https://example.com"), None);

        let html = r#"<link rel="alternate" type="application/rss+xml" data-href="/x" href="/y">"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/y".to_owned())
        );
    }

    #[test]
    fn test_skips_empty_href_and_other_elements() {
        let html = r#"<linkset rel="alternate" type="application/rss+xml" href="/wrong">
            <link rel="alternate" type="application/rss+xml" href="">
            <link rel="alternate" type="application/rss+xml" href="/right">"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/right".to_owned())
        );
    }

    #[test]
    fn test_find_feed_link_protocol_relative() {
        let html = r#"<link rel="alternate" type="application/rss+xml" href="//cdn.example.com/feed.xml">"#;
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://cdn.example.com/feed.xml".to_owned())
        );
    }

    #[test]
    fn test_non_ascii_text_before_link() {
        let html = "<title>Ünïcödé İstanbul</title>\
            <link rel=\"alternate\" type=\"application/rss+xml\" href=\"/feed\">";
        assert_eq!(
            find(html, "https://example.com"),
            Some("https://example.com/feed".to_owned())
        );
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(
            find(r#"<link rel="alternate" type="application/rss+xml" href="/x""#, ""),
            None
        );
    }
}
