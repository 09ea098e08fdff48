use url::Url;

/// Canonicalizes a URL into the form used as the frontier membership key
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http/https and URLs without a host
/// 3. Lowercase the scheme and host (done by the parser)
/// 4. Elide default ports (80 for http, 443 for https)
/// 5. Normalize the path:
///    - Resolve `.` and `..` segments
///    - Collapse repeated slashes
///    - Empty path becomes `/`
///    - A trailing slash is preserved
/// 6. Remove the fragment
/// 7. Sort query parameters by key, keeping multi-valued order within a key
///
/// The result is idempotent: canonicalizing a canonical URL returns it
/// unchanged.
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Some(String)` - The canonical form
/// * `None` - Malformed URL, non-http(s) scheme, or missing host
pub fn canonicalize(url_str: &str) -> Option<String> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut url = Url::parse(trimmed).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return None,
    }

    // The parser already lowercases scheme and host and elides default
    // ports; repeated slashes it leaves alone.
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // Stable sort keeps multi-valued order within a key
        params.sort_by(|a, b| a.0.cmp(&b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Some(url.to_string())
}

/// Normalizes a URL path: dot segments resolved, repeated slashes collapsed
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let had_trailing_slash = path.len() > 1 && path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if had_trailing_slash {
        result.push('/');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_scheme_and_host() {
        assert_eq!(
            canonicalize("HTTPS://EXAMPLE.COM/Page"),
            Some("https://example.com/Page".to_string())
        );
    }

    #[test]
    fn test_default_port_elided() {
        assert_eq!(
            canonicalize("http://example.com:80/a"),
            Some("http://example.com/a".to_string())
        );
        assert_eq!(
            canonicalize("https://example.com:443/a"),
            Some("https://example.com/a".to_string())
        );
    }

    #[test]
    fn test_non_default_port_kept() {
        assert_eq!(
            canonicalize("https://example.com:8443/a"),
            Some("https://example.com:8443/a".to_string())
        );
    }

    #[test]
    fn test_empty_path_becomes_root() {
        assert_eq!(
            canonicalize("https://example.com"),
            Some("https://example.com/".to_string())
        );
    }

    #[test]
    fn test_dot_segments_resolved() {
        assert_eq!(
            canonicalize("https://example.com/a/../b/./c"),
            Some("https://example.com/b/c".to_string())
        );
    }

    #[test]
    fn test_repeated_slashes_collapsed() {
        assert_eq!(
            canonicalize("https://example.com///a//b"),
            Some("https://example.com/a/b".to_string())
        );
    }

    #[test]
    fn test_trailing_slash_preserved() {
        assert_eq!(
            canonicalize("https://example.com/docs/"),
            Some("https://example.com/docs/".to_string())
        );
    }

    #[test]
    fn test_fragment_dropped() {
        assert_eq!(
            canonicalize("https://example.com/page#section"),
            Some("https://example.com/page".to_string())
        );
    }

    #[test]
    fn test_query_sorted_by_key() {
        assert_eq!(
            canonicalize("https://example.com/p?b=2&a=1"),
            Some("https://example.com/p?a=1&b=2".to_string())
        );
    }

    #[test]
    fn test_multi_valued_query_order_within_key() {
        assert_eq!(
            canonicalize("https://example.com/p?b=1&a=x&b=2"),
            Some("https://example.com/p?a=x&b=1&b=2".to_string())
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(canonicalize("ftp://example.com/file"), None);
        assert_eq!(canonicalize("mailto:user@example.com"), None);
        assert_eq!(canonicalize("javascript:void(0)"), None);
    }

    #[test]
    fn test_rejects_missing_host() {
        assert_eq!(canonicalize("http://"), None);
        assert_eq!(canonicalize("not a url"), None);
        assert_eq!(canonicalize(""), None);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "HTTP://Example.COM:80//a/./b/../c?z=1&a=2#frag",
            "https://example.com/",
            "https://example.com/p?b=2&a=1&b=3",
            "https://example.com/docs/",
        ];
        for input in inputs {
            let once = canonicalize(input).unwrap();
            let twice = canonicalize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }
}
