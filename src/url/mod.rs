//! URL handling
//!
//! Canonicalization, crawl-validity checks, relative resolution, and host
//! extraction. The canonical form produced here is the unique key for all
//! frontier membership checks.

mod domain;
mod normalize;

pub use domain::{extract_domain, extract_host};
pub use normalize::canonicalize;

use url::Url;

/// Resolves a possibly-relative href against a base URL and canonicalizes it
///
/// # Arguments
///
/// * `base` - The base URL (usually the page the href was found on)
/// * `href` - The absolute or relative reference
///
/// # Returns
///
/// * `Some(String)` - The canonical absolute URL
/// * `None` - The reference could not be resolved to a crawlable URL
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let base_url = Url::parse(base).ok()?;
    let joined = base_url.join(href).ok()?;
    canonicalize(joined.as_str())
}

/// Checks whether a URL is admissible for crawling
///
/// Requires an http(s) scheme and a non-empty host. When `allowed_domains`
/// is non-empty the host must contain one of the entries as a
/// case-insensitive substring; an empty list means no restriction. The path
/// must not end in any of `excluded_extensions`.
pub fn is_valid_for_crawl(url_str: &str, allowed_domains: &[String], excluded_extensions: &[String]) -> bool {
    let url = match Url::parse(url_str) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => return false,
    };

    if !allowed_domains.is_empty() {
        // Substring containment, not suffix matching: "example.com" admits
        // "www.example.com" but also "example.com.cdn.net".
        let admitted = allowed_domains
            .iter()
            .filter(|d| !d.is_empty())
            .any(|d| host.contains(&d.to_lowercase()));
        if !admitted {
            return false;
        }
    }

    let path = url.path().to_lowercase();
    if excluded_extensions
        .iter()
        .filter(|e| !e.is_empty())
        .any(|ext| path.ends_with(&ext.to_lowercase()))
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve("https://example.com/a/b", "../c"),
            Some("https://example.com/c".to_string())
        );
        assert_eq!(
            resolve("https://example.com/a/", "page"),
            Some("https://example.com/a/page".to_string())
        );
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(
            resolve("https://example.com/", "https://other.com/x"),
            Some("https://other.com/x".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert_eq!(resolve("https://example.com/", "mailto:a@b.com"), None);
    }

    #[test]
    fn test_valid_no_restrictions() {
        assert!(is_valid_for_crawl("https://anything.net/page", &[], &[]));
    }

    #[test]
    fn test_valid_requires_http_scheme() {
        assert!(!is_valid_for_crawl("ftp://example.com/file", &[], &[]));
    }

    #[test]
    fn test_allowed_domains_substring_match() {
        let allowed = strings(&["example.com"]);
        assert!(is_valid_for_crawl("https://example.com/", &allowed, &[]));
        assert!(is_valid_for_crawl("https://www.example.com/", &allowed, &[]));
        assert!(is_valid_for_crawl("https://EXAMPLE.com/x", &allowed, &[]));
        assert!(!is_valid_for_crawl("https://other.org/", &allowed, &[]));
    }

    #[test]
    fn test_excluded_extension() {
        let excluded = strings(&[".pdf", ".zip"]);
        assert!(!is_valid_for_crawl("https://example.com/doc.pdf", &[], &excluded));
        assert!(!is_valid_for_crawl("https://example.com/DOC.PDF", &[], &excluded));
        assert!(is_valid_for_crawl("https://example.com/doc.html", &[], &excluded));
    }

    #[test]
    fn test_extension_checked_on_path_not_query() {
        let excluded = strings(&[".pdf"]);
        assert!(is_valid_for_crawl(
            "https://example.com/view?file=doc.pdf",
            &[],
            &excluded
        ));
    }
}
