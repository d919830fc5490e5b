//! Domain normalization and matching
//!
//! A URL matches a configured domain when its host is the domain itself or
//! one of its subdomains. Plain substring containment never matches:
//! `notexample.com` does not match `example.com`.

use url::Url;

/// Extract the normalized host from a URL or bare domain.
///
/// Accepts full URLs (`https://Sub.Example.com/path`) as well as bare
/// domains (`example.com`, `www.example.com/`). The result is lowercase,
/// without a leading `www.` or trailing dot. Returns `None` when no host can
/// be extracted.
pub fn normalize_domain(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parsed = if input.contains("://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("http://{input}")).ok()?
    };

    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Check whether `url`'s host equals `domain` or is a subdomain of it
pub fn is_matching_domain(url: &str, domain: &str) -> bool {
    let (Some(host), Some(domain)) = (normalize_domain(url), normalize_domain(domain)) else {
        return false;
    };

    host_matches(&host, &domain)
}

/// Suffix comparison on already-normalized hosts
pub fn host_matches(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_scheme_path_and_www() {
        assert_eq!(
            normalize_domain("https://www.Example.com/page?q=1"),
            Some("example.com".into())
        );
        assert_eq!(normalize_domain("example.com"), Some("example.com".into()));
        assert_eq!(normalize_domain("  news.example.com/ "), Some("news.example.com".into()));
        assert_eq!(normalize_domain("http://example.com.:8080/"), Some("example.com".into()));
    }

    #[test]
    fn normalize_rejects_hostless_input() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("about:blank"), None);
        assert_eq!(normalize_domain("data:text/plain,hello"), None);
        assert_eq!(normalize_domain("http://"), None);
    }

    #[test]
    fn matches_exact_and_subdomains() {
        assert!(is_matching_domain("https://example.com/page", "example.com"));
        assert!(is_matching_domain("https://sub.example.com", "example.com"));
        assert!(is_matching_domain("https://a.b.example.com/x", "example.com"));
        assert!(is_matching_domain("https://www.example.com", "example.com"));
        assert!(is_matching_domain("https://example.com", "www.example.com"));
    }

    #[test]
    fn does_not_match_by_substring() {
        assert!(!is_matching_domain("https://notexample.com", "example.com"));
        assert!(!is_matching_domain("https://example.com.evil.net", "example.com"));
        assert!(!is_matching_domain("https://evil.net/?r=example.com", "example.com"));
        assert!(!is_matching_domain("https://example.com", "sub.example.com"));
    }

    #[test]
    fn malformed_input_never_matches() {
        assert!(!is_matching_domain("", "example.com"));
        assert!(!is_matching_domain("https://example.com", ""));
        assert!(!is_matching_domain("not a url at all", "example.com"));
    }
}
