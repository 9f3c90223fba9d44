//! `Origin` vs `Host` checking.

use url::Url;

/// Checks that a request's `Origin` names the host it was sent to.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginValidator;

impl OriginValidator {
    /// Accept when `origin` is `https://{host}` or `http://{host}`, or when the
    /// origin's hostname equals `host` verbatim.
    ///
    /// Plain `http` is accepted for local development over non-TLS.
    /// Subdomains, other schemes and a missing host are rejected.
    pub fn validate(origin: Option<&str>, host: Option<&str>) -> bool {
        let (Some(origin), Some(host)) = (origin, host) else {
            return false;
        };
        if origin.is_empty() || host.is_empty() {
            return false;
        }

        if origin == format!("https://{}", host) || origin == format!("http://{}", host) {
            return true;
        }

        Url::parse(origin)
            .ok()
            .and_then(|url| url.host_str().map(|h| h == host))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_scheme_matches() {
        assert!(OriginValidator::validate(Some("https://example.com"), Some("example.com")));
        assert!(OriginValidator::validate(Some("http://example.com"), Some("example.com")));
        assert!(OriginValidator::validate(
            Some("http://localhost:3000"),
            Some("localhost:3000")
        ));
    }

    #[test]
    fn test_hostname_component_match() {
        // Host header without the port still matches the origin's hostname
        assert!(OriginValidator::validate(Some("https://example.com:8443"), Some("example.com")));
    }

    #[test]
    fn test_rejections() {
        assert!(!OriginValidator::validate(Some("https://evil.com"), Some("example.com")));
        assert!(!OriginValidator::validate(
            Some("https://sub.example.com"),
            Some("example.com")
        ));
        assert!(!OriginValidator::validate(Some("ftp://example.org"), Some("example.com")));
        assert!(!OriginValidator::validate(Some("not a url"), Some("example.com")));
        assert!(!OriginValidator::validate(Some("https://example.com"), None));
        assert!(!OriginValidator::validate(None, Some("example.com")));
        assert!(!OriginValidator::validate(Some(""), Some("")));
    }
}
