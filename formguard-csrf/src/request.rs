//! Minimal view of an inbound request
//!
//! The gate only needs the method, the path and a few headers. Framework
//! requests are converted into [`RequestInfo`] at the boundary; a conversion
//! from [`http::Request`] is provided.

/// Information about an incoming request used for CSRF checks
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// Request method (GET, POST, etc.)
    pub method: String,
    /// Request path
    pub path: String,
    /// Request headers, names as received
    pub headers: Vec<(String, String)>,
}

impl RequestInfo {
    /// Create a new request info
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value among `names`, in order
    pub fn first_header<S: AsRef<str>>(&self, names: &[S]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.get_header(name.as_ref()))
            .find(|value| !value.is_empty())
    }

    /// `Origin` header
    pub fn origin(&self) -> Option<&str> {
        self.get_header("Origin").filter(|o| !o.is_empty())
    }

    /// `Host` header
    pub fn host(&self) -> Option<&str> {
        self.get_header("Host")
    }
}

impl<B> From<&http::Request<B>> for RequestInfo {
    fn from(request: &http::Request<B>) -> Self {
        let headers = request
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            method: request.method().as_str().to_string(),
            path: request.uri().path().to_string(),
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = RequestInfo::new("POST", "/contact").with_header("x-csrf-token", "abc");
        assert_eq!(request.get_header("X-CSRF-Token"), Some("abc"));
        assert_eq!(request.get_header("X-XSRF-Token"), None);
    }

    #[test]
    fn test_first_header_priority() {
        let request = RequestInfo::new("POST", "/contact")
            .with_header("X-XSRF-Token", "third")
            .with_header("CSRF-Token", "second");
        let names = ["X-CSRF-Token", "CSRF-Token", "X-XSRF-Token"];
        assert_eq!(request.first_header(&names), Some("second"));

        let request = request.with_header("X-CSRF-Token", "first");
        assert_eq!(request.first_header(&names), Some("first"));
    }

    #[test]
    fn test_first_header_skips_empty_values() {
        let request = RequestInfo::new("POST", "/")
            .with_header("X-Session-ID", "")
            .with_header("X-CSRF-Session", "s1");
        assert_eq!(request.first_header(&["X-Session-ID", "X-CSRF-Session"]), Some("s1"));
    }

    #[test]
    fn test_empty_origin_is_absent() {
        let request = RequestInfo::new("POST", "/").with_header("Origin", "");
        assert_eq!(request.origin(), None);
        assert_eq!(request.get_header("Origin"), Some(""));
    }

    #[test]
    fn test_from_http_request() {
        let request = http::Request::builder()
            .method("POST")
            .uri("https://example.com/api/contact?x=1")
            .header("Origin", "https://example.com")
            .header("Host", "example.com")
            .body(())
            .unwrap();

        let info = RequestInfo::from(&request);
        assert_eq!(info.method, "POST");
        assert_eq!(info.path, "/api/contact");
        assert_eq!(info.origin(), Some("https://example.com"));
        assert_eq!(info.host(), Some("example.com"));
    }
}
