//! Double-submit cookie helpers.
//!
//! Independent of the session-bound tokens: the server sets a random cookie
//! and the client echoes it in a header or form field. Both values are
//! visible to the client, so a plain equality check is enough.

use crate::config::SameSite;
use crate::crypto::random_string;
use crate::request::RequestInfo;

/// Random bytes in a generated cookie value
pub const COOKIE_VALUE_BYTES: usize = 32;

/// Fresh random cookie value
pub fn generate_cookie_value() -> String {
    random_string(COOKIE_VALUE_BYTES)
}

/// Exact string equality of the cookie and the submitted copy
pub fn validate_double_submit(cookie_value: &str, submitted_value: &str) -> bool {
    cookie_value == submitted_value
}

/// Cookie settings for the double-submit pattern
#[derive(Debug, Clone)]
pub struct DoubleSubmitCookie {
    /// Cookie name
    pub name: String,

    /// Header carrying the echoed value
    pub header_name: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Cookie path
    pub path: String,

    /// Cookie secure flag (HTTPS only)
    pub secure: bool,

    /// Cookie HttpOnly flag. Off by default: client script must read the
    /// cookie to echo it.
    pub http_only: bool,

    /// Cookie SameSite policy
    pub same_site: SameSite,
}

impl Default for DoubleSubmitCookie {
    fn default() -> Self {
        Self {
            name: "csrf_token".to_string(),
            header_name: "X-CSRF-Token".to_string(),
            domain: None,
            path: "/".to_string(),
            secure: true,
            http_only: false,
            same_site: SameSite::Strict,
        }
    }
}

impl DoubleSubmitCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set cookie path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set cookie secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set cookie HttpOnly flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set cookie SameSite policy
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// `Set-Cookie` header value carrying `value`
    pub fn set_cookie_header(&self, value: &str) -> String {
        let mut cookie = format!("{}={}; Path={}", self.name, value, self.path);

        if let Some(ref domain) = self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        cookie
    }

    /// Value of this cookie in a request's `Cookie` header
    pub fn cookie_value<'a>(&self, request: &'a RequestInfo) -> Option<&'a str> {
        request
            .get_header("Cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value)
    }

    /// Whether the request echoes the cookie in the configured header.
    ///
    /// A request missing either copy fails.
    pub fn validate_request(&self, request: &RequestInfo) -> bool {
        match (self.cookie_value(request), request.get_header(&self.header_name)) {
            (Some(cookie), Some(header)) => validate_double_submit(cookie, header),
            _ => false,
        }
    }
}
