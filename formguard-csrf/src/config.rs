use crate::error::{CsrfError, Result};
use chrono::{Duration, Utc};

/// Smallest accepted length, in bytes, for token bases and secrets.
pub const MIN_RANDOM_BYTES: usize = 16;

/// CSRF protection configuration
///
/// All values are constructor parameters; nothing is read from the
/// environment.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// How long an issued token stays valid
    pub token_ttl: Duration,

    /// Maximum number of live token records held by the store
    pub max_store_size: usize,

    /// How often the background sweep removes expired records
    pub sweep_interval: std::time::Duration,

    /// Random bytes in the public token base
    pub token_bytes: usize,

    /// Random bytes in the server-side signing secret
    pub secret_bytes: usize,

    /// Headers carrying the token, in priority order
    pub token_headers: Vec<String>,

    /// Headers carrying the session handle, in priority order
    pub session_headers: Vec<String>,

    /// Extra session headers consulted only when handing out a token
    pub retrieval_session_headers: Vec<String>,

    /// Response header carrying the replacement token
    pub rotation_header: String,

    /// Safe HTTP methods (not checked for CSRF)
    pub safe_methods: Vec<String>,

    /// Paths to exclude from CSRF protection
    pub exclude_paths: Vec<String>,
}

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl CsrfConfig {
    /// Create a configuration with the default limits
    pub fn new() -> Self {
        Self {
            token_ttl: Duration::hours(1),
            max_store_size: 10_000,
            sweep_interval: std::time::Duration::from_secs(5 * 60),
            token_bytes: 32,
            secret_bytes: 32,
            token_headers: strings(&["X-CSRF-Token", "CSRF-Token", "X-XSRF-Token"]),
            session_headers: strings(&["X-Session-ID", "X-CSRF-Session"]),
            retrieval_session_headers: strings(&["X-Request-ID"]),
            rotation_header: "X-New-CSRF-Token".to_string(),
            safe_methods: strings(&["GET", "HEAD", "OPTIONS"]),
            exclude_paths: Vec::new(),
        }
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.token_ttl <= Duration::zero() {
            return Err(CsrfError::config("token TTL must be positive"));
        }
        if Utc::now().checked_add_signed(self.token_ttl).is_none() {
            return Err(CsrfError::config("token TTL is out of range"));
        }
        if self.max_store_size == 0 {
            return Err(CsrfError::config("store size must be at least 1"));
        }
        if self.sweep_interval.is_zero() {
            return Err(CsrfError::config("sweep interval must be positive"));
        }
        if self.token_bytes < MIN_RANDOM_BYTES || self.secret_bytes < MIN_RANDOM_BYTES {
            return Err(CsrfError::config(format!(
                "token and secret lengths must be at least {} bytes",
                MIN_RANDOM_BYTES
            )));
        }
        if self.token_headers.is_empty() || self.session_headers.is_empty() {
            return Err(CsrfError::config(
                "at least one token header and one session header are required",
            ));
        }
        if self.rotation_header.is_empty() {
            return Err(CsrfError::config("rotation header name is empty"));
        }
        Ok(())
    }

    /// Set token TTL
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set token TTL in seconds
    pub fn with_token_ttl_secs(self, ttl_seconds: i64) -> Self {
        self.with_token_ttl(Duration::seconds(ttl_seconds))
    }

    /// Set the store capacity
    pub fn with_max_store_size(mut self, max: usize) -> Self {
        self.max_store_size = max;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: std::time::Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set token base and secret lengths
    pub fn with_random_bytes(mut self, token_bytes: usize, secret_bytes: usize) -> Self {
        self.token_bytes = token_bytes;
        self.secret_bytes = secret_bytes;
        self
    }

    /// Replace the token header candidates
    pub fn with_token_headers(mut self, headers: Vec<String>) -> Self {
        self.token_headers = headers;
        self
    }

    /// Replace the session header candidates
    pub fn with_session_headers(mut self, headers: Vec<String>) -> Self {
        self.session_headers = headers;
        self
    }

    /// Replace the retrieval-only session header candidates
    pub fn with_retrieval_session_headers(mut self, headers: Vec<String>) -> Self {
        self.retrieval_session_headers = headers;
        self
    }

    /// Set rotation header name
    pub fn with_rotation_header(mut self, name: impl Into<String>) -> Self {
        self.rotation_header = name.into();
        self
    }

    /// Replace the safe methods
    pub fn with_safe_methods(mut self, methods: Vec<String>) -> Self {
        self.safe_methods = methods;
        self
    }

    /// Replace the excluded paths
    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Whether `method` bypasses validation
    pub fn is_safe_method(&self, method: &str) -> bool {
        self.safe_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Whether `path` falls under an excluded prefix
    pub fn is_excluded_path(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|excluded| path.starts_with(excluded.as_str()))
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new()
    }
}
