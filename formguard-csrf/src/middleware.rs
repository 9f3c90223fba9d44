use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use crate::issuer::TokenIssuer;
use crate::request::RequestInfo;
use crate::token::IssuedToken;
use crate::validator::{RequestContext, TokenValidator};
use http::StatusCode;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Outcome of checking one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfCheck {
    pub valid: bool,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<CsrfError>,

    /// Headers to merge into the response.
    ///
    /// `None` when the request bypassed validation, an empty map when it
    /// failed, the rotation header when it passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_headers: Option<HashMap<String, String>>,
}

fn serialize_error<S: Serializer>(
    error: &Option<CsrfError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl CsrfCheck {
    /// Request did not need protection
    pub fn bypassed() -> Self {
        Self {
            valid: true,
            error: None,
            new_headers: None,
        }
    }

    fn passed(headers: HashMap<String, String>) -> Self {
        Self {
            valid: true,
            error: None,
            new_headers: Some(headers),
        }
    }

    fn rejected(error: CsrfError) -> Self {
        Self {
            valid: false,
            error: Some(error),
            new_headers: Some(HashMap::new()),
        }
    }

    /// Status code a handler should answer a rejected request with
    pub fn status_code(&self) -> StatusCode {
        if self.valid {
            StatusCode::OK
        } else {
            StatusCode::FORBIDDEN
        }
    }
}

/// Request gate: decides which requests need a token, pulls token and
/// session from headers, and packages the validator's verdict.
#[derive(Debug, Clone)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl CsrfMiddleware {
    /// Create new CSRF middleware
    pub fn new(config: Arc<CsrfConfig>, issuer: TokenIssuer, validator: TokenValidator) -> Self {
        Self {
            config,
            issuer,
            validator,
        }
    }

    /// Check if request needs CSRF protection
    pub fn needs_protection(&self, request: &RequestInfo) -> bool {
        !self.config.is_safe_method(&request.method) && !self.config.is_excluded_path(&request.path)
    }

    /// Validate the request, rotating its token on success
    pub fn check(&self, request: &RequestInfo) -> CsrfCheck {
        if !self.needs_protection(request) {
            trace!(method = %request.method, path = %request.path, "CSRF check bypassed");
            return CsrfCheck::bypassed();
        }

        let token = request.first_header(self.config.token_headers.as_slice());
        let session_id = request.first_header(self.config.session_headers.as_slice());
        let context = RequestContext::new(request.origin(), request.host());

        match self.validator.validate(token, session_id, &context) {
            Ok(next) => {
                let mut headers = HashMap::new();
                headers.insert(self.config.rotation_header.clone(), next.token);
                CsrfCheck::passed(headers)
            }
            Err(e) => CsrfCheck::rejected(e),
        }
    }

    /// Hand out a token for the request's session.
    ///
    /// Besides the validation session headers, the retrieval-only headers
    /// (a request tracing id by default) are consulted as a last resort.
    /// A fresh session handle is generated when none is found. The token is
    /// bound to the request's `Origin` when one is present.
    pub fn issue_for_request(&self, request: &RequestInfo) -> Result<IssuedToken> {
        let session_id = request
            .first_header(self.config.session_headers.as_slice())
            .or_else(|| request.first_header(self.config.retrieval_session_headers.as_slice()));

        self.issuer.issue(session_id, request.origin())
    }

    /// Response headers delivering `issued` to the client
    pub fn token_headers(&self, issued: &IssuedToken) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(2);
        if let Some(name) = self.config.token_headers.first() {
            headers.push((name.clone(), issued.token.clone()));
        }
        if let Some(name) = self.config.session_headers.first() {
            headers.push((name.clone(), issued.session_id.clone()));
        }
        headers
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }
}
