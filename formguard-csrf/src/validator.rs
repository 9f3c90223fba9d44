//! Token validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. token present
//! 2. session handle present
//! 3. token shape (`base.signature`)
//! 4. live record for the session, and not a replay of the token it
//!    replaced
//! 5. bound origin matches the request `Origin`
//! 6. request `Origin` agrees with `Host`
//! 7. signature, compared in constant time
//!
//! A token that passes is consumed and a replacement is issued for the same
//! session and origin.

use crate::crypto::SigningStrategy;
use crate::error::{CsrfError, Result};
use crate::issuer::TokenIssuer;
use crate::origin::OriginValidator;
use crate::store::TokenStore;
use crate::token::{IssuedToken, canonical_message, split};
use std::sync::Arc;
use tracing::{debug, warn};

/// Request data the validator needs, passed in explicitly by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext<'a> {
    /// Value of the `Origin` header
    pub origin: Option<&'a str>,
    /// Value of the `Host` header
    pub host: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn new(origin: Option<&'a str>, host: Option<&'a str>) -> Self {
        Self { origin, host }
    }

    pub fn with_origin(mut self, origin: &'a str) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }
}

/// Validates and consumes tokens
#[derive(Debug, Clone)]
pub struct TokenValidator {
    store: Arc<TokenStore>,
    signing: SigningStrategy,
    issuer: TokenIssuer,
}

impl TokenValidator {
    pub fn new(store: Arc<TokenStore>, signing: SigningStrategy, issuer: TokenIssuer) -> Self {
        Self {
            store,
            signing,
            issuer,
        }
    }

    /// Validate `token` for `session_id`, returning the replacement token.
    pub fn validate(
        &self,
        token: Option<&str>,
        session_id: Option<&str>,
        context: &RequestContext<'_>,
    ) -> Result<IssuedToken> {
        let result = self.check_and_consume(token, session_id, context);
        if let Err(ref e) = result {
            warn!(
                session = session_id.unwrap_or(""),
                reason = %e,
                "CSRF token rejected"
            );
        }
        result
    }

    fn check_and_consume(
        &self,
        token: Option<&str>,
        session_id: Option<&str>,
        context: &RequestContext<'_>,
    ) -> Result<IssuedToken> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(CsrfError::MissingToken)?;
        let session_id = session_id
            .filter(|s| !s.is_empty())
            .ok_or(CsrfError::MissingSession)?;
        let (token_base, signature) = split(token).ok_or(CsrfError::MalformedToken)?;

        let record = self
            .store
            .get(session_id)
            .ok_or(CsrfError::InvalidSession)?;

        if record.rotated_from.as_deref() == Some(token_base) {
            return Err(CsrfError::InvalidSession);
        }

        // An empty `Origin` header is the same as none
        let origin = context.origin.filter(|o| !o.is_empty());

        if let Some(bound) = record.bound_origin.as_deref() {
            if origin != Some(bound) {
                return Err(CsrfError::OriginMismatch);
            }
        }

        if let Some(origin) = origin {
            if !OriginValidator::validate(Some(origin), context.host) {
                return Err(CsrfError::InvalidOrigin);
            }
        }

        let message = canonical_message(token_base, session_id, record.bound_origin.as_deref());
        if !self.signing.verify(
            record.algorithm,
            record.secret.as_bytes(),
            &message,
            signature,
        ) {
            return Err(CsrfError::InvalidSignature);
        }

        // Losing a race with a concurrent request for the same token lands here.
        let consumed = self
            .store
            .take(session_id, &record.token_base)
            .ok_or(CsrfError::InvalidSession)?;

        debug!(session = %session_id, "Consumed CSRF token");

        self.issuer
            .rotate(session_id, consumed.bound_origin.as_deref(), consumed.token_base)
    }
}
