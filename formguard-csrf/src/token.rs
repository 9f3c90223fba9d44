use crate::crypto::SignatureAlgorithm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between the token base and its signature.
pub const TOKEN_SEPARATOR: char = '.';

/// Server-side state for one session's live token.
///
/// The public token string is never stored; validation recomputes the
/// signature from `secret` and the canonical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Random public half of the token
    pub token_base: String,

    /// Random signing key, never sent to the client
    pub secret: String,

    /// Backend that signed the token
    pub algorithm: SignatureAlgorithm,

    /// Origin the token was issued for
    pub bound_origin: Option<String>,

    /// Base of the consumed token this record replaced, if it came from a
    /// rotation
    pub rotated_from: Option<String>,

    /// Token creation timestamp
    pub created_at: DateTime<Utc>,

    /// Token expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Expired at `now`. A record is dead from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Rough heap footprint, used for store statistics.
    pub fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.token_base.capacity()
            + self.secret.capacity()
            + self.bound_origin.as_ref().map_or(0, String::capacity)
            + self.rotated_from.as_ref().map_or(0, String::capacity)
    }
}

/// A token handed to a client together with the session it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Public `base.signature` string
    pub token: String,

    /// Session handle the token is bound to
    pub session_id: String,

    /// Token expiration timestamp
    pub expires_at: DateTime<Utc>,
}

/// The message covered by a token's signature.
pub fn canonical_message(token_base: &str, session_id: &str, origin: Option<&str>) -> String {
    format!("{}:{}:{}", token_base, session_id, origin.unwrap_or(""))
}

/// Join a base and signature into the public token form.
pub fn compose(token_base: &str, signature: &str) -> String {
    format!("{}{}{}", token_base, TOKEN_SEPARATOR, signature)
}

/// Split a public token at its first separator.
///
/// Returns `None` when there is no separator or either half is empty. A
/// token with further separators still splits; everything after the first
/// one is treated as the signature.
pub fn split(token: &str) -> Option<(&str, &str)> {
    let (base, signature) = token.split_once(TOKEN_SEPARATOR)?;
    if base.is_empty() || signature.is_empty() {
        return None;
    }
    Some((base, signature))
}
