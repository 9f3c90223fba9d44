use crate::clock::Clock;
use crate::config::CsrfConfig;
use crate::crypto::{SigningStrategy, random_hex, random_string};
use crate::error::{CsrfError, Result};
use crate::store::TokenStore;
use crate::token::{IssuedToken, TokenRecord, canonical_message, compose};
use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

/// Random bytes in the suffix of a generated session handle
const SESSION_RANDOM_BYTES: usize = 16;

/// Mints tokens and records them in the store
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    store: Arc<TokenStore>,
    signing: SigningStrategy,
    clock: Arc<dyn Clock>,
    token_ttl: Duration,
    token_bytes: usize,
    secret_bytes: usize,
}

impl TokenIssuer {
    pub fn new(
        config: &CsrfConfig,
        store: Arc<TokenStore>,
        signing: SigningStrategy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            signing,
            clock,
            token_ttl: config.token_ttl,
            token_bytes: config.token_bytes,
            secret_bytes: config.secret_bytes,
        }
    }

    /// Issue a token for `session_id`, generating a handle when none is given.
    ///
    /// When `origin` is given the token only validates for requests carrying
    /// that exact `Origin`. Any previous token for the session is replaced.
    pub fn issue(&self, session_id: Option<&str>, origin: Option<&str>) -> Result<IssuedToken> {
        self.mint(session_id, origin, None)
    }

    /// Issue the replacement for a just-consumed token, remembering its base
    /// so a replay of it is reported as consumed.
    pub(crate) fn rotate(
        &self,
        session_id: &str,
        origin: Option<&str>,
        consumed_base: String,
    ) -> Result<IssuedToken> {
        self.mint(Some(session_id), origin, Some(consumed_base))
    }

    fn mint(
        &self,
        session_id: Option<&str>,
        origin: Option<&str>,
        rotated_from: Option<String>,
    ) -> Result<IssuedToken> {
        let session_id = match session_id.filter(|s| !s.is_empty()) {
            Some(existing) => existing.to_string(),
            None => self.generate_session_id(),
        };
        let origin = origin.filter(|o| !o.is_empty());

        let secret = random_string(self.secret_bytes);
        let token_base = random_string(self.token_bytes);
        let message = canonical_message(&token_base, &session_id, origin);
        let signature = self.signing.sign(secret.as_bytes(), &message)?;

        let token = compose(&token_base, &signature.value);
        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| CsrfError::config("token TTL is out of range"))?;

        self.store.set(
            session_id.clone(),
            TokenRecord {
                token_base,
                secret,
                algorithm: signature.algorithm,
                bound_origin: origin.map(str::to_string),
                rotated_from,
                created_at,
                expires_at,
            },
        );

        debug!(
            session = %session_id,
            algorithm = %signature.algorithm,
            origin_bound = origin.is_some(),
            "Issued CSRF token"
        );

        Ok(IssuedToken {
            token,
            session_id,
            expires_at,
        })
    }

    /// A new session handle: base36 milliseconds, `-`, then random hex.
    ///
    /// The timestamp only aids debugging; uniqueness comes from the random
    /// suffix.
    pub fn generate_session_id(&self) -> String {
        let millis = self.clock.now().timestamp_millis().max(0) as u64;
        format!(
            "{}-{}",
            to_base36(millis),
            random_hex(SESSION_RANDOM_BYTES)
        )
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
