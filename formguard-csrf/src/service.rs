//! Service object wiring store, issuer, validator and gate together.

use crate::clock::{Clock, SystemClock};
use crate::config::CsrfConfig;
use crate::crypto::SigningStrategy;
use crate::error::Result;
use crate::issuer::TokenIssuer;
use crate::middleware::CsrfMiddleware;
use crate::store::{StoreStats, TokenStore};
use crate::token::IssuedToken;
use crate::validator::{RequestContext, TokenValidator};
use std::sync::Arc;
use tracing::info;

/// CSRF protection service
///
/// Each instance owns an isolated token store. The background sweep is not
/// started implicitly; call [`CsrfProtection::start`] from within a tokio
/// runtime and [`CsrfProtection::stop`] on shutdown.
#[derive(Debug, Clone)]
pub struct CsrfProtection {
    config: Arc<CsrfConfig>,
    store: Arc<TokenStore>,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl CsrfProtection {
    /// Create a service using the wall clock and the default signers
    pub fn new(config: CsrfConfig) -> Result<Self> {
        Self::with_parts(config, Arc::new(SystemClock), SigningStrategy::new())
    }

    /// Create a service with an explicit clock
    pub fn with_clock(config: CsrfConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_parts(config, clock, SigningStrategy::new())
    }

    /// Create a service with an explicit clock and signing strategy
    pub fn with_parts(
        config: CsrfConfig,
        clock: Arc<dyn Clock>,
        signing: SigningStrategy,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(TokenStore::with_clock(&config, clock.clone()));
        let issuer = TokenIssuer::new(&config, store.clone(), signing.clone(), clock);
        let validator = TokenValidator::new(store.clone(), signing, issuer.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            issuer,
            validator,
        })
    }

    /// Issue a token, see [`TokenIssuer::issue`]
    pub fn issue(&self, session_id: Option<&str>, origin: Option<&str>) -> Result<IssuedToken> {
        self.issuer.issue(session_id, origin)
    }

    /// Validate and consume a token, see [`TokenValidator::validate`]
    pub fn validate(
        &self,
        token: Option<&str>,
        session_id: Option<&str>,
        context: &RequestContext<'_>,
    ) -> Result<IssuedToken> {
        self.validator.validate(token, session_id, context)
    }

    /// Request gate sharing this service's store
    pub fn middleware(&self) -> CsrfMiddleware {
        CsrfMiddleware::new(
            self.config.clone(),
            self.issuer.clone(),
            self.validator.clone(),
        )
    }

    /// Start the background sweep
    pub fn start(&self) -> bool {
        let started = self.store.start();
        if started {
            info!(
                max_size = self.config.max_store_size,
                token_ttl_secs = self.config.token_ttl.num_seconds(),
                "CSRF protection started"
            );
        }
        started
    }

    /// Stop the background sweep
    pub fn stop(&self) -> bool {
        let stopped = self.store.stop();
        if stopped {
            info!("CSRF protection stopped");
        }
        stopped
    }

    /// Drop the token for one session
    pub fn revoke(&self, session_id: &str) -> bool {
        self.store.delete(session_id)
    }

    /// Drop every token
    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }
}
