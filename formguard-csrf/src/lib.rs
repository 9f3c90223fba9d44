//! # Formguard CSRF Protection
//!
//! Session-bound, one-time-use anti-forgery tokens for form endpoints.
//!
//! ## Features
//!
//! - ✅ **Session Binding** - Tokens are signed over token base, session handle and origin
//! - ✅ **One-Time Use** - A token is consumed by its first successful validation
//! - ✅ **Rotation** - Every successful validation issues the next token
//! - ✅ **Origin Checks** - Optional origin binding plus `Origin`/`Host` agreement
//! - ✅ **Bounded Store** - Size-capped in-memory store with background sweep
//! - ✅ **Double-Submit** - Cookie helpers for the stateless pattern
//!
//! ## Quick Start
//!
//! ```rust
//! use formguard_csrf::{CsrfConfig, CsrfProtection, RequestInfo};
//!
//! let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
//! let gate = csrf.middleware();
//!
//! // Hand a token to the form page
//! let issued = gate.issue_for_request(&RequestInfo::new("GET", "/form")).unwrap();
//!
//! // The form submission echoes token and session handle
//! let submit = RequestInfo::new("POST", "/contact")
//!     .with_header("X-CSRF-Token", issued.token.clone())
//!     .with_header("X-Session-ID", issued.session_id.clone());
//!
//! let check = gate.check(&submit);
//! assert!(check.valid);
//! assert!(check.new_headers.unwrap().contains_key("X-New-CSRF-Token"));
//!
//! // Replaying the same token fails
//! let replay = gate.check(&submit);
//! assert!(!replay.valid);
//! assert_eq!(replay.error.unwrap().to_string(), "Invalid session or token expired");
//! ```
//!
//! ## Direct Validation
//!
//! ```rust
//! use formguard_csrf::{CsrfConfig, CsrfError, CsrfProtection, RequestContext};
//!
//! let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
//! let issued = csrf.issue(None, Some("https://shop.example")).unwrap();
//!
//! let elsewhere = RequestContext::new(Some("https://evil.example"), Some("evil.example"));
//! assert_eq!(
//!     csrf.validate(Some(&issued.token), Some(&issued.session_id), &elsewhere),
//!     Err(CsrfError::OriginMismatch)
//! );
//!
//! let home = RequestContext::new(Some("https://shop.example"), Some("shop.example"));
//! assert!(csrf.validate(Some(&issued.token), Some(&issued.session_id), &home).is_ok());
//! ```
//!
//! ## Background Sweep
//!
//! ```rust
//! use formguard_csrf::{CsrfConfig, CsrfProtection};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
//! assert!(csrf.start());
//! // ... serve requests ...
//! assert!(csrf.stop());
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod crypto;
pub mod double_submit;
pub mod error;
pub mod issuer;
pub mod middleware;
pub mod origin;
pub mod request;
pub mod service;
pub mod store;
pub mod token;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CsrfConfig, SameSite};
pub use crypto::{
    HmacSha256Signer, Sha256DigestSigner, SignatureAlgorithm, SigningStrategy, TokenSigner,
};
pub use double_submit::{DoubleSubmitCookie, generate_cookie_value, validate_double_submit};
pub use error::{CsrfError, Result};
pub use issuer::TokenIssuer;
pub use middleware::{CsrfCheck, CsrfMiddleware};
pub use origin::OriginValidator;
pub use request::RequestInfo;
pub use service::CsrfProtection;
pub use store::{StoreStats, TokenStore};
pub use token::{IssuedToken, TokenRecord};
pub use validator::{RequestContext, TokenValidator};
