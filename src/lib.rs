// Formguard - anti-forgery tokens for web form endpoints
//
// This library issues session-bound, origin-aware, one-time-use CSRF tokens
// and validates them at a request gate that rotates the token on success.

// Re-export core functionality
pub use formguard_csrf::*;

// Re-export the crate itself for path-qualified access
pub use formguard_csrf;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CsrfCheck,
        CsrfConfig,
        CsrfError,
        CsrfMiddleware,
        CsrfProtection,
        // Double-submit helpers
        DoubleSubmitCookie,
        IssuedToken,
        RequestContext,
        RequestInfo,
        generate_cookie_value,
        validate_double_submit,
    };
}
