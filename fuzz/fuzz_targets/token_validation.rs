//! Fuzz target for the request gate.
//!
//! Arbitrary header values must never panic and never pass validation,
//! whether or not the session has a live token.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use formguard_csrf::{CsrfConfig, CsrfProtection, RequestInfo};

/// Arbitrary form submission.
#[derive(Debug, Arbitrary)]
struct FuzzSubmission {
    method: String,
    token_header: u8,
    token: String,
    session: String,
    origin: Option<String>,
    host: Option<String>,
    issue_first: bool,
    bind_origin: Option<String>,
}

const TOKEN_HEADERS: [&str; 3] = ["X-CSRF-Token", "CSRF-Token", "X-XSRF-Token"];

fuzz_target!(|data: FuzzSubmission| {
    let Ok(csrf) = CsrfProtection::new(CsrfConfig::default().with_max_store_size(16)) else {
        return;
    };
    let gate = csrf.middleware();

    let issued = if data.issue_first {
        csrf.issue(Some(&data.session), data.bind_origin.as_deref()).ok()
    } else {
        None
    };

    let mut request = RequestInfo::new(data.method.clone(), "/contact")
        .with_header(
            TOKEN_HEADERS[data.token_header as usize % TOKEN_HEADERS.len()],
            data.token.clone(),
        )
        .with_header("X-Session-ID", data.session.clone());
    if let Some(origin) = &data.origin {
        request = request.with_header("Origin", origin.clone());
    }
    if let Some(host) = &data.host {
        request = request.with_header("Host", host.clone());
    }

    let check = gate.check(&request);

    if !gate.needs_protection(&request) {
        assert!(check.valid);
        return;
    }

    // A fuzzer is not expected to guess the live token
    let guessed = issued.as_ref().is_some_and(|i| i.token == data.token);
    if !guessed {
        assert!(!check.valid);
        assert_eq!(check.new_headers.map(|h| h.len()), Some(0));
    }
});
