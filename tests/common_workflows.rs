//! Integration tests for common Formguard workflows.
//!
//! These tests walk a contact form through token retrieval, submission and
//! resubmission the way a handler would.

use formguard::ManualClock;
use formguard::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Helpers
// =============================================================================

/// Route engine logs to the test harness output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Merge the gate's headers into a response header map, as a handler would.
fn merge(response: &mut HashMap<String, String>, check: &CsrfCheck) {
    if let Some(headers) = &check.new_headers {
        response.extend(headers.clone());
    }
}

fn form_page(gate: &CsrfMiddleware, origin: &str) -> IssuedToken {
    let request = RequestInfo::new("GET", "/contact")
        .with_header("Origin", origin)
        .with_header("X-Request-ID", "req-1");
    gate.issue_for_request(&request).unwrap()
}

fn submission(token: &str, session_id: &str, origin: &str, host: &str) -> RequestInfo {
    RequestInfo::new("POST", "/api/contact")
        .with_header("X-CSRF-Token", token)
        .with_header("X-Session-ID", session_id)
        .with_header("Origin", origin)
        .with_header("Host", host)
}

// =============================================================================
// Contact Form Workflows
// =============================================================================

#[test]
fn test_contact_form_round_trip() {
    init_tracing();
    let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
    let gate = csrf.middleware();

    let issued = form_page(&gate, "https://example.com");
    assert_eq!(issued.session_id, "req-1");

    let response_headers = gate.token_headers(&issued);
    assert_eq!(response_headers.len(), 2);

    let check = gate.check(&submission(
        &issued.token,
        &issued.session_id,
        "https://example.com",
        "example.com",
    ));
    assert!(check.valid);
    assert_eq!(check.status_code().as_u16(), 200);

    let mut response = HashMap::new();
    merge(&mut response, &check);
    let next = response.get("X-New-CSRF-Token").cloned().unwrap();

    // Second submission uses the rotated token
    let again = gate.check(&submission(
        &next,
        &issued.session_id,
        "https://example.com",
        "example.com",
    ));
    assert!(again.valid);
}

#[test]
fn test_replayed_submission_rejected() {
    init_tracing();
    let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
    let gate = csrf.middleware();
    let issued = form_page(&gate, "https://example.com");
    let request = submission(
        &issued.token,
        &issued.session_id,
        "https://example.com",
        "example.com",
    );

    assert!(gate.check(&request).valid);

    let replay = gate.check(&request);
    assert!(!replay.valid);
    assert_eq!(replay.error, Some(CsrfError::InvalidSession));
    assert_eq!(replay.status_code().as_u16(), 403);

    // Failure headers are always safe to merge
    let mut response = HashMap::new();
    merge(&mut response, &replay);
    assert!(response.is_empty());
}

#[test]
fn test_cross_site_submission_rejected() {
    let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
    let gate = csrf.middleware();
    let issued = form_page(&gate, "https://example.com");

    let check = gate.check(&submission(
        &issued.token,
        &issued.session_id,
        "https://attacker.example",
        "attacker.example",
    ));
    assert!(!check.valid);
    assert_eq!(check.error, Some(CsrfError::OriginMismatch));
}

#[test]
fn test_read_requests_pass_untouched() {
    let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
    let gate = csrf.middleware();

    let check = gate.check(&RequestInfo::new("GET", "/api/contact"));
    assert!(check.valid);
    assert!(check.new_headers.is_none());
    assert_eq!(csrf.stats().size, 0);

    let json = serde_json::to_string(&check).unwrap();
    assert_eq!(json, r#"{"valid":true}"#);
}

#[test]
fn test_expired_form_rejected() {
    let clock = Arc::new(ManualClock::starting_now());
    let config = CsrfConfig::default().with_token_ttl_secs(600);
    let csrf = CsrfProtection::with_clock(config, clock.clone()).unwrap();
    let gate = csrf.middleware();
    let issued = form_page(&gate, "https://example.com");

    clock.advance(chrono::Duration::seconds(600));
    let check = gate.check(&submission(
        &issued.token,
        &issued.session_id,
        "https://example.com",
        "example.com",
    ));
    assert_eq!(check.error, Some(CsrfError::InvalidSession));
}

#[test]
fn test_http_handler_round_trip() {
    init_tracing();
    let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
    let gate = csrf.middleware();

    let page = http::Request::builder()
        .method(http::Method::GET)
        .uri("/contact")
        .header(http::header::ORIGIN, "https://example.com")
        .body(())
        .unwrap();
    let issued = gate.issue_for_request(&RequestInfo::from(&page)).unwrap();

    let mut page_response = http::Response::builder().status(http::StatusCode::OK);
    for (name, value) in gate.token_headers(&issued) {
        page_response = page_response.header(name, value);
    }
    let page_response = page_response.body(()).unwrap();
    let token = page_response.headers()["X-CSRF-Token"].to_str().unwrap();
    let session = page_response.headers()["X-Session-ID"].to_str().unwrap();

    let submit = http::Request::builder()
        .method(http::Method::POST)
        .uri("/api/contact")
        .header(http::header::ORIGIN, "https://example.com")
        .header(http::header::HOST, "example.com")
        .header("X-CSRF-Token", token)
        .header("X-Session-ID", session)
        .body(())
        .unwrap();
    let check = gate.check(&RequestInfo::from(&submit));
    assert_eq!(check.status_code(), http::StatusCode::OK);

    // The same request sent again is refused
    let replay = gate.check(&RequestInfo::from(&submit));
    assert_eq!(replay.status_code(), http::StatusCode::FORBIDDEN);
}

#[test]
fn test_blank_origin_treated_as_missing() {
    let csrf = CsrfProtection::new(CsrfConfig::default()).unwrap();
    let gate = csrf.middleware();
    let issued = csrf.issue(None, None).unwrap();

    let check = gate.check(
        &RequestInfo::new("POST", "/api/contact")
            .with_header("X-CSRF-Token", issued.token.clone())
            .with_header("X-Session-ID", issued.session_id.clone())
            .with_header("Origin", ""),
    );
    assert!(check.valid);
}

// =============================================================================
// Double-Submit Workflow
// =============================================================================

#[test]
fn test_double_submit_cookie_flow() {
    let cookie = DoubleSubmitCookie::default().with_same_site(formguard::SameSite::Lax);
    let value = generate_cookie_value();

    let set_cookie = cookie.set_cookie_header(&value);
    assert!(set_cookie.starts_with(&format!("csrf_token={}", value)));

    let request = RequestInfo::new("POST", "/api/contact")
        .with_header("Cookie", format!("csrf_token={}", value))
        .with_header("X-CSRF-Token", value.clone());
    assert!(cookie.validate_request(&request));
    assert!(validate_double_submit(&value, &value));
    assert!(!validate_double_submit(&value, "forged"));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_background_sweep_frees_expired_tokens() {
    let clock = Arc::new(ManualClock::starting_now());
    let config = CsrfConfig::default()
        .with_token_ttl_secs(60)
        .with_sweep_interval(Duration::from_secs(30));
    let csrf = CsrfProtection::with_clock(config, clock.clone()).unwrap();

    for _ in 0..10 {
        csrf.issue(None, None).unwrap();
    }
    assert_eq!(csrf.stats().size, 10);

    assert!(csrf.start());
    clock.advance(chrono::Duration::seconds(61));
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(csrf.stats().size, 0);
    assert!(csrf.stop());
}
