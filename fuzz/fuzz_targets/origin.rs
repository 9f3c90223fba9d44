//! Fuzz target for `Origin`/`Host` comparison.

#![no_main]

use libfuzzer_sys::fuzz_target;

use formguard_csrf::OriginValidator;

fuzz_target!(|data: (Option<String>, Option<String>)| {
    let (origin, host) = data;
    let accepted = OriginValidator::validate(origin.as_deref(), host.as_deref());

    // Acceptance requires both values
    if accepted {
        assert!(origin.as_deref().is_some_and(|o| !o.is_empty()));
        assert!(host.as_deref().is_some_and(|h| !h.is_empty()));
    }
});
