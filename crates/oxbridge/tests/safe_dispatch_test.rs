//! Behavior under the `safe-dispatch` feature.

#![cfg(all(
    feature = "safe-dispatch",
    any(not(target_vendor = "apple"), feature = "host-runtime")
))]

mod common;

use common::{calls, create_counter_class, create_instance};
use oxbridge::{SAFE_DISPATCH, Sel, msg_send, send};

#[test]
fn test_feature_is_reported() {
    assert!(SAFE_DISPATCH);
}

#[test]
fn test_implemented_selector_passes_check() {
    let cls = create_counter_class("SafeHit");
    let obj = create_instance(cls);
    let before = calls();
    // SAFETY: count returns usize.
    let n: usize = unsafe { msg_send![&obj, count] };
    assert_eq!(n, 0);
    assert_eq!(calls(), before + 1);
}

#[test]
fn test_null_receiver_skips_check() {
    let null: *mut oxbridge::AnyObject = std::ptr::null_mut();
    let missing = Sel::register("safeMissingOnNull").unwrap();
    // SAFETY: Null receivers are always accepted.
    let n: usize = unsafe { send(null, missing, ()) };
    assert_eq!(n, 0);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "safe dispatch")]
fn test_missing_selector_is_fatal_in_debug() {
    let cls = create_counter_class("SafeMiss");
    let obj = create_instance(cls);
    let before = calls();
    let missing = Sel::register("safeMissingMethod").unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        // SAFETY: The check fails before any call is made.
        let _: usize = unsafe { send(&obj, missing, ()) };
    }));
    assert_eq!(calls(), before);
    if let Err(payload) = result {
        std::panic::resume_unwind(payload);
    }
}
