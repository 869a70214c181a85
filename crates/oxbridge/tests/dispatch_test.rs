//! Message sending: typed calls, null receivers, the checked guard and
//! identifier caching under concurrency.

#![cfg(any(not(target_vendor = "apple"), feature = "host-runtime"))]

mod common;

use common::{Rect, calls, create_counter_class, create_instance};
use oxbridge::cache::{self, IdentifierCache};
use oxbridge::{AnyClass, AnyObject, Sel, msg_send, perform_checked, send, send_checked, sel};
use std::sync::Arc;
use std::thread;

// ============================================================================
// Typed Sends
// ============================================================================

#[test]
fn test_send_integer_arguments() {
    let cls = create_counter_class("DispatchAdd");
    let obj = create_instance(cls);
    // SAFETY: add:to: is (i64, i64) -> i64.
    let sum: i64 = unsafe { msg_send![&obj, add: 40i64, to: 2i64] };
    assert_eq!(sum, 42);
}

#[test]
fn test_send_float_return() {
    let cls = create_counter_class("DispatchFloat");
    let obj = create_instance(cls);
    // SAFETY: scaledBy: is f64 -> f64.
    let value: f64 = unsafe { msg_send![&obj, scaledBy: 2.0f64] };
    assert_eq!(value, 3.0);
}

#[test]
fn test_send_large_struct_return() {
    let cls = create_counter_class("DispatchFrame");
    let obj = create_instance(cls);
    // SAFETY: frame returns a Rect by value.
    let rect: Rect = unsafe { send(&obj, sel!(frame), ()) };
    assert_eq!(rect, Rect { x: 1.0, y: 2.0, width: 30.0, height: 40.0 });

    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    assert_eq!(
        <Rect as oxbridge::encode::EncodeReturn>::VARIANT,
        oxbridge::variant::Variant::LargeStructReturn
    );
}

#[test]
fn test_send_void_return() {
    let cls = create_counter_class("DispatchVoid");
    let obj = create_instance(cls);
    let before = calls();
    // SAFETY: touch takes and returns nothing.
    unsafe { msg_send![&obj, touch] }
    assert_eq!(calls(), before + 1);
}

#[test]
fn test_send_class_method() {
    let cls = create_counter_class("DispatchClassMethod");
    // SAFETY: +tag returns u32.
    let tag: u32 = unsafe { msg_send![cls, tag] };
    assert_eq!(tag, 7);
}

#[test]
fn test_inherited_root_methods() {
    let cls = create_counter_class("DispatchInherited");
    let obj = create_instance(cls);
    // SAFETY: Root methods with their real signatures.
    unsafe {
        let this: *mut AnyObject = msg_send![&obj, self];
        assert_eq!(this, obj.as_ptr());

        let class: *const AnyClass = msg_send![&obj, class];
        assert!(std::ptr::eq(class, cls));

        let responds: bool = msg_send![&obj, respondsToSelector: sel!(frame)];
        assert!(responds);

        let hash: usize = msg_send![&obj, hash];
        assert_eq!(hash, obj.as_ptr() as usize);
    }
}

// ============================================================================
// Null Receivers
// ============================================================================

#[test]
fn test_null_receiver_returns_zero_without_calling() {
    let null: *mut AnyObject = std::ptr::null_mut();
    let before = calls();
    // SAFETY: Null receivers are always accepted.
    unsafe {
        let n: usize = msg_send![null, count];
        let sum: i64 = msg_send![null, add: 1i64, to: 2i64];
        let value: f64 = msg_send![null, scaledBy: 2.0f64];
        let rect: Rect = msg_send![null, frame];
        let obj: *mut AnyObject = msg_send![null, copy];
        let () = msg_send![null, touch];

        assert_eq!(n, 0);
        assert_eq!(sum, 0);
        assert_eq!(value, 0.0);
        assert_eq!(rect, Rect::default());
        assert!(obj.is_null());
    }
    assert_eq!(calls(), before);
}

// ============================================================================
// Checked Guard
// ============================================================================

#[test]
fn test_guard_calls_implemented_selector() {
    let cls = create_counter_class("GuardHit");
    let obj = create_instance(cls);
    let before = calls();
    // SAFETY: count returns usize.
    let n: Option<usize> = unsafe { send_checked(&obj, sel!(count), ()) };
    assert_eq!(n, Some(0));
    assert_eq!(calls(), before + 1);
    // SAFETY: touch returns nothing.
    assert!(unsafe { perform_checked(&obj, sel!(touch), ()) });
    assert_eq!(calls(), before + 2);
}

#[test]
fn test_guard_skips_missing_selector() {
    let cls = create_counter_class("GuardMiss");
    let obj = create_instance(cls);
    let missing = Sel::register("guardMissingMethod:").unwrap();
    let before = calls();
    // SAFETY: The method does not exist; nothing is called.
    unsafe {
        let result: Option<usize> = send_checked(&obj, missing, (1u32,));
        assert_eq!(result, None);
        assert!(!perform_checked(&obj, missing, (1u32,)));
    }
    assert_eq!(calls(), before);
}

#[test]
fn test_guard_on_null_receiver() {
    let null: Option<&AnyObject> = None;
    // SAFETY: Null receivers are always accepted.
    let result: Option<usize> = unsafe { send_checked(null, sel!(count), ()) };
    assert_eq!(result, None);
}

#[test]
fn test_guard_distinguishes_class_and_instance_methods() {
    let cls = create_counter_class("GuardMeta");
    let obj = create_instance(cls);
    // SAFETY: Signatures match where implemented.
    unsafe {
        let tag: Option<u32> = send_checked(cls, sel!(tag), ());
        assert_eq!(tag, Some(7));
        let tag: Option<u32> = send_checked(&obj, sel!(tag), ());
        assert_eq!(tag, None);
        let n: Option<usize> = send_checked(cls, sel!(count), ());
        assert_eq!(n, None);
    }
}

#[test]
#[should_panic(expected = "unrecognized selector")]
fn test_unchecked_missing_selector_panics_on_host() {
    let cls = create_counter_class("UncheckedMiss");
    let obj = create_instance(cls);
    // SAFETY: The host runtime panics before any call is made.
    let _: usize = unsafe { send(&obj, Sel::register("definitelyMissing").unwrap(), ()) };
}

// ============================================================================
// Identifier Caching
// ============================================================================

#[test]
fn test_resolve_twice_gives_same_token() {
    let a = cache::resolve("dispatchResolveTwice").unwrap();
    let b = cache::resolve("dispatchResolveTwice").unwrap();
    assert_eq!(a, b);
    assert_eq!(a, Sel::register("dispatchResolveTwice").unwrap());
}

#[test]
fn test_resolve_class_unknown_is_none() {
    assert!(cache::resolve_class("DispatchNoSuchClass").is_none());
    let cls = create_counter_class("DispatchResolveClass");
    assert_eq!(cache::resolve_class(cls.name()), Some(cls));
}

#[test]
fn test_concurrent_first_resolution_converges() {
    let table = Arc::new(IdentifierCache::new());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let sel = table.resolve("dispatchRace:with:").unwrap();
                let cls = table.resolve_class("NSObject").unwrap();
                (i, sel, cls as *const AnyClass as usize)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let (_, first_sel, first_cls) = results[0];
    for (_, sel, cls) in &results {
        assert_eq!(*sel, first_sel);
        assert_eq!(*cls, first_cls);
    }
    assert!(table.misses() >= 2);
}

#[test]
fn test_concurrent_sends_share_class() {
    let cls = create_counter_class("DispatchThreads");
    let name = cls.name();
    let handles: Vec<_> = (0..8i64)
        .map(|i| {
            thread::spawn(move || {
                let cls = AnyClass::get(name).unwrap();
                let obj = create_instance(cls);
                let mut total = 0i64;
                for j in 0..100i64 {
                    // SAFETY: add:to: is (i64, i64) -> i64.
                    let sum: i64 = unsafe { msg_send![&obj, add: i, to: j] };
                    total += sum;
                }
                total
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let i = i as i64;
        assert_eq!(handle.join().unwrap(), 100 * i + 4950);
    }
}
