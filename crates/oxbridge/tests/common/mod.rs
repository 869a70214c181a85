// Common test utilities for integration tests
//
// This module provides shared fixture classes and call counters for the
// integration tests. Counters are thread-local: the test harness runs each
// test on its own thread, so tests never observe each other's calls.

#![allow(dead_code)]

use oxbridge::encode::{Encode, EncodeReturn};
use oxbridge::host::ClassBuilder;
use oxbridge::variant::ValueKind;
use oxbridge::{AnyClass, AnyObject, Owned, Sel, sel};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

static CLASS_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static DEALLOCS: Cell<usize> = const { Cell::new(0) };
    static CALLS: Cell<usize> = const { Cell::new(0) };
    static LOCKS: Cell<isize> = const { Cell::new(0) };
}

/// Returns a class name no other test uses
pub fn unique_name(prefix: &str) -> String {
    let id = CLASS_ID.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{id}")
}

/// Number of `dealloc` hooks run on this thread
pub fn deallocs() -> usize {
    DEALLOCS.get()
}

/// Number of fixture method calls made on this thread
pub fn calls() -> usize {
    CALLS.get()
}

/// Current lock depth (lock minus unlock) on this thread
pub fn lock_depth() -> isize {
    LOCKS.get()
}

fn bump_calls() {
    CALLS.set(CALLS.get() + 1);
}

/// A struct returned by value, larger than two words
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

// SAFETY: repr(C) struct of four doubles.
unsafe impl Encode for Rect {
    const KIND: ValueKind = ValueKind::Aggregate;
}
// SAFETY: Zero is a valid Rect.
unsafe impl EncodeReturn for Rect {}

extern "C" fn dealloc(_this: *mut AnyObject, _cmd: Sel) {
    DEALLOCS.set(DEALLOCS.get() + 1);
}

extern "C" fn count(_this: *mut AnyObject, _cmd: Sel) -> usize {
    bump_calls();
    0
}

extern "C" fn add_to(_this: *mut AnyObject, _cmd: Sel, a: i64, b: i64) -> i64 {
    bump_calls();
    a + b
}

extern "C" fn scaled_by(_this: *mut AnyObject, _cmd: Sel, factor: f64) -> f64 {
    bump_calls();
    1.5 * factor
}

extern "C" fn frame(_this: *mut AnyObject, _cmd: Sel) -> Rect {
    bump_calls();
    Rect {
        x: 1.0,
        y: 2.0,
        width: 30.0,
        height: 40.0,
    }
}

extern "C" fn touch(_this: *mut AnyObject, _cmd: Sel) {
    bump_calls();
}

extern "C" fn copy(this: *mut AnyObject, _cmd: Sel) -> *mut AnyObject {
    bump_calls();
    // Immutable fixture: a copy is the same object, +1.
    // SAFETY: Methods only run on live receivers.
    unsafe { Owned::retain(this) }.into_raw()
}

extern "C" fn mutable_copy(this: *mut AnyObject, _cmd: Sel) -> *mut AnyObject {
    bump_calls();
    // SAFETY: Methods only run on live receivers.
    let cls = unsafe { (*this).class() };
    // SAFETY: A fresh instance of the receiver's class, +1 for the caller.
    unsafe { Owned::<AnyObject>::new_instance(cls) }.into_raw()
}

extern "C" fn lock(_this: *mut AnyObject, _cmd: Sel) {
    LOCKS.set(LOCKS.get() + 1);
}

extern "C" fn unlock(_this: *mut AnyObject, _cmd: Sel) {
    LOCKS.set(LOCKS.get() - 1);
}

extern "C" fn class_tag(_this: *mut AnyObject, _cmd: Sel) -> u32 {
    7
}

/// Registers a fresh subclass of `NSObject` whose instances count their
/// deallocation and answer:
///
/// - `count` -> usize 0
/// - `add:to:` (i64, i64) -> i64
/// - `scaledBy:` f64 -> f64 (1.5 * factor)
/// - `frame` -> Rect
/// - `touch` -> void
/// - `copy` -> self, retained
/// - `mutableCopy` -> a new instance, +1
/// - `lock` / `unlock`
///
/// and, as a class method, `tag` -> u32 7.
pub fn create_counter_class(prefix: &str) -> &'static AnyClass {
    let mut builder =
        ClassBuilder::subclass_of_root(&unique_name(prefix)).expect("Failed to create test class");
    builder
        .add_method(sel!(dealloc), dealloc as extern "C" fn(_, _))
        .add_method(sel!(count), count as extern "C" fn(_, _) -> _)
        .add_method(sel!(add:to:), add_to as extern "C" fn(_, _, _, _) -> _)
        .add_method(sel!(scaledBy:), scaled_by as extern "C" fn(_, _, _) -> _)
        .add_method(sel!(frame), frame as extern "C" fn(_, _) -> _)
        .add_method(sel!(touch), touch as extern "C" fn(_, _))
        .add_method(sel!(copy), copy as extern "C" fn(_, _) -> _)
        .add_method(sel!(mutableCopy), mutable_copy as extern "C" fn(_, _) -> _)
        .add_method(sel!(lock), lock as extern "C" fn(_, _))
        .add_method(sel!(unlock), unlock as extern "C" fn(_, _))
        .add_class_method(sel!(tag), class_tag as extern "C" fn(_, _) -> _);
    builder.register().expect("Failed to register test class")
}

/// Allocates and initializes an instance of `cls`
pub fn create_instance(cls: &AnyClass) -> Owned<AnyObject> {
    // SAFETY: Every class instance is an AnyObject.
    unsafe { Owned::alloc_init(cls) }
}
