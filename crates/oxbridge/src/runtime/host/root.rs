//! Methods of the host root class, `NSObject`.
//!
//! Instance methods: `init`, `self`, `class`, `respondsToSelector:`,
//! `retainCount`, `hash`, `isEqual:`.
//!
//! Class methods: `alloc`, `new`, `class`, `instancesRespondToSelector:`.
//! Class objects also answer the instance methods, through the root
//! metaclass inheriting from the root class.

use super::builder::MethodImplementation;
use super::class::{ClassData, MethodTable};
use super::object;
use crate::runtime::{AnyClass, AnyObject, Sel};
use std::ffi::CStr;
use std::ptr::NonNull;

fn method(table: &mut MethodTable, name: &CStr, imp: impl MethodImplementation) {
    table.insert(super::selector::sel_register_name(name), imp.into_imp());
}

pub(super) fn instance_methods() -> MethodTable {
    let mut table = MethodTable::default();
    method(&mut table, c"init", init as unsafe extern "C" fn(_, _) -> _);
    method(&mut table, c"self", init as unsafe extern "C" fn(_, _) -> _);
    method(&mut table, c"class", class as unsafe extern "C" fn(_, _) -> _);
    method(
        &mut table,
        c"respondsToSelector:",
        responds_to_selector as unsafe extern "C" fn(_, _, _) -> _,
    );
    method(&mut table, c"retainCount", retain_count as unsafe extern "C" fn(_, _) -> _);
    method(&mut table, c"hash", hash as unsafe extern "C" fn(_, _) -> _);
    method(&mut table, c"isEqual:", is_equal as unsafe extern "C" fn(_, _, _) -> _);
    table
}

pub(super) fn class_methods() -> MethodTable {
    let mut table = MethodTable::default();
    method(&mut table, c"alloc", alloc as unsafe extern "C" fn(_, _) -> _);
    method(&mut table, c"new", new as unsafe extern "C" fn(_, _) -> _);
    method(&mut table, c"class", init as unsafe extern "C" fn(_, _) -> _);
    method(
        &mut table,
        c"instancesRespondToSelector:",
        instances_respond_to_selector as unsafe extern "C" fn(_, _, _) -> _,
    );
    table
}

/// Class objects are records of their own class data.
///
/// # Safety
///
/// `receiver` must be a class object.
unsafe fn receiver_class<'a>(receiver: *mut AnyObject) -> &'a ClassData {
    // SAFETY: Forwarded caller contract.
    unsafe { &*receiver.cast::<ClassData>() }
}

unsafe extern "C" fn init(receiver: *mut AnyObject, _sel: Sel) -> *mut AnyObject {
    receiver
}

unsafe extern "C" fn class(receiver: *mut AnyObject, _sel: Sel) -> *const AnyClass {
    match NonNull::new(receiver) {
        // SAFETY: Methods only run on live receivers.
        Some(obj) => std::ptr::from_ref(unsafe { super::class::object_get_class(obj) }),
        None => std::ptr::null(),
    }
}

unsafe extern "C" fn responds_to_selector(receiver: *mut AnyObject, _sel: Sel, query: Sel) -> bool {
    // SAFETY: Methods only run on live receivers.
    NonNull::new(receiver).is_some_and(|obj| unsafe { crate::runtime::responds(obj, query) })
}

unsafe extern "C" fn retain_count(receiver: *mut AnyObject, _sel: Sel) -> usize {
    // SAFETY: Methods only run on live receivers.
    unsafe { object::retain_count(receiver) }
}

unsafe extern "C" fn hash(receiver: *mut AnyObject, _sel: Sel) -> usize {
    receiver.addr()
}

unsafe extern "C" fn is_equal(receiver: *mut AnyObject, _sel: Sel, other: *mut AnyObject) -> bool {
    receiver == other
}

unsafe extern "C" fn alloc(receiver: *mut AnyObject, _sel: Sel) -> *mut AnyObject {
    // SAFETY: Class methods run on class objects.
    let class: &'static ClassData = unsafe { receiver_class(receiver) };
    object::allocate(class).as_ptr()
}

unsafe extern "C" fn new(receiver: *mut AnyObject, sel: Sel) -> *mut AnyObject {
    // SAFETY: Class methods run on class objects; `init` has the standard
    // signature.
    unsafe {
        let obj = alloc(receiver, sel);
        crate::message::send(obj, crate::sel!(init), ())
    }
}

unsafe extern "C" fn instances_respond_to_selector(
    receiver: *mut AnyObject,
    _sel: Sel,
    query: Sel,
) -> bool {
    // SAFETY: Class methods run on class objects.
    unsafe { receiver_class(receiver) }.lookup_imp(query).is_some()
}
