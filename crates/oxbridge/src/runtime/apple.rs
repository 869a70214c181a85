//! System runtime backend (`libobjc` on Apple platforms).
//!
//! The message entry points are assembly trampolines that tail-call the
//! method implementation with the caller's registers untouched, so each one
//! is declared here with a dummy signature and reinterpreted per call.

use super::{AnyClass, AnyObject, Imp, Sel};
use crate::variant::Variant;
use std::ffi::{CStr, c_char, c_void};
use std::ptr::NonNull;

/// `BOOL` is a C `bool` on arm64 and a `signed char` elsewhere.
#[cfg(target_arch = "aarch64")]
type Bool = bool;
#[cfg(not(target_arch = "aarch64"))]
type Bool = i8;

#[link(name = "objc", kind = "dylib")]
unsafe extern "C" {
    fn sel_registerName(name: *const c_char) -> Sel;
    fn sel_getName(sel: Sel) -> *const c_char;

    fn objc_getClass(name: *const c_char) -> *const AnyClass;
    fn class_getName(cls: *const AnyClass) -> *const c_char;
    fn class_respondsToSelector(cls: *const AnyClass, sel: Sel) -> Bool;
    fn object_getClass(obj: *const AnyObject) -> *const AnyClass;

    fn objc_retain(obj: *mut AnyObject) -> *mut AnyObject;
    fn objc_release(obj: *mut AnyObject);
    fn objc_autorelease(obj: *mut AnyObject) -> *mut AnyObject;
    fn objc_autoreleasePoolPush() -> *mut c_void;
    fn objc_autoreleasePoolPop(context: *mut c_void);

    fn objc_msgSend();
    #[cfg(not(target_arch = "aarch64"))]
    fn objc_msgSend_stret();
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    fn objc_msgSend_fpret();
}

pub(crate) fn sel_register_name(name: &CStr) -> Sel {
    // SAFETY: name is a valid NUL-terminated string; the runtime copies it.
    unsafe { sel_registerName(name.as_ptr()) }
}

pub(crate) fn sel_get_name(sel: Sel) -> &'static CStr {
    // SAFETY: Selector names are interned for the life of the process.
    unsafe { CStr::from_ptr(sel_getName(sel)) }
}

pub(crate) fn get_class(name: &CStr) -> Option<&'static AnyClass> {
    // SAFETY: name is NUL-terminated; classes are never unloaded.
    unsafe { objc_getClass(name.as_ptr()).as_ref() }
}

pub(crate) fn class_get_name(cls: &AnyClass) -> &'static CStr {
    // SAFETY: cls is a registered class; its name outlives it.
    unsafe { CStr::from_ptr(class_getName(cls)) }
}

pub(crate) fn class_responds_to(cls: &AnyClass, sel: Sel) -> bool {
    // SAFETY: cls is a registered class.
    let answer = unsafe { class_respondsToSelector(cls, sel) };
    answer != Bool::default()
}

/// # Safety
///
/// `obj` must point to a live object.
pub(crate) unsafe fn object_get_class(obj: NonNull<AnyObject>) -> &'static AnyClass {
    // SAFETY: Live objects always have a class.
    unsafe { &*object_getClass(obj.as_ptr()) }
}

/// # Safety
///
/// `obj` must be null or point to a live object.
pub(crate) unsafe fn retain(obj: *mut AnyObject) {
    // SAFETY: Forwarded caller contract; the runtime ignores nil.
    unsafe { objc_retain(obj) };
}

/// # Safety
///
/// `obj` must be null or point to a live object owned by the caller.
pub(crate) unsafe fn release(obj: *mut AnyObject) {
    // SAFETY: Forwarded caller contract; the runtime ignores nil.
    unsafe { objc_release(obj) };
}

/// # Safety
///
/// `obj` must be null or point to a live object owned by the caller.
pub(crate) unsafe fn autorelease(obj: *mut AnyObject) {
    // SAFETY: Forwarded caller contract; the runtime ignores nil.
    unsafe { objc_autorelease(obj) };
}

pub(crate) fn pool_push() -> *mut c_void {
    // SAFETY: Always valid to push a pool.
    unsafe { objc_autoreleasePoolPush() }
}

/// # Safety
///
/// `context` must come from `pool_push` on this thread and not be popped yet.
pub(crate) unsafe fn pool_pop(context: *mut c_void) {
    // SAFETY: Forwarded caller contract.
    unsafe { objc_autoreleasePoolPop(context) }
}

/// Returns the trampoline matching `variant`.
///
/// The trampolines do their own lookup, so receiver and selector are unused.
///
/// # Safety
///
/// Always safe to call; marked `unsafe` to match the host backend.
pub(crate) unsafe fn entry_point(
    _receiver: NonNull<AnyObject>,
    _sel: Sel,
    variant: Variant,
) -> Imp {
    match variant {
        Variant::Standard => objc_msgSend,
        #[cfg(not(target_arch = "aarch64"))]
        Variant::LargeStructReturn => objc_msgSend_stret,
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Variant::FloatingPointReturn => objc_msgSend_fpret,
        // The selector never picks these variants on this architecture.
        #[allow(unreachable_patterns)]
        _ => objc_msgSend,
    }
}
