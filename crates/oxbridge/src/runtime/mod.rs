//! The native boundary: opaque runtime types and the backend primitives.
//!
//! Everything above this module talks to the object runtime through the
//! handful of functions re-exported here, never through a backend directly.
//! Two backends exist:
//!
//! - `apple`: links `libobjc` and calls the system runtime. Selected on Apple
//!   targets unless the `host-runtime` feature is enabled.
//! - [`host`]: a small in-process runtime used on every other target (and in
//!   tests), providing the same primitives.
//!
//! The primitives are:
//!
//! | Primitive | Purpose |
//! |-----------|---------|
//! | `sel_register_name` / `sel_get_name` | selector interning |
//! | `get_class` / `class_get_name` | class lookup by name |
//! | `class_responds_to` / `object_get_class` | introspection without sending |
//! | `retain` / `release` / `autorelease` | reference counting |
//! | `pool_push` / `pool_pop` | autorelease pools |
//! | `entry_point` | untyped call target for a send |

use crate::error::{Error, Result};
use std::ffi::{CStr, CString, c_void};
use std::fmt;
use std::marker::{PhantomData, PhantomPinned};
use std::ptr::NonNull;

#[cfg(all(target_vendor = "apple", not(feature = "host-runtime")))]
mod apple;
#[cfg(all(target_vendor = "apple", not(feature = "host-runtime")))]
use apple as backend;

#[cfg(any(not(target_vendor = "apple"), feature = "host-runtime"))]
pub mod host;
#[cfg(any(not(target_vendor = "apple"), feature = "host-runtime"))]
use host as backend;

pub(crate) use backend::{
    autorelease, class_get_name, class_responds_to, entry_point, get_class,
    object_get_class, pool_pop, pool_push, release, retain, sel_get_name,
    sel_register_name,
};

/// Untyped method implementation or message entry point.
///
/// Never called as-is: the sender reinterprets it as the exact
/// `extern "C" fn(receiver, sel, args...) -> R` signature of the call.
pub type Imp = unsafe extern "C" fn();

/// An instance of any class in the runtime.
///
/// Only ever handled behind a pointer or reference; the layout belongs to the
/// runtime.
#[repr(C)]
pub struct AnyObject {
    _priv: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// A class object in the runtime.
///
/// Class identifiers are `&'static AnyClass`: classes are never unloaded once
/// registered.
#[repr(C)]
pub struct AnyClass {
    _priv: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

// SAFETY: Class objects are registered once and only mutated by the runtime
// under its own synchronization.
unsafe impl Send for AnyClass {}
// SAFETY: See above.
unsafe impl Sync for AnyClass {}

/// An interned method name.
///
/// Two selectors are equal exactly when they were registered with the same
/// name. Argument types are not part of a selector.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Sel {
    ptr: NonNull<c_void>,
}

// SAFETY: Selectors are immutable interned tokens that live for the whole
// process.
unsafe impl Send for Sel {}
// SAFETY: See above.
unsafe impl Sync for Sel {}

impl Sel {
    /// Registers (or finds) the selector for `name`.
    ///
    /// This goes to the runtime every time; prefer [`sel!`](crate::sel) or
    /// [`resolve`](crate::cache::resolve) on hot paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `name` contains a NUL byte.
    ///
    /// # Example
    ///
    /// ```
    /// use oxbridge::Sel;
    ///
    /// let a = Sel::register("count").unwrap();
    /// let b = Sel::register("count").unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(a.name(), "count");
    /// ```
    pub fn register(name: &str) -> Result<Sel> {
        let c_name = CString::new(name).map_err(|_| Error::InvalidName {
            name: name.to_owned(),
        })?;
        Ok(Sel::register_c(&c_name))
    }

    /// Registers the selector for an already NUL-terminated name.
    pub fn register_c(name: &CStr) -> Sel {
        sel_register_name(name)
    }

    /// Returns the selector's name.
    ///
    /// Names that are not valid UTF-8 are reported as `"<non-utf8>"`.
    pub fn name(self) -> &'static str {
        sel_get_name(self).to_str().unwrap_or("<non-utf8>")
    }

    /// Returns the raw token.
    pub const fn as_ptr(self) -> *const c_void {
        self.ptr.as_ptr()
    }

    /// Rebuilds a selector from a token previously returned by [`Sel::as_ptr`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been obtained from a registered selector.
    pub const unsafe fn from_ptr(ptr: NonNull<c_void>) -> Sel {
        Sel { ptr }
    }
}

impl fmt::Debug for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sel").field(&self.name()).finish()
    }
}

impl fmt::Display for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AnyClass {
    /// Looks up a class by name, asking the runtime on every call.
    ///
    /// Returns `None` if no class with that name is registered (or the name
    /// contains a NUL byte). Use [`class!`](crate::class) or
    /// [`resolve_class`](crate::cache::resolve_class) to cache the result.
    ///
    /// ```
    /// use oxbridge::AnyClass;
    ///
    /// assert!(AnyClass::get("NSObject").is_some());
    /// assert!(AnyClass::get("NoSuchClassAnywhere").is_none());
    /// ```
    pub fn get(name: &str) -> Option<&'static AnyClass> {
        let c_name = CString::new(name).ok()?;
        get_class(&c_name)
    }

    /// Returns the class name.
    pub fn name(&self) -> &'static str {
        class_get_name(self).to_str().unwrap_or("<non-utf8>")
    }

    /// Returns `true` if instances of this class implement `sel`.
    ///
    /// Answered by the runtime's class tables; no message is sent.
    pub fn responds_to(&self, sel: Sel) -> bool {
        class_responds_to(self, sel)
    }
}

impl fmt::Debug for AnyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyClass").field("name", &self.name()).finish()
    }
}

impl PartialEq for AnyClass {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for AnyClass {}

impl AnyObject {
    /// Returns the class of this object.
    pub fn class(&self) -> &'static AnyClass {
        // SAFETY: A reference to an object is a live, non-null object.
        unsafe { object_get_class(NonNull::from(self)) }
    }

    /// Returns `true` if this object's class implements `sel`.
    pub fn responds_to(&self, sel: Sel) -> bool {
        self.class().responds_to(sel)
    }
}

impl fmt::Debug for AnyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {:p}>", self.class().name(), self)
    }
}

/// Returns `true` if `receiver`'s class implements `sel`.
///
/// # Safety
///
/// `receiver` must point to a live object.
#[inline]
pub(crate) unsafe fn responds(receiver: NonNull<AnyObject>, sel: Sel) -> bool {
    // SAFETY: Forwarded caller contract.
    let class = unsafe { object_get_class(receiver) };
    class_responds_to(class, sel)
}
