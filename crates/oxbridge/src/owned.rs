//! Reference-counted ownership of runtime objects.
//!
//! [`Owned<T>`] holds at most one reference to an object and releases it
//! exactly once when dropped. It is the only place raw retain and release are
//! issued; everything else in the crate moves ownership through it.
//!
//! # Construction Disciplines
//!
//! | Constructor | Count change | Use for |
//! |-------------|--------------|---------|
//! | [`Owned::retain`] | +1 | borrowed pointers (getters, collection elements) |
//! | [`Owned::adopt`] | none | results that are already +1 (`alloc`/`init`, `new`, `copy`) |
//!
//! The discipline is not stored: both produce the same value.
//!
//! # Invariants
//!
//! - An `Owned<T>` is either empty (null) or accounts for exactly one reference.
//! - `clone` retains; a Rust move changes no counts.
//! - [`Owned::reset`] and [`Owned::set`] retain the new object *before*
//!   releasing the old one, so assigning an object to itself is safe.

use crate::capability::Message;
use crate::message::{MessageReceiver, send};
use crate::runtime::{self, AnyClass, AnyObject};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ptr::{self, NonNull};

/// A nullable, owning reference to a runtime object.
///
/// # Example
///
/// ```
/// use oxbridge::{AnyClass, AnyObject, Owned};
///
/// let cls = AnyClass::get("NSObject").unwrap();
/// let first: Owned<AnyObject> = unsafe { Owned::alloc_init(cls) };
/// let second = first.clone(); // +1
/// assert_eq!(first, second);
///
/// drop(first); // -1, object still alive through `second`
/// assert!(!second.is_empty());
/// ```
pub struct Owned<T: Message> {
    ptr: Option<NonNull<T>>,
    _owns: PhantomData<T>,
}

impl<T: Message> Owned<T> {
    /// An empty handle.
    pub const fn empty() -> Self {
        Owned {
            ptr: None,
            _owns: PhantomData,
        }
    }

    /// Retains `ptr` and owns the new reference. Null gives an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object of type `T`.
    pub unsafe fn retain(ptr: *mut T) -> Self {
        // SAFETY: Forwarded caller contract.
        unsafe { runtime::retain(ptr.cast()) };
        Owned {
            ptr: NonNull::new(ptr),
            _owns: PhantomData,
        }
    }

    /// Takes over a reference the caller already owns, without retaining.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object of type `T` carrying one
    /// reference that is transferred to the handle.
    pub unsafe fn adopt(ptr: *mut T) -> Self {
        Owned {
            ptr: NonNull::new(ptr),
            _owns: PhantomData,
        }
    }

    /// Sends `alloc` then `init` to `cls` and adopts the result.
    ///
    /// A failing `init` (nil) gives an empty handle.
    ///
    /// # Safety
    ///
    /// Instances of `cls` must be of type `T`, and `cls` must follow the
    /// usual `alloc`/`init` conventions.
    pub unsafe fn alloc_init(cls: &AnyClass) -> Self {
        // SAFETY: Forwarded caller contract; `alloc` and `init` take no
        // arguments and return the object.
        unsafe {
            let obj: *mut T = send(cls, crate::sel!(alloc), ());
            let obj: *mut T = send(obj, crate::sel!(init), ());
            Self::adopt(obj)
        }
    }

    /// Sends `new` to `cls` and adopts the result.
    ///
    /// # Safety
    ///
    /// Same as [`Owned::alloc_init`].
    pub unsafe fn new_instance(cls: &AnyClass) -> Self {
        // SAFETY: Forwarded caller contract.
        unsafe {
            let obj: *mut T = send(cls, crate::sel!(new), ());
            Self::adopt(obj)
        }
    }

    /// Returns `true` if the handle owns nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Returns the raw pointer without affecting ownership.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Borrows the object, if any.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: The handle keeps the object alive while borrowed.
        self.ptr.map(|ptr| unsafe { ptr.as_ref() })
    }

    /// Moves the reference out, leaving this handle empty.
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::empty())
    }

    /// Replaces the owned object with `ptr`, retained.
    ///
    /// `ptr` is retained before the old object is released.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object of type `T`.
    pub unsafe fn reset(&mut self, ptr: *mut T) {
        // SAFETY: Forwarded caller contract.
        let new = unsafe { Self::retain(ptr) };
        *self = new;
    }

    /// Makes this handle share `other`'s object.
    pub fn set(&mut self, other: &Owned<T>) {
        // SAFETY: `other` keeps its object alive.
        unsafe { self.reset(other.as_ptr()) }
    }

    /// Gives up ownership without releasing and returns the pointer.
    #[must_use = "the returned pointer carries a reference that must be released"]
    pub fn into_raw(self) -> *mut T {
        ManuallyDrop::new(self).as_ptr()
    }

    /// Hands the reference to the innermost autorelease pool.
    ///
    /// The object stays valid until that pool drains.
    pub fn autorelease(self) -> *mut T {
        let ptr = self.into_raw();
        // SAFETY: `ptr` carries the reference this handle owned.
        unsafe { runtime::autorelease(ptr.cast()) };
        ptr
    }

    /// Reinterprets the handle as owning a `U`.
    ///
    /// # Safety
    ///
    /// The object must really be a `U`.
    pub unsafe fn cast<U: Message>(self) -> Owned<U> {
        // SAFETY: Forwarded caller contract; the reference moves over.
        unsafe { Owned::adopt(self.into_raw().cast()) }
    }
}

impl<T: Message> Drop for Owned<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            // SAFETY: This handle owns one reference to a live object.
            unsafe { runtime::release(ptr.as_ptr().cast()) };
        }
    }
}

impl<T: Message> Clone for Owned<T> {
    fn clone(&self) -> Self {
        // SAFETY: The object is alive while `self` owns it.
        unsafe { Self::retain(self.as_ptr()) }
    }
}

impl<T: Message> Default for Owned<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Message> PartialEq for Owned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: Message> Eq for Owned<T> {}

impl<T: Message> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.as_ptr()).finish()
    }
}

impl<T: Message> fmt::Pointer for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

// SAFETY: The handle keeps the object alive for the borrow.
unsafe impl<T: Message> MessageReceiver for &Owned<T> {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        self.as_ptr().cast()
    }
}

// SAFETY: Refcounting is atomic in the runtime; sharing the handle is as safe
// as sharing the object.
unsafe impl<T: Message + Send + Sync> Send for Owned<T> {}
// SAFETY: See above.
unsafe impl<T: Message + Send + Sync> Sync for Owned<T> {}
