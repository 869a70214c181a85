//! Capability traits shared by wrapper types.
//!
//! A wrapper type is an opaque struct declared with [`opaque_object!`]; it
//! then opts into capabilities by implementing the traits below. The default
//! methods do the messaging, so every wrapper gets `copy`, `mutableCopy` and
//! `lock`/`unlock` without writing any glue.
//!
//! ```no_run
//! use oxbridge::capability::{Copying, Locking};
//! use oxbridge::{Owned, class, opaque_object};
//!
//! opaque_object! {
//!     /// A lock object from the runtime.
//!     pub struct NSLock;
//! }
//! // SAFETY: NSLock implements -lock and -unlock.
//! unsafe impl Locking for NSLock {}
//!
//! let cls = class!(NSLock).expect("NSLock is available");
//! let lock: Owned<NSLock> = unsafe { Owned::alloc_init(cls) };
//! if let Some(lock) = lock.get() {
//!     lock.locked(|| { /* critical section */ });
//! }
//! ```

use crate::message::send;
use crate::owned::Owned;
use crate::runtime::{AnyClass, AnyObject};

/// Marker for types that are objects of the runtime.
///
/// Implementing it allows pointers and references to the type to be used as
/// message receivers and wrapped in [`Owned`].
///
/// # Safety
///
/// The type must be an opaque stand-in for a runtime object: never
/// constructed in Rust, only handled behind pointers the runtime produced.
pub unsafe trait Message {}

// SAFETY: Generic runtime instance.
unsafe impl Message for AnyObject {}
// SAFETY: Class objects are runtime objects.
unsafe impl Message for AnyClass {}

/// Objects implementing `-copy`.
///
/// # Safety
///
/// `-copy` must return a new object of type `Self` carrying one reference
/// owned by the caller.
pub unsafe trait Copying: Message + Sized {
    /// Sends `copy` and adopts the result.
    fn copy(&self) -> Owned<Self> {
        // SAFETY: Trait contract: `copy` takes no arguments and returns a +1 `Self`.
        unsafe {
            let copy: *mut Self = send(self, crate::sel!(copy), ());
            Owned::adopt(copy)
        }
    }
}

/// Objects implementing `-mutableCopy`.
///
/// # Safety
///
/// `-mutableCopy` must return a new object of type `Self::Mutable` carrying
/// one reference owned by the caller.
pub unsafe trait MutableCopying: Message + Sized {
    /// The type `mutableCopy` produces.
    type Mutable: Message;

    /// Sends `mutableCopy` and adopts the result.
    fn mutable_copy(&self) -> Owned<Self::Mutable> {
        // SAFETY: Trait contract.
        unsafe {
            let copy: *mut Self::Mutable = send(self, crate::sel!(mutableCopy), ());
            Owned::adopt(copy)
        }
    }
}

/// Objects implementing `-lock` and `-unlock`.
///
/// These are pass-throughs to the runtime's synchronization object; any
/// blocking happens inside the runtime.
///
/// # Safety
///
/// Both methods must exist, take no arguments and return nothing.
pub unsafe trait Locking: Message + Sized {
    /// Sends `lock`.
    fn lock(&self) {
        // SAFETY: Trait contract.
        unsafe { send::<(), _>(self, crate::sel!(lock), ()) }
    }

    /// Sends `unlock`.
    fn unlock(&self) {
        // SAFETY: Trait contract.
        unsafe { send::<(), _>(self, crate::sel!(unlock), ()) }
    }

    /// Locks and returns a guard that unlocks on drop.
    fn lock_guard(&self) -> LockGuard<'_, Self> {
        self.lock();
        LockGuard { target: self }
    }

    /// Runs `f` while holding the lock.
    fn locked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock_guard();
        f()
    }
}

/// Unlocks its target when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, T: Locking> {
    target: &'a T,
}

impl<T: Locking> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        self.target.unlock();
    }
}

/// Declares an opaque wrapper type for a runtime class.
///
/// The type can only be used behind pointers, references and [`Owned`]; it
/// implements [`Message`].
///
/// ```
/// oxbridge::opaque_object! {
///     /// An immutable string.
///     pub struct NSString;
/// }
/// ```
#[macro_export]
macro_rules! opaque_object {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[repr(C)]
        $vis struct $name {
            _priv: [u8; 0],
            _marker: ::core::marker::PhantomData<(*mut u8, ::core::marker::PhantomPinned)>,
        }

        // SAFETY: Opaque, never constructed in Rust.
        unsafe impl $crate::capability::Message for $name {}
    };
}
