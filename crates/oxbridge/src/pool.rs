//! Scope-bound autorelease pools.
//!
//! [`AutoreleasePool`] pushes a runtime pool when created and pops it exactly
//! once: on drop or on [`AutoreleasePool::drain`]. Objects autoreleased while
//! it is the innermost pool are released when it pops.
//!
//! Pools are per-thread, so the guard is neither `Send` nor `Sync`. Nesting is
//! handled by the runtime: popping a pool also pops any pool pushed after it.

use crate::capability::Message;
use crate::owned::Owned;
use crate::runtime;
use oxbridge_log::trace;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;

/// RAII guard for one runtime autorelease pool.
///
/// # Example
///
/// ```
/// use oxbridge::{AnyClass, AnyObject, AutoreleasePool, Owned};
///
/// let cls = AnyClass::get("NSObject").unwrap();
/// let pool = AutoreleasePool::new();
/// let obj: Owned<AnyObject> = unsafe { Owned::new_instance(cls) };
/// let _ptr = obj.autorelease(); // valid until the pool drains
/// pool.drain();
/// ```
#[must_use = "the pool pops as soon as it is dropped"]
pub struct AutoreleasePool {
    context: *mut c_void,
    // Pools belong to the thread that pushed them.
    _not_send: PhantomData<*mut ()>,
}

impl AutoreleasePool {
    /// Pushes a new pool on the current thread.
    pub fn new() -> Self {
        let context = runtime::pool_push();
        trace!("pushed autorelease pool {context:p}");
        AutoreleasePool {
            context,
            _not_send: PhantomData,
        }
    }

    /// Pops the pool now, releasing everything autoreleased into it.
    pub fn drain(self) {
        drop(self);
    }

    /// Autoreleases `obj` into this pool and borrows it for the pool's life.
    ///
    /// Returns `None` for an empty handle.
    ///
    /// # Safety
    ///
    /// This must be the innermost pool on the current thread; otherwise the
    /// object is released by an inner pool while still borrowed.
    pub unsafe fn adopt<'p, T: Message>(&'p self, obj: Owned<T>) -> Option<&'p T> {
        let ptr = obj.autorelease();
        // SAFETY: The pool holds the reference until it pops, which cannot
        // happen while `self` is borrowed.
        unsafe { ptr.as_ref() }
    }
}

impl Default for AutoreleasePool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AutoreleasePool {
    fn drop(&mut self) {
        trace!("popping autorelease pool {:p}", self.context);
        // SAFETY: The context came from `pool_push` on this thread (the guard
        // is !Send) and drop runs once.
        unsafe { runtime::pool_pop(self.context) };
    }
}

impl fmt::Debug for AutoreleasePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoreleasePool")
            .field("context", &self.context)
            .finish()
    }
}

/// Runs `f` inside a fresh pool, draining it afterwards.
///
/// The pool also drains if `f` panics.
///
/// ```
/// use oxbridge::autoreleasepool;
///
/// let answer = autoreleasepool(|_pool| 42);
/// assert_eq!(answer, 42);
/// ```
pub fn autoreleasepool<R>(f: impl FnOnce(&AutoreleasePool) -> R) -> R {
    let pool = AutoreleasePool::new();
    f(&pool)
}
