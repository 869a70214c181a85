//! Message sending.
//!
//! This module implements the typed call primitive, the equivalent of writing
//! `[receiver name:arg]` in Objective-C. It provides:
//!
//! - [`send`]: the unchecked, zero-overhead send.
//! - [`send_checked`] / [`perform_checked`]: sends that first ask the
//!   runtime whether the receiver implements the selector and return
//!   `None` / `false` instead of calling when it does not.
//! - [`msg_send!`](crate::msg_send): call-site sugar with a cached selector.
//!
//! # Dispatch Algorithm
//!
//! 1. A null receiver short-circuits to the all-zero result; nothing is called.
//! 2. With the `safe-dispatch` feature, the receiver's class is asked whether
//!    it implements the selector (`class_respondsToSelector`, not a message).
//! 3. The backend hands back the entry point for the return type's
//!    [`Variant`](crate::variant::Variant), fixed at compile time.
//! 4. The entry point is reinterpreted as
//!    `extern "C" fn(receiver, sel, args...) -> R` and called.
//!
//! # Safety
//!
//! Nothing checks that `R` and the argument types match what the method really
//! takes and returns. Getting them wrong is undefined behavior, which is why
//! every send is `unsafe`; this is the caller's primary obligation.
//!
//! # Example
//!
//! ```
//! use oxbridge::{AnyClass, AnyObject, Owned, msg_send, sel};
//! use oxbridge::message::send_checked;
//!
//! let cls = AnyClass::get("NSObject").unwrap();
//! let obj: Owned<AnyObject> = unsafe { Owned::new_instance(cls) };
//!
//! let hash: usize = unsafe { msg_send![&obj, hash] };
//! assert_eq!(hash, obj.as_ptr() as usize);
//!
//! let missing: Option<usize> = unsafe { send_checked(&obj, sel!(noSuchMethod), ()) };
//! assert_eq!(missing, None);
//! ```

use crate::capability::Message;
use crate::encode::{EncodeReturn, MessageArguments, zeroed_return};
use crate::runtime::{self, AnyObject, Sel};
use oxbridge_log::trace;
use std::ptr::NonNull;

/// Anything that can receive a message.
///
/// Implemented for raw pointers, references and `Option<&T>` of every
/// [`Message`] type, and for `&Owned<T>`.
///
/// # Safety
///
/// `as_raw_receiver` must return null or a pointer to a live object.
pub unsafe trait MessageReceiver: Sized {
    /// Returns the receiver as an untyped object pointer.
    fn as_raw_receiver(self) -> *mut AnyObject;
}

// SAFETY: Raw pointer receivers are the caller's responsibility; sending
// through them already requires `unsafe`.
unsafe impl<T: Message> MessageReceiver for *const T {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        self.cast_mut().cast()
    }
}

// SAFETY: See above.
unsafe impl<T: Message> MessageReceiver for *mut T {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        self.cast()
    }
}

// SAFETY: See above.
unsafe impl<T: Message> MessageReceiver for NonNull<T> {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        self.as_ptr().cast()
    }
}

// SAFETY: A reference is a live object.
unsafe impl<T: Message> MessageReceiver for &T {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        std::ptr::from_ref(self).cast_mut().cast()
    }
}

// SAFETY: A reference is a live object.
unsafe impl<T: Message> MessageReceiver for &mut T {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        std::ptr::from_mut(self).cast()
    }
}

// SAFETY: `None` maps to null, which is always accepted.
unsafe impl<T: Message> MessageReceiver for Option<&T> {
    #[inline]
    fn as_raw_receiver(self) -> *mut AnyObject {
        self.map_or(std::ptr::null_mut(), |obj| obj.as_raw_receiver())
    }
}

/// Sends `sel` to `receiver` with `args`, returning `R`.
///
/// A null receiver returns the all-zero `R` (`0`, `false`, null) without
/// calling anything, matching the runtime's rule that messaging nil is safe.
///
/// With the `safe-dispatch` feature, a receiver whose class does not
/// implement `sel` is reported at error level and panics in debug builds.
/// Without it there is no check at all.
///
/// # Safety
///
/// - `R` and the types in `args` must match the method's real signature.
/// - `receiver` must be null or a live object.
/// - Without `safe-dispatch`, sending a selector the receiver does not
///   implement is undefined by contract.
#[inline]
pub unsafe fn send<R: EncodeReturn, A: MessageArguments>(
    receiver: impl MessageReceiver,
    sel: Sel,
    args: A,
) -> R {
    let Some(receiver) = NonNull::new(receiver.as_raw_receiver()) else {
        return zeroed_return();
    };

    #[cfg(feature = "safe-dispatch")]
    // SAFETY: receiver is a live object per the caller's contract.
    unsafe {
        safe_mode::check(receiver, sel);
    }

    // SAFETY: Forwarded caller contract.
    unsafe { invoke(receiver, sel, args) }
}

/// Sends `sel` only if the receiver implements it.
///
/// Returns `None`, without calling anything, when `receiver` is null or its
/// class does not implement `sel`. This is the recoverable counterpart of
/// [`send`], meant for optional methods that only some runtime versions have.
///
/// # Safety
///
/// - `R` and the types in `args` must match the method's real signature.
/// - `receiver` must be null or a live object.
#[inline]
pub unsafe fn send_checked<R: EncodeReturn, A: MessageArguments>(
    receiver: impl MessageReceiver,
    sel: Sel,
    args: A,
) -> Option<R> {
    let receiver = NonNull::new(receiver.as_raw_receiver())?;
    // SAFETY: receiver is a live object per the caller's contract.
    if !unsafe { runtime::responds(receiver, sel) } {
        trace!("{:p} does not respond to {sel}, skipping send", receiver);
        return None;
    }
    // SAFETY: Forwarded caller contract; the selector is implemented.
    Some(unsafe { invoke(receiver, sel, args) })
}

/// [`send_checked`] for methods returning nothing.
///
/// Returns `true` if the method was called.
///
/// # Safety
///
/// Same as [`send_checked`].
#[inline]
pub unsafe fn perform_checked<A: MessageArguments>(
    receiver: impl MessageReceiver,
    sel: Sel,
    args: A,
) -> bool {
    // SAFETY: Forwarded caller contract.
    unsafe { send_checked::<(), A>(receiver, sel, args) }.is_some()
}

/// Looks up the entry point and performs the typed call.
///
/// # Safety
///
/// `receiver` must be live and `R`/`A` must match the method.
#[inline]
unsafe fn invoke<R: EncodeReturn, A: MessageArguments>(
    receiver: NonNull<AnyObject>,
    sel: Sel,
    args: A,
) -> R {
    // SAFETY: receiver is live.
    let imp = unsafe { runtime::entry_point(receiver, sel, R::VARIANT) };
    // SAFETY: Forwarded caller contract.
    unsafe { A::invoke(imp, receiver.as_ptr(), sel, args) }
}

#[cfg(feature = "safe-dispatch")]
mod safe_mode {
    use crate::runtime::{self, AnyObject, Sel};
    use oxbridge_log::error;
    use std::ptr::NonNull;

    /// Verifies that `receiver` implements `sel` before a send.
    ///
    /// Uses class introspection directly; going through `send` here would
    /// recurse.
    ///
    /// # Safety
    ///
    /// `receiver` must be a live object.
    #[inline]
    pub(super) unsafe fn check(receiver: NonNull<AnyObject>, sel: Sel) {
        // SAFETY: Forwarded caller contract.
        if !unsafe { runtime::responds(receiver, sel) } {
            // SAFETY: Forwarded caller contract.
            unsafe { unrecognized(receiver, sel) };
        }
    }

    #[cold]
    #[inline(never)]
    unsafe fn unrecognized(receiver: NonNull<AnyObject>, sel: Sel) {
        // SAFETY: Forwarded caller contract.
        let class = unsafe { runtime::object_get_class(receiver) };
        error!(
            "[{} {sel}]: unrecognized selector sent to {:p}",
            class.name(),
            receiver
        );

        #[cfg(feature = "dispatch-backtrace")]
        error!("send site:\n{:?}", backtrace::Backtrace::new());

        if cfg!(debug_assertions) {
            panic!(
                "safe dispatch: [{} {sel}]: unrecognized selector sent to {:p}",
                class.name(),
                receiver
            );
        }
    }
}

/// Sends a message with a selector cached at the call site.
///
/// Expands to an [`send`] call, so it must appear inside `unsafe`. The return
/// type is inferred from context.
///
/// ```
/// use oxbridge::{AnyClass, AnyObject, msg_send, sel};
///
/// let cls = AnyClass::get("NSObject").unwrap();
/// let responds: bool = unsafe { msg_send![cls, instancesRespondToSelector: sel!(init)] };
/// assert!(responds);
///
/// let nothing: *mut AnyObject = unsafe { msg_send![std::ptr::null_mut::<AnyObject>(), self] };
/// assert!(nothing.is_null());
/// ```
#[macro_export]
macro_rules! msg_send {
    [$receiver:expr, $name:ident $(,)?] => {
        $crate::message::send($receiver, $crate::sel!($name), ())
    };
    [$receiver:expr, $($name:ident : $arg:expr),+ $(,)?] => {
        $crate::message::send($receiver, $crate::sel!($($name :)+), ($($arg,)+))
    };
}
