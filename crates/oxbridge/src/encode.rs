//! Types that may cross the message boundary.
//!
//! [`Encode`] marks a type as passable by value through a C call and records
//! how it is classified; [`EncodeReturn`] additionally marks it as a valid
//! return type and carries the entry-point [`Variant`] for it, computed at
//! compile time. [`MessageArguments`] is implemented for tuples of `Encode`
//! values and performs the final, typed call.
//!
//! Structs passed by value opt in with an `unsafe impl`:
//!
//! ```
//! use oxbridge::encode::{Encode, EncodeReturn};
//! use oxbridge::variant::{ValueKind, Variant};
//!
//! #[repr(C)]
//! #[derive(Clone, Copy, Default)]
//! struct Range {
//!     location: usize,
//!     length: usize,
//! }
//!
//! unsafe impl Encode for Range {
//!     const KIND: ValueKind = ValueKind::Aggregate;
//! }
//! unsafe impl EncodeReturn for Range {}
//!
//! // Two words still come back in registers.
//! assert_eq!(<Range as EncodeReturn>::VARIANT, Variant::Standard);
//! ```

use crate::capability::Message;
use crate::runtime::{AnyObject, Imp, Sel};
use crate::variant::{self, ValueKind, Variant};
use std::mem;
use std::ptr::NonNull;

/// A type that can be passed by value to a method implementation.
///
/// # Safety
///
/// The type must have a C-compatible representation and `KIND` must describe
/// it truthfully; the entry point is chosen from it.
pub unsafe trait Encode: Sized {
    /// Classification of the type.
    const KIND: ValueKind;
}

/// A type that can be returned from a method implementation.
///
/// # Safety
///
/// Besides the [`Encode`] requirements, the all-zero bit pattern must be a
/// valid value: it is what a send to a null receiver returns.
pub unsafe trait EncodeReturn: Encode {
    /// Entry point variant for returning this type on the current target.
    const VARIANT: Variant = variant::select_current(Self::KIND, mem::size_of::<Self>());
}

/// Returns the all-zero value of `R`.
#[inline]
pub(crate) fn zeroed_return<R: EncodeReturn>() -> R {
    // SAFETY: EncodeReturn guarantees the all-zero pattern is valid.
    unsafe { mem::zeroed() }
}

macro_rules! encode_impls {
    ($kind:ident: $($t:ty),+) => {$(
        // SAFETY: Primitive with a fixed C representation.
        unsafe impl Encode for $t {
            const KIND: ValueKind = ValueKind::$kind;
        }
        // SAFETY: Zero is a valid value of every primitive listed.
        unsafe impl EncodeReturn for $t {}
    )+};
}

encode_impls!(Integer: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool);
encode_impls!(Float: f32, f64);

// SAFETY: `()` is zero-sized and only meaningful as a return type.
unsafe impl Encode for () {
    const KIND: ValueKind = ValueKind::Void;
}
// SAFETY: `()` has a single value.
unsafe impl EncodeReturn for () {}

// SAFETY: Thin raw pointers are C pointers.
unsafe impl<T> Encode for *const T {
    const KIND: ValueKind = ValueKind::Pointer;
}
// SAFETY: Null is a valid raw pointer.
unsafe impl<T> EncodeReturn for *const T {}

// SAFETY: Thin raw pointers are C pointers.
unsafe impl<T> Encode for *mut T {
    const KIND: ValueKind = ValueKind::Pointer;
}
// SAFETY: Null is a valid raw pointer.
unsafe impl<T> EncodeReturn for *mut T {}

// SAFETY: `NonNull` is a transparent pointer.
unsafe impl<T> Encode for NonNull<T> {
    const KIND: ValueKind = ValueKind::Pointer;
}

// SAFETY: `Option<NonNull<T>>` has the null pointer optimization.
unsafe impl<T> Encode for Option<NonNull<T>> {
    const KIND: ValueKind = ValueKind::Pointer;
}
// SAFETY: All-zero is `None`.
unsafe impl<T> EncodeReturn for Option<NonNull<T>> {}

// SAFETY: `Sel` is a transparent non-null pointer.
unsafe impl Encode for Sel {
    const KIND: ValueKind = ValueKind::Pointer;
}

// SAFETY: `Option<Sel>` has the null pointer optimization.
unsafe impl Encode for Option<Sel> {
    const KIND: ValueKind = ValueKind::Pointer;
}
// SAFETY: All-zero is `None`.
unsafe impl EncodeReturn for Option<Sel> {}

// SAFETY: References are non-null C pointers.
unsafe impl<T: Message> Encode for &T {
    const KIND: ValueKind = ValueKind::Pointer;
}

// SAFETY: `Option<&T>` has the null pointer optimization.
unsafe impl<T: Message> Encode for Option<&T> {
    const KIND: ValueKind = ValueKind::Pointer;
}

/// A tuple of arguments following the receiver and selector.
///
/// Implemented for tuples of up to ten [`Encode`] values; `()` sends no
/// arguments.
///
/// # Safety
///
/// `invoke` must call `imp` with exactly the receiver, selector and tuple
/// fields, in order, through a C function pointer.
pub unsafe trait MessageArguments: Sized {
    /// Calls `imp` as `extern "C" fn(receiver, sel, args...) -> R`.
    ///
    /// # Safety
    ///
    /// `imp` must be an entry point or implementation that accepts exactly
    /// this signature, and `receiver` must be a live object.
    unsafe fn invoke<R: EncodeReturn>(
        imp: Imp,
        receiver: *mut AnyObject,
        sel: Sel,
        args: Self,
    ) -> R;
}

macro_rules! message_arguments_impl {
    ($($arg:ident: $t:ident),*) => {
        // SAFETY: `invoke` forwards every field in order.
        unsafe impl<$($t: Encode),*> MessageArguments for ($($t,)*) {
            #[inline]
            unsafe fn invoke<R: EncodeReturn>(
                imp: Imp,
                receiver: *mut AnyObject,
                sel: Sel,
                ($($arg,)*): Self,
            ) -> R {
                // SAFETY: The caller guarantees `imp` has this signature.
                let imp: unsafe extern "C" fn(*mut AnyObject, Sel $(, $t)*) -> R =
                    unsafe { mem::transmute(imp) };
                // SAFETY: See above; receiver liveness is the caller's contract.
                unsafe { imp(receiver, sel $(, $arg)*) }
            }
        }
    };
}

message_arguments_impl!();
message_arguments_impl!(a: A);
message_arguments_impl!(a: A, b: B);
message_arguments_impl!(a: A, b: B, c: C);
message_arguments_impl!(a: A, b: B, c: C, d: D);
message_arguments_impl!(a: A, b: B, c: C, d: D, e: E);
message_arguments_impl!(a: A, b: B, c: C, d: D, e: E, f: F);
message_arguments_impl!(a: A, b: B, c: C, d: D, e: E, f: F, g: G);
message_arguments_impl!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H);
message_arguments_impl!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I);
message_arguments_impl!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J);
