//! Object allocation and reference counting for the host runtime.
//!
//! Every object, class objects included, starts with an [`ObjectHeader`]:
//!
//! ```text
//! +-----------------+  <- *mut AnyObject
//! | isa             |  class (metaclass for class objects)
//! | refcount        |  atomic, starts at 1
//! | flags           |  FLAG_IMMORTAL for class objects
//! +-----------------+  <- IVAR_OFFSET (16-byte aligned)
//! | instance bytes  |  zeroed, `instance_size` of the class
//! +-----------------+
//! ```
//!
//! Instances are freed when the count reaches zero, after the class's
//! `dealloc` method (if any) has run. Class objects ignore retain and release.

use super::class::ClassData;
use crate::runtime::{AnyObject, Sel};
use std::alloc::{self, Layout};
use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{self, AtomicUsize, Ordering};

/// Set on objects that are never freed.
const FLAG_IMMORTAL: u32 = 1;

/// Highest count reachable before `retain` refuses to go on.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// Alignment of every allocation, of the instance bytes, and of each class's
/// own share of them.
pub(super) const OBJECT_ALIGN: usize = 16;

/// Offset of the instance bytes from the start of the object.
pub(super) const IVAR_OFFSET: usize = mem::size_of::<ObjectHeader>().next_multiple_of(OBJECT_ALIGN);

/// Common prefix of every host object.
#[repr(C)]
pub(super) struct ObjectHeader {
    /// Class of the object; fixed after allocation.
    pub(super) isa: *const ClassData,
    pub(super) refcount: AtomicUsize,
    pub(super) flags: u32,
}

impl ObjectHeader {
    pub(super) const fn immortal(isa: *const ClassData) -> Self {
        ObjectHeader {
            isa,
            refcount: AtomicUsize::new(1),
            flags: FLAG_IMMORTAL,
        }
    }

    #[inline]
    fn is_immortal(&self) -> bool {
        self.flags & FLAG_IMMORTAL != 0
    }
}

/// # Safety
///
/// `obj` must point to a live host object.
#[inline]
pub(super) unsafe fn header<'a>(obj: NonNull<AnyObject>) -> &'a ObjectHeader {
    // SAFETY: Every host object starts with its header.
    unsafe { obj.cast::<ObjectHeader>().as_ref() }
}

fn layout_for(instance_size: usize) -> Layout {
    match Layout::from_size_align(IVAR_OFFSET + instance_size, OBJECT_ALIGN) {
        Ok(layout) => layout,
        Err(_) => panic!("instance size {instance_size} overflows the address space"),
    }
}

/// Allocates a zeroed instance of `class` with a count of one.
pub(super) fn allocate(class: &'static ClassData) -> NonNull<AnyObject> {
    let layout = layout_for(class.instance_size());
    // SAFETY: The layout is never zero-sized (the header is in it).
    let raw = unsafe { alloc::alloc_zeroed(layout) };
    let Some(ptr) = NonNull::new(raw) else {
        alloc::handle_alloc_error(layout);
    };
    // SAFETY: Freshly allocated, aligned and large enough for the header.
    unsafe {
        ptr.cast::<ObjectHeader>().write(ObjectHeader {
            isa: class,
            refcount: AtomicUsize::new(1),
            flags: 0,
        });
    }
    ptr.cast()
}

/// # Safety
///
/// `obj` must be null or a live host object.
pub(crate) unsafe fn retain(obj: *mut AnyObject) {
    let Some(obj) = NonNull::new(obj) else { return };
    // SAFETY: Forwarded caller contract.
    let header = unsafe { header(obj) };
    if header.is_immortal() {
        return;
    }
    let old = header.refcount.fetch_add(1, Ordering::Relaxed);
    if old >= MAX_REFCOUNT {
        panic!("Reference count overflow in retain");
    }
}

/// # Safety
///
/// `obj` must be null or a live host object whose reference the caller owns.
pub(crate) unsafe fn release(obj: *mut AnyObject) {
    let Some(obj) = NonNull::new(obj) else { return };
    // SAFETY: Forwarded caller contract.
    let header = unsafe { header(obj) };
    if header.is_immortal() {
        return;
    }
    if header.refcount.fetch_sub(1, Ordering::Release) != 1 {
        return;
    }
    atomic::fence(Ordering::Acquire);
    // SAFETY: The last reference is gone.
    unsafe { dispose(obj) };
}

/// Runs `dealloc` and frees the memory.
///
/// # Safety
///
/// `obj` must be a host instance with no remaining references.
unsafe fn dispose(obj: NonNull<AnyObject>) {
    // SAFETY: Still live until freed below.
    let class = unsafe { &*header(obj).isa };
    let dealloc = crate::sel!(dealloc);
    if let Some(imp) = class.lookup_imp(dealloc) {
        // SAFETY: `dealloc` hooks take no arguments and return nothing.
        unsafe {
            let hook: unsafe extern "C" fn(*mut AnyObject, Sel) = mem::transmute(imp);
            hook(obj.as_ptr(), dealloc);
        }
    }
    // SAFETY: Allocated by `allocate` with this layout.
    unsafe { alloc::dealloc(obj.as_ptr().cast(), layout_for(class.instance_size())) };
}

/// Returns the current reference count of `obj`.
///
/// Null gives 0 and class objects report `usize::MAX`.
///
/// # Safety
///
/// `obj` must be null or a live host object.
pub unsafe fn retain_count(obj: *const AnyObject) -> usize {
    let Some(obj) = NonNull::new(obj.cast_mut()) else { return 0 };
    // SAFETY: Forwarded caller contract.
    let header = unsafe { header(obj) };
    if header.is_immortal() {
        usize::MAX
    } else {
        header.refcount.load(Ordering::Acquire)
    }
}

/// Where a class's own instance bytes start, given its superclass's size.
pub(super) const fn own_ivars_start(superclass_size: usize) -> usize {
    superclass_size.next_multiple_of(OBJECT_ALIGN)
}

/// Returns the start of `obj`'s instance bytes.
///
/// The bytes declared by a superclass come first. A subclass's own bytes
/// start at [`ivar_offset`](super::ivar_offset): the superclass's
/// [`instance_size`](super::instance_size) rounded up to 16, so every class's
/// share is 16-byte aligned.
///
/// # Safety
///
/// `obj` must be a live host instance (not a class object).
pub unsafe fn ivars(obj: NonNull<AnyObject>) -> NonNull<u8> {
    // SAFETY: Instances are at least IVAR_OFFSET bytes long.
    unsafe { obj.cast::<u8>().add(IVAR_OFFSET) }
}
