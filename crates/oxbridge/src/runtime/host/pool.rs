//! Thread-local autorelease pool stack for the host runtime.
//!
//! # Design
//!
//! Each thread owns a [`PoolStack`]: a flat list of autoreleased objects and
//! one frame per pushed pool recording the list length at the push. Every
//! push takes a fresh per-thread generation number, which is the pool token.
//! Popping a token finds its frame, truncates the frames back to it and
//! releases every object recorded after the frame's start.
//!
//! - **Tokens never repeat** on a thread, so a token whose pool is already
//!   gone cannot pop a newer pool that happens to sit at the same depth.
//!
//! - **Innermost wins**: an object goes to the most recently pushed pool.
//! - **Popping an outer pool pops the inner ones too**, as the system runtime
//!   does.
//! - **No pool**: autoreleasing with no pool in place is logged and the object
//!   leaks.
//!
//! Releases run after the stack borrow ends, so `dealloc` hooks may
//! autorelease or push pools themselves.

use crate::runtime::AnyObject;
use oxbridge_log::warn;
use std::cell::RefCell;
use std::ffi::c_void;

thread_local! {
    static STACK: RefCell<PoolStack> = const { RefCell::new(PoolStack::new()) };
}

/// Per-thread autorelease state.
struct PoolStack {
    /// Pending objects, oldest first.
    objects: Vec<*mut AnyObject>,
    /// Pushed pools, outermost first.
    frames: Vec<Frame>,
    pushes: u64,
    pops: u64,
}

/// One pushed pool.
#[derive(Clone, Copy)]
struct Frame {
    /// Token handed out by the push; unique on this thread.
    generation: u64,
    /// `objects.len()` at the push.
    start: usize,
}

impl PoolStack {
    const fn new() -> Self {
        PoolStack {
            objects: Vec::new(),
            frames: Vec::new(),
            pushes: 0,
            pops: 0,
        }
    }
}

/// Autorelease statistics for the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Pools currently pushed.
    pub depth: usize,
    /// Pools pushed so far.
    pub pushes: u64,
    /// Pools popped so far, including inner pools popped by an outer pop.
    pub pops: u64,
    /// Objects waiting for a drain.
    pub pending: usize,
}

/// Returns the autorelease statistics of the current thread.
pub fn pool_stats() -> PoolStats {
    STACK.with_borrow(|stack| PoolStats {
        depth: stack.frames.len(),
        pushes: stack.pushes,
        pops: stack.pops,
        pending: stack.objects.len(),
    })
}

pub(crate) fn pool_push() -> *mut c_void {
    STACK.with_borrow_mut(|stack| {
        stack.pushes += 1;
        let generation = stack.pushes;
        stack.frames.push(Frame {
            generation,
            start: stack.objects.len(),
        });
        std::ptr::without_provenance_mut(generation as usize)
    })
}

/// # Safety
///
/// `context` must come from `pool_push` on this thread.
pub(crate) unsafe fn pool_pop(context: *mut c_void) {
    let generation = context.addr() as u64;
    let drained = STACK.with_borrow_mut(|stack| {
        let Some(index) = stack
            .frames
            .iter()
            .rposition(|frame| frame.generation == generation)
        else {
            warn!("autorelease pool {context:p} is not on this thread's stack");
            return Vec::new();
        };
        let start = stack.frames[index].start;
        stack.pops += (stack.frames.len() - index) as u64;
        stack.frames.truncate(index);
        stack.objects.split_off(start)
    });

    for obj in drained.into_iter().rev() {
        // SAFETY: Each entry carries the reference handed over by
        // `autorelease`.
        unsafe { super::object::release(obj) };
    }
}

/// # Safety
///
/// `obj` must be null or a live host object whose reference the caller owns.
pub(crate) unsafe fn autorelease(obj: *mut AnyObject) {
    if obj.is_null() {
        return;
    }
    STACK.with_borrow_mut(|stack| {
        if stack.frames.is_empty() {
            warn!("{obj:p} autoreleased with no pool in place, leaking");
        } else {
            stack.objects.push(obj);
        }
    });
}
