//! Selector interning for the host runtime.
//!
//! Each unique name is copied once into a leaked, NUL-terminated buffer; the
//! selector token is the address of that buffer. Tokens are therefore stable
//! for the whole process and `sel_getName` is a pointer cast.
//!
//! # Sharding Strategy
//!
//! The table is split into `NUM_SHARDS` (16) shards, each behind its own
//! `RwLock`. The shard is picked with `hash & SHARD_MASK` over the `FxHash` of
//! the name bytes:
//! - Hit: read lock on one shard.
//! - Miss: write lock on one shard, re-check, then insert.

use crate::runtime::Sel;
use fxhash::FxHashMap;
use oxbridge_log::trace;
use std::ffi::{CStr, c_void};
use std::ptr::NonNull;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Number of shards in the selector table (power of 2 for fast masking).
const NUM_SHARDS: usize = 16;

/// Bit mask for shard selection (`NUM_SHARDS` - 1 = 0b1111).
const SHARD_MASK: usize = NUM_SHARDS - 1;

/// One shard: name bytes (without the terminator) to the interned name.
type SelectorShard = RwLock<FxHashMap<&'static [u8], &'static CStr>>;

struct SelectorTable {
    shards: [SelectorShard; NUM_SHARDS],
}

static TABLE: OnceLock<SelectorTable> = OnceLock::new();

fn table() -> &'static SelectorTable {
    TABLE.get_or_init(|| SelectorTable {
        shards: std::array::from_fn(|_| RwLock::default()),
    })
}

#[inline]
fn token(name: &'static CStr) -> Sel {
    // SAFETY: The token is the address of an interned name.
    unsafe { Sel::from_ptr(NonNull::from(name).cast::<c_void>()) }
}

/// Interns `name` and returns its selector.
pub(crate) fn sel_register_name(name: &CStr) -> Sel {
    let bytes = name.to_bytes();
    let shard = &table().shards[fxhash::hash(bytes) & SHARD_MASK];

    // Fast path: read lock only
    if let Some(interned) = shard
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(bytes)
    {
        return token(interned);
    }

    // Slow path: another thread may have inserted while we waited
    let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(interned) = map.get(bytes) {
        return token(interned);
    }

    let interned: &'static CStr = Box::leak(name.to_owned().into_boxed_c_str());
    map.insert(interned.to_bytes(), interned);
    trace!("registered selector {:?}", interned);
    token(interned)
}

/// Returns the interned name of `sel`.
pub(crate) fn sel_get_name(sel: Sel) -> &'static CStr {
    // SAFETY: Every host selector token points at a leaked, NUL-terminated
    // name that is never freed.
    unsafe { CStr::from_ptr(sel.as_ptr().cast()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_interning_is_stable() {
        let a = sel_register_name(c"hostSelectorTest");
        let b = sel_register_name(c"hostSelectorTest");
        assert_eq!(a, b);
        assert_eq!(sel_get_name(a), c"hostSelectorTest");
    }

    #[test]
    fn test_distinct_names_distinct_tokens() {
        let a = sel_register_name(c"hostSelA");
        let b = sel_register_name(c"hostSelA:");
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_name() {
        let sel = sel_register_name(c"");
        assert_eq!(sel_get_name(sel), c"");
    }

    #[test]
    fn test_concurrent_interning() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| sel_register_name(c"hostSelRace:with:").as_ptr() as usize))
            .collect();
        let tokens: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tokens.windows(2).all(|w| w[0] == w[1]));
    }
}
