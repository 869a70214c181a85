//! Identifier caches for selectors and classes.
//!
//! Resolving a name goes to the runtime, which takes a lock and hashes the
//! string. Every resolution done through this module happens at most once per
//! name in the common case; afterwards the token comes from a cache.
//!
//! # Cache Shapes
//!
//! - **Call-site statics**: [`sel!`](crate::sel) and [`class!`](crate::class)
//!   expand to a `static` [`CachedSel`] / [`CachedClass`] holding one atomic
//!   pointer. A hit is a single acquire load.
//! - **Name-keyed table**: [`IdentifierCache`], for names only known at run
//!   time. Sharded into `NUM_SHARDS` (16) independent `RwLock`ed maps; the
//!   shard comes from the `FxHash` of the name masked with `SHARD_MASK`, so
//!   lookups for different names rarely contend.
//!
//! # Races
//!
//! Two threads resolving the same name for the first time may both call into
//! the runtime. The runtime interns, so both get the same token and the second
//! store is a no-op in effect. No lock is held across the runtime call.
//!
//! # Negative Lookups
//!
//! Class misses are never cached: a class may be registered after the first
//! failed lookup.

use crate::error::Result;
use crate::runtime::{self, AnyClass, Sel};
use fxhash::FxHashMap;
use oxbridge_log::{debug, trace};
use std::ffi::{CStr, c_void};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Number of shards in the name-keyed table (power of 2 for fast masking).
const NUM_SHARDS: usize = 16;

/// Bit mask for shard selection (`NUM_SHARDS` - 1 = 0b1111).
const SHARD_MASK: usize = NUM_SHARDS - 1;

/// A selector cached in a `static`.
///
/// Used by [`sel!`](crate::sel); rarely needed directly.
#[derive(Debug)]
pub struct CachedSel {
    ptr: AtomicPtr<c_void>,
}

impl CachedSel {
    /// Creates an empty cache slot.
    pub const fn new() -> Self {
        CachedSel {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// Returns the selector for `name`, registering it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not NUL-terminated or contains another NUL byte.
    /// The macros always pass a valid name.
    #[inline]
    pub fn get(&self, name: &'static str) -> Sel {
        match NonNull::new(self.ptr.load(Ordering::Acquire)) {
            // SAFETY: Only registered selector tokens are stored.
            Some(ptr) => unsafe { Sel::from_ptr(ptr) },
            None => self.fetch(name),
        }
    }

    #[cold]
    #[inline(never)]
    fn fetch(&self, name: &'static str) -> Sel {
        let Ok(c_name) = CStr::from_bytes_with_nul(name.as_bytes()) else {
            panic!("selector name {name:?} must end in its only NUL byte");
        };
        let sel = runtime::sel_register_name(c_name);
        self.ptr.store(sel.as_ptr().cast_mut(), Ordering::Release);
        trace!("cached selector {sel}");
        sel
    }
}

impl Default for CachedSel {
    fn default() -> Self {
        Self::new()
    }
}

/// A class cached in a `static`.
///
/// Used by [`class!`](crate::class). Only successful lookups are stored.
#[derive(Debug)]
pub struct CachedClass {
    ptr: AtomicPtr<AnyClass>,
}

impl CachedClass {
    /// Creates an empty cache slot.
    pub const fn new() -> Self {
        CachedClass {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// Returns the class named `name`, or `None` if it is not registered.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not NUL-terminated or contains another NUL byte.
    #[inline]
    pub fn get(&self, name: &'static str) -> Option<&'static AnyClass> {
        let ptr = self.ptr.load(Ordering::Acquire);
        if ptr.is_null() {
            return self.fetch(name);
        }
        // SAFETY: Only `&'static AnyClass` pointers are stored.
        Some(unsafe { &*ptr })
    }

    #[cold]
    #[inline(never)]
    fn fetch(&self, name: &'static str) -> Option<&'static AnyClass> {
        let Ok(c_name) = CStr::from_bytes_with_nul(name.as_bytes()) else {
            panic!("class name {name:?} must end in its only NUL byte");
        };
        let Some(class) = runtime::get_class(c_name) else {
            debug!("class {:?} is not available", c_name);
            return None;
        };
        self.ptr
            .store(std::ptr::from_ref(class).cast_mut(), Ordering::Release);
        trace!("cached class {}", class.name());
        Some(class)
    }
}

impl Default for CachedClass {
    fn default() -> Self {
        Self::new()
    }
}

type Shard<V> = RwLock<FxHashMap<Box<str>, V>>;

/// Process-wide name-keyed identifier table.
///
/// Most code uses the global instance through [`resolve`] and
/// [`resolve_class`]; separate instances are useful for measuring.
///
/// # Example
///
/// ```
/// use oxbridge::cache::IdentifierCache;
///
/// let cache = IdentifierCache::new();
/// let a = cache.resolve("count").unwrap();
/// let b = cache.resolve("count").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(cache.misses(), 1);
///
/// assert!(cache.resolve_class("NSObject").is_some());
/// assert!(cache.resolve_class("NoSuchClass").is_none());
/// ```
pub struct IdentifierCache {
    selectors: [Shard<Sel>; NUM_SHARDS],
    classes: [Shard<&'static AnyClass>; NUM_SHARDS],
    misses: AtomicUsize,
}

impl IdentifierCache {
    /// Creates an empty table.
    pub fn new() -> Self {
        IdentifierCache {
            selectors: std::array::from_fn(|_| RwLock::default()),
            classes: std::array::from_fn(|_| RwLock::default()),
            misses: AtomicUsize::new(0),
        }
    }

    /// Returns the process-wide table.
    pub fn global() -> &'static IdentifierCache {
        static GLOBAL: OnceLock<IdentifierCache> = OnceLock::new();
        GLOBAL.get_or_init(IdentifierCache::new)
    }

    /// Resolves `name` to a selector, registering it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`](crate::Error::InvalidName) if `name`
    /// contains a NUL byte.
    pub fn resolve(&self, name: &str) -> Result<Sel> {
        let shard = &self.selectors[shard_index(name)];

        // Fast path: read lock on one shard
        if let Some(sel) = shard
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(*sel);
        }

        // Slow path: ask the runtime without holding the lock
        let sel = Sel::register(name)?;
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        Ok(*map.entry(name.into()).or_insert(sel))
    }

    /// Resolves `name` to a class; `None` if no such class is registered.
    pub fn resolve_class(&self, name: &str) -> Option<&'static AnyClass> {
        let shard = &self.classes[shard_index(name)];

        if let Some(class) = shard
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Some(*class);
        }

        let Some(class) = AnyClass::get(name) else {
            debug!("class {name:?} is not available");
            return None;
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        Some(*map.entry(name.into()).or_insert(class))
    }

    /// Number of lookups that had to go to the runtime.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for IdentifierCache {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn shard_index(name: &str) -> usize {
    fxhash::hash(name) & SHARD_MASK
}

/// Resolves a selector through the global [`IdentifierCache`].
///
/// # Errors
///
/// Returns [`Error::InvalidName`](crate::Error::InvalidName) if `name`
/// contains a NUL byte.
pub fn resolve(name: &str) -> Result<Sel> {
    IdentifierCache::global().resolve(name)
}

/// Resolves a class through the global [`IdentifierCache`].
pub fn resolve_class(name: &str) -> Option<&'static AnyClass> {
    IdentifierCache::global().resolve_class(name)
}

/// Returns the selector for a literal method name, cached at the call site.
///
/// Keyword parts keep their colons: `sel!(count)`, `sel!(objectAtIndex:)`,
/// `sel!(setObject:forKey:)`.
///
/// ```
/// use oxbridge::{Sel, sel};
///
/// assert_eq!(sel!(count), Sel::register("count").unwrap());
/// assert_eq!(sel!(setObject:forKey:).name(), "setObject:forKey:");
/// ```
#[macro_export]
macro_rules! sel {
    ($name:ident) => {
        $crate::__cached_sel!(concat!(stringify!($name), "\0"))
    };
    ($($name:ident :)+) => {
        $crate::__cached_sel!(concat!($(stringify!($name), ":",)+ "\0"))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __cached_sel {
    ($name:expr) => {{
        static CACHED: $crate::cache::CachedSel = $crate::cache::CachedSel::new();
        CACHED.get($name)
    }};
}

/// Looks up a class by literal name, caching a successful lookup at the call
/// site. Evaluates to `Option<&'static AnyClass>`.
///
/// ```
/// use oxbridge::class;
///
/// let root = class!(NSObject).unwrap();
/// assert_eq!(root.name(), "NSObject");
/// assert!(class!(NoSuchClassHere).is_none());
/// ```
#[macro_export]
macro_rules! class {
    ($name:ident) => {{
        static CACHED: $crate::cache::CachedClass = $crate::cache::CachedClass::new();
        CACHED.get(concat!(stringify!($name), "\0"))
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_cached_sel_fills_once() {
        let cached = CachedSel::new();
        let first = cached.get("cacheTestFill\0");
        let second = cached.get("cacheTestFill\0");
        assert_eq!(first, second);
        assert_eq!(first, Sel::register("cacheTestFill").unwrap());
    }

    #[test]
    #[should_panic(expected = "NUL byte")]
    fn test_cached_sel_requires_terminator() {
        CachedSel::new().get("unterminated");
    }

    #[test]
    fn test_cached_class_does_not_cache_misses() {
        let cached = CachedClass::new();
        assert!(cached.get("CacheTestMissing\0").is_none());
        assert!(cached.ptr.load(Ordering::Relaxed).is_null());

        let root = CachedClass::new();
        let class = root.get("NSObject\0").unwrap();
        assert_eq!(root.get("NSObject\0"), Some(class));
    }

    #[test]
    fn test_sel_macro_forms() {
        assert_eq!(crate::sel!(init).name(), "init");
        assert_eq!(crate::sel!(isEqual:).name(), "isEqual:");
        assert_eq!(crate::sel!(insertObject:atIndex:).name(), "insertObject:atIndex:");
    }

    #[test]
    fn test_sel_macro_matches_table() {
        let cache = IdentifierCache::new();
        assert_eq!(crate::sel!(hash), cache.resolve("hash").unwrap());
    }

    #[test]
    fn test_resolve_counts_one_miss_per_name() {
        let cache = IdentifierCache::new();
        for _ in 0..10 {
            cache.resolve("alpha").unwrap();
            cache.resolve("beta:").unwrap();
        }
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_resolve_rejects_nul() {
        let cache = IdentifierCache::new();
        assert_eq!(
            cache.resolve("a\0b"),
            Err(Error::InvalidName { name: "a\0b".into() })
        );
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn test_resolve_class_miss_is_retried() {
        let cache = IdentifierCache::new();
        assert!(cache.resolve_class("CacheTestNope").is_none());
        assert!(cache.resolve_class("CacheTestNope").is_none());
        assert_eq!(cache.misses(), 0);

        let root = cache.resolve_class("NSObject").unwrap();
        assert_eq!(cache.resolve_class("NSObject"), Some(root));
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_concurrent_resolution_converges() {
        let cache = Arc::new(IdentifierCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve("cacheTestRace:").unwrap())
            })
            .collect();

        let sels: Vec<Sel> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(sels.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_shard_index_in_range() {
        for name in ["", "a", "init", "setObject:forKey:", "a very long selector name"] {
            assert!(shard_index(name) < NUM_SHARDS);
        }
    }
}
