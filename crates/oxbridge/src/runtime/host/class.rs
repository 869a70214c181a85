//! Classes, metaclasses and method lookup for the host runtime.
//!
//! # Class Pairs
//!
//! Registering a class creates two [`ClassData`] records: the class itself
//! and its metaclass. The class object's `isa` is the metaclass, so sending
//! to a class looks up class methods. Metaclasses mirror the class hierarchy
//! and the root metaclass inherits from the root class:
//!
//! ```text
//!  Widget ──superclass──> NSObject ──superclass──> (none)
//!    │ isa                  │ isa
//!    v                      v
//!  Widget(meta) ──────> NSObject(meta) ──superclass──> NSObject
//!    isa: NSObject(meta)    isa: itself
//! ```
//!
//! # Lookup
//!
//! `lookup_imp` checks the per-class cache under a read lock, then walks the
//! superclass chain and records a hit in the cache. Method tables are fixed
//! at registration, so cached entries never go stale. Misses are not cached.

use super::object::{self, ObjectHeader};
use super::root;
use crate::error::{Error, Result};
use crate::runtime::{AnyClass, AnyObject, Imp, Sel};
use crate::variant::Variant;
use fxhash::FxHashMap;
use oxbridge_log::{error, trace};
use std::ffi::CStr;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Method table: selector to implementation.
pub(super) type MethodTable = FxHashMap<Sel, Imp>;

/// A class or metaclass. Also the class object itself.
#[repr(C)]
pub(super) struct ClassData {
    /// Must stay first: class objects are objects.
    header: ObjectHeader,
    name: &'static CStr,
    superclass: Option<&'static ClassData>,
    is_meta: bool,
    /// Total instance bytes, including every superclass's.
    instance_size: usize,
    methods: MethodTable,
    cache: RwLock<FxHashMap<Sel, Imp>>,
}

// SAFETY: `isa` points at another leaked ClassData and never changes after
// registration; the cache is behind a lock.
unsafe impl Send for ClassData {}
// SAFETY: See above.
unsafe impl Sync for ClassData {}

impl ClassData {
    fn new(
        name: &'static CStr,
        superclass: Option<&'static ClassData>,
        is_meta: bool,
        instance_size: usize,
        methods: MethodTable,
    ) -> Self {
        ClassData {
            header: ObjectHeader::immortal(ptr::null()),
            name,
            superclass,
            is_meta,
            instance_size,
            methods,
            cache: RwLock::default(),
        }
    }

    pub(super) fn instance_size(&self) -> usize {
        self.instance_size
    }

    /// Offset of this class's own bytes within the instance bytes.
    pub(super) fn own_ivar_offset(&self) -> usize {
        self.superclass
            .map_or(0, |superclass| object::own_ivars_start(superclass.instance_size))
    }

    pub(super) fn metaclass(&self) -> &'static ClassData {
        // SAFETY: `isa` is set to a leaked ClassData during registration.
        unsafe { &*self.header.isa }
    }

    pub(super) fn as_any(&'static self) -> &'static AnyClass {
        // SAFETY: AnyClass is an opaque view of a ClassData.
        unsafe { &*ptr::from_ref(self).cast::<AnyClass>() }
    }

    pub(super) fn from_any(class: &AnyClass) -> &ClassData {
        // SAFETY: On the host backend every AnyClass is a ClassData.
        unsafe { &*ptr::from_ref(class).cast::<ClassData>() }
    }

    /// Finds the implementation of `sel` for instances of this class.
    pub(super) fn lookup_imp(&self, sel: Sel) -> Option<Imp> {
        // Fast path: cache
        if let Some(imp) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&sel)
        {
            return Some(*imp);
        }

        // Slow path: walk the inheritance chain
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(&imp) = class.methods.get(&sel) {
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(sel, imp);
                return Some(imp);
            }
            current = class.superclass;
        }
        None
    }
}

impl fmt::Debug for ClassData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassData")
            .field("name", &self.name)
            .field("is_meta", &self.is_meta)
            .field("instance_size", &self.instance_size)
            .finish_non_exhaustive()
    }
}

struct ClassRegistry {
    root: &'static ClassData,
    classes: RwLock<FxHashMap<&'static [u8], &'static ClassData>>,
}

static REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();

fn registry() -> &'static ClassRegistry {
    REGISTRY.get_or_init(|| {
        let root = create_pair(
            c"NSObject",
            None,
            0,
            root::instance_methods(),
            root::class_methods(),
        );
        let mut classes = FxHashMap::default();
        classes.insert(root.name.to_bytes(), root);
        ClassRegistry {
            root,
            classes: RwLock::new(classes),
        }
    })
}

/// The root class, `NSObject`.
pub(super) fn root_class() -> &'static ClassData {
    registry().root
}

/// Builds and leaks a class and its metaclass.
fn create_pair(
    name: &'static CStr,
    superclass: Option<&'static ClassData>,
    instance_size: usize,
    methods: MethodTable,
    class_methods: MethodTable,
) -> &'static ClassData {
    let meta_super = superclass.map(ClassData::metaclass);
    let meta = Box::into_raw(Box::new(ClassData::new(name, meta_super, true, 0, class_methods)));
    let class = Box::into_raw(Box::new(ClassData::new(
        name,
        superclass,
        false,
        instance_size,
        methods,
    )));

    // SAFETY: Both records were just leaked and are not shared yet.
    unsafe {
        (*class).header.isa = meta;
        (*meta).header.isa = match superclass {
            Some(superclass) => superclass.metaclass().header.isa,
            None => meta,
        };
        if superclass.is_none() {
            (*meta).superclass = Some(&*class);
        }
        &*class
    }
}

/// Registers a new class.
pub(super) fn register(
    name: &CStr,
    superclass: &'static ClassData,
    instance_size: usize,
    methods: MethodTable,
    class_methods: MethodTable,
) -> Result<&'static ClassData> {
    let mut classes = registry()
        .classes
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if classes.contains_key(name.to_bytes()) {
        return Err(Error::ClassAlreadyExists {
            name: name.to_string_lossy().into_owned(),
        });
    }

    let name: &'static CStr = Box::leak(name.to_owned().into_boxed_c_str());
    let class = create_pair(name, Some(superclass), instance_size, methods, class_methods);
    classes.insert(name.to_bytes(), class);
    trace!(
        "registered class {:?} (superclass {:?}, {} instance bytes)",
        name,
        superclass.name,
        instance_size
    );
    Ok(class)
}

/// Looks up a registered class by name.
pub(super) fn lookup(name: &[u8]) -> Option<&'static ClassData> {
    registry()
        .classes
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .copied()
}

pub(crate) fn get_class(name: &CStr) -> Option<&'static AnyClass> {
    lookup(name.to_bytes()).map(ClassData::as_any)
}

pub(crate) fn class_get_name(cls: &AnyClass) -> &'static CStr {
    ClassData::from_any(cls).name
}

pub(crate) fn class_responds_to(cls: &AnyClass, sel: Sel) -> bool {
    ClassData::from_any(cls).lookup_imp(sel).is_some()
}

/// # Safety
///
/// `obj` must point to a live host object.
pub(crate) unsafe fn object_get_class(obj: NonNull<AnyObject>) -> &'static AnyClass {
    // SAFETY: Forwarded caller contract; `isa` is a leaked ClassData.
    unsafe { (&*object::header(obj).isa).as_any() }
}

/// Returns the implementation of `sel` for `receiver`.
///
/// Implementations are called directly through their real signature, so the
/// variant does not change the lookup.
///
/// # Panics
///
/// Panics with "unrecognized selector" if the receiver's class chain does not
/// implement `sel`.
///
/// # Safety
///
/// `receiver` must point to a live host object.
pub(crate) unsafe fn entry_point(receiver: NonNull<AnyObject>, sel: Sel, _variant: Variant) -> Imp {
    // SAFETY: Forwarded caller contract.
    let class = unsafe { &*object::header(receiver).isa };
    match class.lookup_imp(sel) {
        Some(imp) => imp,
        None => unrecognized(class, receiver, sel),
    }
}

#[cold]
#[inline(never)]
fn unrecognized(class: &ClassData, receiver: NonNull<AnyObject>, sel: Sel) -> ! {
    let (kind, target) = if class.is_meta { ('+', "class") } else { ('-', "instance") };
    let name = class.name.to_string_lossy();
    error!("{kind}[{name} {sel}]: unrecognized selector sent to {target} {receiver:p}");
    panic!("{kind}[{name} {sel}]: unrecognized selector sent to {target} {receiver:p}");
}
