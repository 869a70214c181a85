//! In-process runtime backend.
//!
//! Used on targets without a system Objective-C runtime, and everywhere when
//! the `host-runtime` feature is enabled. It provides the same primitives as
//! the system backend plus what tests and demos need to declare classes:
//!
//! - selectors: a sharded interning table
//! - classes: registry, metaclasses and IMP caches, with [`ClassBuilder`]
//! - objects: atomic refcounts and `dealloc` hooks
//! - pools: a thread-local stack, observable through [`pool_stats`]
//!
//! The root class is `NSObject`; see the crate README for its methods.
//!
//! # Example
//!
//! ```
//! use oxbridge::host::{self, ClassBuilder};
//! use oxbridge::{AnyObject, Owned, Sel, msg_send, sel};
//!
//! extern "C" fn bump(this: *mut AnyObject, _cmd: Sel) -> u64 {
//!     // SAFETY: Instances carry eight bytes of storage.
//!     unsafe {
//!         let counter = host::ivars(std::ptr::NonNull::new_unchecked(this)).cast::<u64>();
//!         *counter.as_ptr() += 1;
//!         *counter.as_ptr()
//!     }
//! }
//!
//! let mut builder = ClassBuilder::subclass_of_root("DocTicker").unwrap();
//! builder
//!     .ivar_bytes(8)
//!     .add_method(sel!(bump), bump as extern "C" fn(_, _) -> _);
//! let cls = builder.register().unwrap();
//!
//! let ticker: Owned<AnyObject> = unsafe { Owned::new_instance(cls) };
//! let _: u64 = unsafe { msg_send![&ticker, bump] };
//! let n: u64 = unsafe { msg_send![&ticker, bump] };
//! assert_eq!(n, 2);
//! ```

mod builder;
mod class;
mod object;
mod pool;
mod root;
mod selector;

use crate::runtime::AnyClass;

pub use builder::{ClassBuilder, MethodImplementation};
pub use object::{ivars, retain_count};
pub use pool::{PoolStats, pool_stats};

pub(crate) use class::{class_get_name, class_responds_to, entry_point, get_class, object_get_class};
pub(crate) use object::{release, retain};
pub(crate) use pool::{autorelease, pool_pop, pool_push};
pub(crate) use selector::{sel_get_name, sel_register_name};

/// Instance bytes of `cls`, including every superclass's.
pub fn instance_size(cls: &AnyClass) -> usize {
    class::ClassData::from_any(cls).instance_size()
}

/// Offset of the bytes `cls` itself declared, from the start of [`ivars`].
///
/// Always a multiple of 16; zero for direct subclasses of the root.
pub fn ivar_offset(cls: &AnyClass) -> usize {
    class::ClassData::from_any(cls).own_ivar_offset()
}
