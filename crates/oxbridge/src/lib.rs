//! `oxbridge`: Typed Message Dispatch for Objective-C Style Runtimes
//!
//! `oxbridge` lets statically typed Rust code send messages to objects of a
//! dynamic, message-passing object runtime without per-method glue. It
//! provides:
//!
//! - **Identifier Caching**: selectors and classes resolved once per process
//!   ([`sel!`], [`class!`], [`cache`])
//! - **Compile-Time ABI Selection**: the message entry point for each return
//!   type is fixed at compile time ([`variant`], [`encode`])
//! - **Typed Sends**: one generic primitive, [`send`], plus the checked
//!   [`send_checked`] / [`perform_checked`] and the [`msg_send!`] macro
//! - **Ownership**: [`Owned<T>`], a reference-counting handle with retain and
//!   adopt disciplines
//! - **Autorelease Pools**: [`AutoreleasePool`], released exactly once
//!
//! # Architecture
//!
//! - **Dispatch Layer**: caches, variant selection, senders, ownership, pools
//! - **Runtime Boundary** ([`runtime`]): opaque [`AnyObject`] / [`AnyClass`] /
//!   [`Sel`] and a handful of primitives, backed by the system `libobjc` on
//!   Apple targets or by the in-process [`host`] runtime elsewhere
//!
//! # Example
//!
//! ```rust
//! use oxbridge::{AnyObject, Owned, class, msg_send};
//!
//! let cls = class!(NSObject).expect("root class is always registered");
//! let obj: Owned<AnyObject> = unsafe { Owned::alloc_init(cls) };
//!
//! let same: bool = unsafe { msg_send![&obj, isEqual: obj.as_ptr()] };
//! assert!(same);
//! ```
//!
//! # Features
//!
//! - `safe-dispatch`: every [`send`] first checks that the receiver implements
//!   the selector. Failures are logged and panic in debug builds.
//! - `dispatch-backtrace`: adds a backtrace to safe-dispatch failure logs.
//! - `host-runtime`: use the in-process runtime even on Apple targets.
//!
//! Logging goes through `oxbridge-log`; set `OXBRIDGE_LOG=trace` to see cache
//! fills and registrations.

pub mod cache;
pub mod capability;
pub mod encode;
pub mod error;
pub mod message;
pub mod owned;
pub mod pool;
pub mod runtime;
pub mod variant;

// Re-export commonly used types
pub use capability::{Copying, Locking, Message, MutableCopying};
pub use error::{Error, Result};
pub use message::{MessageReceiver, perform_checked, send, send_checked};
pub use owned::Owned;
pub use pool::{AutoreleasePool, autoreleasepool};
pub use runtime::{AnyClass, AnyObject, Imp, Sel};

#[cfg(any(not(target_vendor = "apple"), feature = "host-runtime"))]
pub use runtime::host;

/// `true` when built with the `safe-dispatch` feature.
pub const SAFE_DISPATCH: bool = cfg!(feature = "safe-dispatch");

/// `true` when the in-process host runtime is the backend.
pub const HOST_RUNTIME: bool = cfg!(any(not(target_vendor = "apple"), feature = "host-runtime"));
