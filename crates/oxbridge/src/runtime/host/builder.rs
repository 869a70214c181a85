//! Declaring classes on the host runtime.

use super::class::{self, ClassData, MethodTable};
use super::object;
use crate::encode::{Encode, EncodeReturn};
use crate::error::{Error, Result};
use crate::runtime::{AnyClass, AnyObject, Imp, Sel};
use std::ffi::CString;
use std::mem;

/// Function pointer types usable as method implementations.
///
/// Implemented for `extern "C" fn(*mut AnyObject, Sel, A...) -> R` and its
/// `unsafe` form, for up to six arguments. Function items have to be cast to
/// the pointer type first:
///
/// ```
/// use oxbridge::{AnyObject, Sel};
/// use oxbridge::host::MethodImplementation;
///
/// extern "C" fn answer(_this: *mut AnyObject, _cmd: Sel) -> usize {
///     42
/// }
///
/// let _imp = (answer as extern "C" fn(_, _) -> _).into_imp();
/// ```
pub trait MethodImplementation: Copy {
    /// Erases the signature.
    fn into_imp(self) -> Imp;
}

macro_rules! method_implementation_impl {
    ($($t:ident),*) => {
        impl<R: EncodeReturn $(, $t: Encode)*> MethodImplementation
            for extern "C" fn(*mut AnyObject, Sel $(, $t)*) -> R
        {
            fn into_imp(self) -> Imp {
                // SAFETY: Function pointers all have the same size; senders
                // transmute back to the exact signature.
                unsafe { mem::transmute(self) }
            }
        }

        impl<R: EncodeReturn $(, $t: Encode)*> MethodImplementation
            for unsafe extern "C" fn(*mut AnyObject, Sel $(, $t)*) -> R
        {
            fn into_imp(self) -> Imp {
                // SAFETY: See above.
                unsafe { mem::transmute(self) }
            }
        }
    };
}

method_implementation_impl!();
method_implementation_impl!(A);
method_implementation_impl!(A, B);
method_implementation_impl!(A, B, C);
method_implementation_impl!(A, B, C, D);
method_implementation_impl!(A, B, C, D, E);
method_implementation_impl!(A, B, C, D, E, F);

/// Builder for a new class.
///
/// Methods and instance bytes are fixed once [`register`](Self::register)
/// returns.
///
/// # Example
///
/// ```
/// use oxbridge::host::ClassBuilder;
/// use oxbridge::{AnyObject, Owned, Sel, msg_send, sel};
///
/// extern "C" fn count(_this: *mut AnyObject, _cmd: Sel) -> usize {
///     3
/// }
///
/// let mut builder = ClassBuilder::subclass_of_root("DocCounter").unwrap();
/// builder.add_method(sel!(count), count as extern "C" fn(_, _) -> _);
/// let cls = builder.register().unwrap();
///
/// let obj: Owned<AnyObject> = unsafe { Owned::alloc_init(cls) };
/// let n: usize = unsafe { msg_send![&obj, count] };
/// assert_eq!(n, 3);
/// ```
#[derive(Debug)]
pub struct ClassBuilder {
    name: CString,
    superclass: &'static ClassData,
    ivar_bytes: usize,
    methods: MethodTable,
    class_methods: MethodTable,
}

impl ClassBuilder {
    /// Starts a class named `name` inheriting from `superclass`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] if `name` contains a NUL byte.
    /// - [`Error::ClassAlreadyExists`] if `name` is taken.
    pub fn new(name: &str, superclass: &'static AnyClass) -> Result<Self> {
        let c_name = CString::new(name).map_err(|_| Error::InvalidName {
            name: name.to_owned(),
        })?;
        if class::lookup(c_name.as_bytes()).is_some() {
            return Err(Error::ClassAlreadyExists {
                name: name.to_owned(),
            });
        }
        Ok(ClassBuilder {
            name: c_name,
            superclass: ClassData::from_any(superclass),
            ivar_bytes: 0,
            methods: MethodTable::default(),
            class_methods: MethodTable::default(),
        })
    }

    /// Starts a class whose superclass is looked up by name.
    ///
    /// # Errors
    ///
    /// As [`ClassBuilder::new`], plus [`Error::UnknownSuperclass`] if no class
    /// is named `superclass`.
    pub fn new_by_name(name: &str, superclass: &str) -> Result<Self> {
        let Some(parent) = class::lookup(superclass.as_bytes()) else {
            return Err(Error::UnknownSuperclass {
                name: superclass.to_owned(),
            });
        };
        Self::new(name, parent.as_any())
    }

    /// Starts a direct subclass of `NSObject`.
    ///
    /// # Errors
    ///
    /// As [`ClassBuilder::new`].
    pub fn subclass_of_root(name: &str) -> Result<Self> {
        Self::new(name, class::root_class().as_any())
    }

    /// Reserves `size` more zeroed bytes in every instance.
    ///
    /// They follow the superclass's bytes, starting at the next 16-byte
    /// boundary; see [`super::ivar_offset`].
    pub fn ivar_bytes(&mut self, size: usize) -> &mut Self {
        self.ivar_bytes += size;
        self
    }

    /// Adds (or overrides) an instance method.
    pub fn add_method<F: MethodImplementation>(&mut self, sel: Sel, imp: F) -> &mut Self {
        self.methods.insert(sel, imp.into_imp());
        self
    }

    /// Adds (or overrides) a class method.
    pub fn add_class_method<F: MethodImplementation>(&mut self, sel: Sel, imp: F) -> &mut Self {
        self.class_methods.insert(sel, imp.into_imp());
        self
    }

    /// Registers the class and returns it.
    ///
    /// # Errors
    ///
    /// [`Error::ClassAlreadyExists`] if another class with the same name was
    /// registered since the builder was created.
    pub fn register(self) -> Result<&'static AnyClass> {
        let instance_size =
            object::own_ivars_start(self.superclass.instance_size()) + self.ivar_bytes;
        let class = class::register(
            &self.name,
            self.superclass,
            instance_size,
            self.methods,
            self.class_methods,
        )?;
        Ok(class.as_any())
    }
}
