//! Calling-convention variant selection.
//!
//! The system runtime exposes several message entry points because the C ABI
//! returns some types differently from others:
//!
//! - **Standard**: the return value comes back in registers.
//! - **LargeStructReturn**: the caller passes a hidden pointer to storage for
//!   the result (aggregates too big for registers).
//! - **FloatingPointReturn**: the result comes back on the x87 stack (x86
//!   floating point).
//!
//! Which one is needed depends only on the return type and the target
//! architecture, so the choice is made by [`select`], a `const fn`, and stored
//! on each return type as [`EncodeReturn::VARIANT`](crate::encode::EncodeReturn::VARIANT).
//!
//! | Architecture | Void | Float | Aggregate > limit | Other |
//! |--------------|------|-------|-------------------|-------|
//! | aarch64 | Standard | Standard | Standard | Standard |
//! | arm | Standard | Standard | LargeStructReturn (limit 1 word) | Standard |
//! | x86 / x86_64 | Standard | FloatingPointReturn | LargeStructReturn (limit 2 words) | Standard |

#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "arm",
    target_arch = "aarch64"
)))]
compile_error!("oxbridge supports x86, x86_64, arm and aarch64 targets only");

/// Message entry point variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Plain `objc_msgSend`.
    Standard,
    /// `objc_msgSend_stret`: result written through a hidden pointer.
    LargeStructReturn,
    /// `objc_msgSend_fpret`: floating-point result on the x87 stack.
    FloatingPointReturn,
}

/// CPU architectures with a known message ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 32-bit x86.
    X86,
    /// 64-bit x86.
    X86_64,
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Aarch64,
}

impl Arch {
    /// The architecture being compiled for.
    #[cfg(target_arch = "x86")]
    pub const CURRENT: Arch = Arch::X86;
    /// The architecture being compiled for.
    #[cfg(target_arch = "x86_64")]
    pub const CURRENT: Arch = Arch::X86_64;
    /// The architecture being compiled for.
    #[cfg(target_arch = "arm")]
    pub const CURRENT: Arch = Arch::Arm;
    /// The architecture being compiled for.
    #[cfg(target_arch = "aarch64")]
    pub const CURRENT: Arch = Arch::Aarch64;

    /// Size of a pointer in bytes.
    pub const fn pointer_width(self) -> usize {
        match self {
            Arch::X86 | Arch::Arm => 4,
            Arch::X86_64 | Arch::Aarch64 => 8,
        }
    }
}

/// How a value is classified for return purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value (`void`).
    Void,
    /// Integer-like scalars, including `bool` and C enums.
    Integer,
    /// `f32` / `f64`.
    Float,
    /// Object, class, selector and raw pointers.
    Pointer,
    /// Structs and unions passed by value.
    Aggregate,
}

/// Picks the entry point for a return of `kind` and `size` bytes on `arch`.
///
/// Pure and `const`, so it is evaluated at compile time for every
/// [`EncodeReturn`](crate::encode::EncodeReturn) type.
///
/// ```
/// use oxbridge::variant::{select, Arch, ValueKind, Variant};
///
/// assert_eq!(select(ValueKind::Float, 8, Arch::X86_64), Variant::FloatingPointReturn);
/// assert_eq!(select(ValueKind::Float, 8, Arch::Aarch64), Variant::Standard);
/// assert_eq!(select(ValueKind::Aggregate, 32, Arch::X86_64), Variant::LargeStructReturn);
/// ```
pub const fn select(kind: ValueKind, size: usize, arch: Arch) -> Variant {
    if matches!(kind, ValueKind::Void) {
        return Variant::Standard;
    }
    let aggregate = matches!(kind, ValueKind::Aggregate);
    match arch {
        Arch::Aarch64 => Variant::Standard,
        Arch::Arm => {
            if aggregate && size > arch.pointer_width() {
                Variant::LargeStructReturn
            } else {
                Variant::Standard
            }
        }
        Arch::X86 | Arch::X86_64 => {
            if matches!(kind, ValueKind::Float) {
                Variant::FloatingPointReturn
            } else if aggregate && size > 2 * arch.pointer_width() {
                Variant::LargeStructReturn
            } else {
                Variant::Standard
            }
        }
    }
}

/// [`select`] for the current architecture.
pub const fn select_current(kind: ValueKind, size: usize) -> Variant {
    select(kind, size, Arch::CURRENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ARCHES: [Arch; 4] = [Arch::X86, Arch::X86_64, Arch::Arm, Arch::Aarch64];

    #[test]
    fn test_void_is_always_standard() {
        for arch in ALL_ARCHES {
            assert_eq!(select(ValueKind::Void, 0, arch), Variant::Standard);
        }
    }

    #[test]
    fn test_aarch64_is_always_standard() {
        let kinds = [
            ValueKind::Integer,
            ValueKind::Float,
            ValueKind::Pointer,
            ValueKind::Aggregate,
        ];
        for kind in kinds {
            for size in [1, 8, 16, 17, 64, 1024] {
                assert_eq!(select(kind, size, Arch::Aarch64), Variant::Standard);
            }
        }
    }

    #[test]
    fn test_arm_struct_threshold_is_one_word() {
        assert_eq!(select(ValueKind::Aggregate, 4, Arch::Arm), Variant::Standard);
        assert_eq!(select(ValueKind::Aggregate, 5, Arch::Arm), Variant::LargeStructReturn);
        assert_eq!(select(ValueKind::Aggregate, 16, Arch::Arm), Variant::LargeStructReturn);
        // Scalars never use the struct variant, whatever their size.
        assert_eq!(select(ValueKind::Integer, 8, Arch::Arm), Variant::Standard);
        assert_eq!(select(ValueKind::Float, 8, Arch::Arm), Variant::Standard);
    }

    #[test]
    fn test_x86_float_takes_precedence() {
        assert_eq!(select(ValueKind::Float, 4, Arch::X86), Variant::FloatingPointReturn);
        assert_eq!(select(ValueKind::Float, 8, Arch::X86), Variant::FloatingPointReturn);
        assert_eq!(select(ValueKind::Float, 8, Arch::X86_64), Variant::FloatingPointReturn);
    }

    #[test]
    fn test_x86_struct_threshold_is_two_words() {
        assert_eq!(select(ValueKind::Aggregate, 8, Arch::X86), Variant::Standard);
        assert_eq!(select(ValueKind::Aggregate, 9, Arch::X86), Variant::LargeStructReturn);
        assert_eq!(select(ValueKind::Aggregate, 16, Arch::X86_64), Variant::Standard);
        assert_eq!(select(ValueKind::Aggregate, 17, Arch::X86_64), Variant::LargeStructReturn);
        assert_eq!(select(ValueKind::Aggregate, 32, Arch::X86_64), Variant::LargeStructReturn);
    }

    #[test]
    fn test_pointers_and_integers_are_standard() {
        for arch in ALL_ARCHES {
            assert_eq!(select(ValueKind::Pointer, arch.pointer_width(), arch), Variant::Standard);
            assert_eq!(select(ValueKind::Integer, 8, arch), Variant::Standard);
        }
    }

    #[test]
    fn test_selection_is_pure() {
        for arch in ALL_ARCHES {
            let kinds = [
                ValueKind::Void,
                ValueKind::Integer,
                ValueKind::Float,
                ValueKind::Aggregate,
            ];
            for kind in kinds {
                for size in [0, 4, 8, 12, 16, 24] {
                    assert_eq!(select(kind, size, arch), select(kind, size, arch));
                }
            }
        }
    }

    #[test]
    fn test_select_is_const() {
        const BIG: Variant = select(ValueKind::Aggregate, 32, Arch::X86_64);
        const CURRENT: Variant = select_current(ValueKind::Void, 0);
        assert_eq!(BIG, Variant::LargeStructReturn);
        assert_eq!(CURRENT, Variant::Standard);
    }

    #[test]
    fn test_pointer_width() {
        assert_eq!(Arch::X86.pointer_width(), 4);
        assert_eq!(Arch::Arm.pointer_width(), 4);
        assert_eq!(Arch::X86_64.pointer_width(), 8);
        assert_eq!(Arch::Aarch64.pointer_width(), 8);
        assert_eq!(Arch::CURRENT.pointer_width(), std::mem::size_of::<usize>());
    }
}
