// SPDX-License-Identifier: MIT OR Apache-2.0

//! C-style enums modeled as integer newtypes.
//!
//! Firmware is free to hand back values that no Rust enum variant would
//! cover, and storing such a value in a Rust enum is undefined behavior. The
//! types here are therefore transparent newtypes with associated constants,
//! and their `Debug` output falls back to the raw value for unknown codes.

/// Interface a C-style enum as an integer newtype.
///
/// ```ignore
/// newtype_enum! {
///     pub enum UnixBool: i32 => #[allow(missing_docs)] {
///         FALSE          =  0,
///         TRUE           =  1,
///         FILE_NOT_FOUND = -1,
///     }
/// }
/// ```
macro_rules! newtype_enum {
    (
        $(#[$type_attrs:meta])*
        $visibility:vis enum $type:ident : $base_integer:ty => $(#[$impl_attrs:meta])* {
            $(
                $(#[$variant_attrs:meta])*
                $variant:ident = $value:expr,
            )*
        }
    ) => {
        $(#[$type_attrs])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
        $visibility struct $type(pub $base_integer);

        $(#[$impl_attrs])*
        #[allow(unused)]
        impl $type {
            $(
                $(#[$variant_attrs])*
                pub const $variant: $type = $type($value);
            )*
        }

        impl core::fmt::Debug for $type {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match *self {
                    $(
                        $type::$variant => write!(f, stringify!($variant)),
                    )*
                    $type(unknown) => {
                        write!(f, "{}({})", stringify!($type), unknown)
                    }
                }
            }
        }
    }
}
