// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw ABI types for calling UEFI runtime services from a kernel.
//!
//! Everything in this crate mirrors a structure that firmware hands to the
//! operating system after `ExitBootServices`: the system table and its
//! runtime-services function table, the memory map descriptors, the
//! firmware clock record and the EFI System Resource Table. The types carry
//! no behavior beyond simple predicates; the [`efirt`] crate builds the safe
//! bridge on top of them.
//!
//! [`efirt`]: https://crates.io/crates/efirt

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(
    clippy::all,
    clippy::must_use_candidate,
    clippy::ptr_as_ptr,
    clippy::use_self,
    missing_debug_implementations
)]

#[macro_use]
mod enums;

pub mod esrt;
pub mod memory;
pub mod table;
pub mod time;

mod status;

pub use status::Status;
pub use uguid::{guid, Guid};

/// One UCS-2 code unit.
pub type Char16 = u16;

/// A 64-bit address, on every target.
pub type PhysicalAddress = u64;

/// The firmware's one-byte boolean. Any non-zero value is true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Boolean(pub u8);

impl From<bool> for Boolean {
    fn from(value: bool) -> Self {
        Self(u8::from(value))
    }
}

impl From<Boolean> for bool {
    fn from(value: Boolean) -> Self {
        value.0 != 0
    }
}
