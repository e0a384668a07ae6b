// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kernel-side bridge to UEFI runtime services.
//!
//! After `ExitBootServices` the firmware leaves behind a handful of services
//! the kernel may still call: the clock, the variable store, reset and a few
//! tables. This crate makes those calls safe to issue from a running kernel.
//!
//! # Crate organisation
//!
//! - [`mem`] parses the memory map handed over by the boot loader and builds
//!   the isolated page table firmware runs in.
//! - [`context`] switches into and out of that page table. Firmware is only
//!   reachable through the guard returned by [`Runtime::enter`].
//! - [`firmware`] abstracts the runtime-services table behind the
//!   [`RuntimeFirmware`] trait.
//! - [`esrt`] keeps a kernel-owned copy of the EFI System Resource Table.
//! - [`vars`] reads, writes and enumerates firmware variables.
//! - [`clock`] exposes the firmware clock as a time-of-day source.
//! - [`ioctl`] validates and dispatches requests of the `efi` device.
//!
//! [`Efi::attach`] ties all of these together.
//!
//! ## Testing
//!
//! The [`stub`] module provides a deterministic machine and firmware that
//! run on the host. The crate's own tests are built on it.
//!
//! [`Runtime::enter`]: context::Runtime::enter
//! [`RuntimeFirmware`]: firmware::RuntimeFirmware

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(
    clippy::all,
    clippy::must_use_candidate,
    clippy::ptr_as_ptr,
    clippy::use_self,
    missing_debug_implementations,
    unused
)]

extern crate alloc;

pub mod clock;
pub mod context;
pub mod esrt;
pub mod firmware;
pub mod ioctl;
pub mod mem;
pub mod stub;
pub mod vars;

mod config;
mod driver;
mod result;

pub use config::Config;
pub use driver::{AttachError, Efi, EfiInfo};
pub use result::{Error, Result, StatusExt};

pub use efirt_raw::{guid, Char16, Guid, PhysicalAddress, Status};
