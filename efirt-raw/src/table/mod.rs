// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firmware tables reachable from the system table.

mod header;

pub mod configuration;
pub mod runtime;
pub mod system;

pub use header::{Header, Revision};
