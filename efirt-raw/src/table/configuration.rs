// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Guid;
use core::ffi::c_void;

/// One entry of the configuration table array.
///
/// `vendor_table` points into firmware memory and is only meaningful while
/// the runtime mapping is active.
#[derive(Debug, Eq, PartialEq)]
#[repr(C)]
pub struct ConfigurationTable {
    pub vendor_guid: Guid,
    pub vendor_table: *mut c_void,
}
