// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::table::configuration::ConfigurationTable;
use crate::table::runtime::RuntimeServices;
use crate::table::Header;
use crate::Char16;
use core::ffi::c_void;
use core::ptr;

/// The EFI system table.
///
/// Only the runtime-relevant members are typed. Console and boot-services
/// pointers are dead once the kernel owns the machine and are kept opaque.
#[derive(Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub struct SystemTable {
    pub header: Header,

    pub firmware_vendor: *const Char16,
    pub firmware_revision: u32,

    pub stdin_handle: *mut c_void,
    pub stdin: *mut c_void,

    pub stdout_handle: *mut c_void,
    pub stdout: *mut c_void,

    pub stderr_handle: *mut c_void,
    pub stderr: *mut c_void,

    pub runtime_services: *mut RuntimeServices,
    pub boot_services: *mut c_void,

    pub number_of_configuration_table_entries: usize,
    pub configuration_table: *mut ConfigurationTable,
}

impl SystemTable {
    pub const SIGNATURE: u64 = 0x5453_5953_2049_4249;
}

impl Default for SystemTable {
    /// Create a `SystemTable` with every pointer null and a valid signature.
    fn default() -> Self {
        Self {
            header: Header {
                signature: Self::SIGNATURE,
                size: core::mem::size_of::<Self>() as u32,
                ..Header::default()
            },

            firmware_vendor: ptr::null(),
            firmware_revision: 0,

            stdin_handle: ptr::null_mut(),
            stdin: ptr::null_mut(),

            stdout_handle: ptr::null_mut(),
            stdout: ptr::null_mut(),

            stderr_handle: ptr::null_mut(),
            stderr: ptr::null_mut(),

            runtime_services: ptr::null_mut(),
            boot_services: ptr::null_mut(),

            number_of_configuration_table_entries: 0,
            configuration_table: ptr::null_mut(),
        }
    }
}
