// SPDX-License-Identifier: MIT OR Apache-2.0

//! The EFI System Resource Table.
//!
//! The table is a [`EsrtHeader`] immediately followed by
//! `fw_resource_count` packed [`EsrtEntry`] records, one per updatable
//! firmware component. It is published through the configuration table
//! under [`ESRT_GUID`].

use crate::{guid, Guid};
use bitflags::bitflags;

/// Configuration table GUID of the ESRT.
pub const ESRT_GUID: Guid = guid!("b122a263-3661-4f68-9929-78f8b0d62180");

/// Fixed-size header at the start of the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct EsrtHeader {
    /// Number of entries that follow the header.
    pub fw_resource_count: u32,
    /// Number of entries the firmware allocated room for.
    pub fw_resource_count_max: u32,
    /// Table format version.
    pub fw_resource_version: u64,
}

impl EsrtHeader {
    /// The only table format version defined so far.
    pub const FIRMWARE_RESOURCE_VERSION: u64 = 1;
}

/// One updatable firmware component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct EsrtEntry {
    /// Identifies the firmware component targeted by capsules.
    pub fw_class: Guid,
    pub fw_type: FirmwareType,
    pub fw_version: u32,
    pub lowest_supported_fw_version: u32,
    pub capsule_flags: u32,
    pub last_attempt_version: u32,
    pub last_attempt_status: LastAttemptStatus,
}

impl EsrtEntry {
    /// The capsule flags with only the architecturally defined bits kept.
    #[must_use]
    pub const fn flags(&self) -> EsrtCapsuleFlags {
        EsrtCapsuleFlags::from_bits_truncate(self.capsule_flags)
    }
}

newtype_enum! {
    /// Kind of firmware described by an [`EsrtEntry`].
    pub enum FirmwareType: u32 => {
        UNKNOWN = 0,
        SYSTEM_FIRMWARE = 1,
        DEVICE_FIRMWARE = 2,
        UEFI_DRIVER = 3,
    }
}

impl Default for FirmwareType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

newtype_enum! {
    /// Outcome of the most recent update attempt.
    pub enum LastAttemptStatus: u32 => {
        SUCCESS = 0,
        ERROR_UNSUCCESSFUL = 1,
        ERROR_INSUFFICIENT_RESOURCES = 2,
        ERROR_INCORRECT_VERSION = 3,
        ERROR_INVALID_FORMAT = 4,
        ERROR_AUTH_ERROR = 5,
        ERROR_PWR_EVT_AC = 6,
        ERROR_PWR_EVT_BATT = 7,
        ERROR_UNSATISFIED_DEPENDENCIES = 8,
    }
}

impl Default for LastAttemptStatus {
    fn default() -> Self {
        Self::SUCCESS
    }
}

bitflags! {
    /// Architecturally defined bits of [`EsrtEntry::capsule_flags`].
    ///
    /// Bits `0..=15` are specific to the firmware class.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct EsrtCapsuleFlags: u32 {
        /// The capsule persists across a system reset.
        const PERSIST_ACROSS_RESET = 1 << 16;
        /// The capsule is published in the configuration table after reset.
        const POPULATE_SYSTEM_TABLE = 1 << 17;
        /// The firmware resets the system to process the capsule.
        const INITIATE_RESET = 1 << 18;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn layout() {
        assert_eq!(size_of::<EsrtHeader>(), 16);
        assert_eq!(size_of::<EsrtEntry>(), 40);
        assert_eq!(offset_of!(EsrtEntry, fw_type), 16);
        assert_eq!(offset_of!(EsrtEntry, last_attempt_status), 36);
    }

    #[test]
    fn capsule_flags_drop_class_specific_bits() {
        let entry = EsrtEntry {
            capsule_flags: 0x0003_0001,
            ..Default::default()
        };
        assert_eq!(
            entry.flags(),
            EsrtCapsuleFlags::PERSIST_ACROSS_RESET | EsrtCapsuleFlags::POPULATE_SYSTEM_TABLE
        );
    }
}
