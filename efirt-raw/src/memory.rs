// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory map descriptors.

use crate::PhysicalAddress;
use bitflags::bitflags;

/// Unit of [`MemoryDescriptor::page_count`], whatever page size the kernel
/// uses for its own mappings.
pub const PAGE_SIZE: u64 = 4096;

bitflags! {
    /// Attributes of a memory range.
    ///
    /// Only the bits the runtime mapping consults are named. Unknown bits are
    /// kept as firmware reported them.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemoryAttribute: u64 {
        // Cache modes the range supports.
        const UNCACHEABLE = 1 << 0;
        const WRITE_COMBINE = 1 << 1;
        const WRITE_THROUGH = 1 << 2;
        const WRITE_BACK = 1 << 3;

        // Protections the range asks for.
        const READ_PROTECT = 1 << 13;
        const EXECUTE_PROTECT = 1 << 14;
        const READ_ONLY = 1 << 17;

        /// Firmware touches the range while runtime services run.
        const RUNTIME = 1 << 63;
    }
}

/// One entry of the memory map.
///
/// Firmware may space entries further apart than `size_of::<Self>()`, so
/// never index a slice of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct MemoryDescriptor {
    pub ty: MemoryType,
    pub phys_start: PhysicalAddress,
    /// Where firmware expects the range once it runs in virtual mode, or
    /// zero if no address was assigned.
    pub virt_start: u64,
    /// Length in [`PAGE_SIZE`] units.
    pub page_count: u64,
    pub att: MemoryAttribute,
}

impl MemoryDescriptor {
    /// Descriptor layout version matching this struct.
    pub const VERSION: u32 = 1;
}

newtype_enum! {
/// What a memory range holds.
///
/// Values from `0x7000_0000` up are left to firmware and OS vendors.
pub enum MemoryType: u32 => {
    RESERVED = 0,
    LOADER_CODE = 1,
    LOADER_DATA = 2,
    BOOT_SERVICES_CODE = 3,
    BOOT_SERVICES_DATA = 4,
    /// Firmware code that stays callable after boot.
    RUNTIME_SERVICES_CODE = 5,
    /// Data that firmware code keeps using after boot.
    RUNTIME_SERVICES_DATA = 6,
    CONVENTIONAL = 7,
    UNUSABLE = 8,
    ACPI_RECLAIM = 9,
    /// ACPI NVS. Some firmware uses it at runtime without marking it.
    ACPI_NON_VOLATILE = 10,
    MMIO = 11,
    MMIO_PORT_SPACE = 12,
    PAL_CODE = 13,
    PERSISTENT_MEMORY = 14,
}}
