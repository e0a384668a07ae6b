// SPDX-License-Identifier: MIT OR Apache-2.0

//! The isolated address space firmware code runs in.
//!
//! Every descriptor that firmware marks [`MemoryAttribute::RUNTIME`], plus
//! every ACPI NVS range, is entered into a dedicated page table that is only
//! active between `enter()` and `leave()`.

use super::memory_map::{MemoryAttribute, MemoryDescriptor, MemoryMapRef, MemoryType, PAGE_SIZE};
use crate::Result;
use alloc::vec::Vec;
use bitflags::bitflags;
use core::fmt::{self, Display, Formatter};

bitflags! {
    /// Access rights of a runtime page.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Protection: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

/// Memory type a runtime page is entered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// Normal cacheable memory.
    WriteBack,
    /// Device-like memory that bypasses the caches.
    Uncached,
}

/// A range of the runtime address space and the policy it is mapped with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeRegion {
    pub ty: MemoryType,
    pub virt_start: u64,
    pub phys_start: u64,
    pub page_count: u64,
    pub protection: Protection,
    pub cache: CacheMode,
}

impl RuntimeRegion {
    /// Applies the mapping policy to one descriptor.
    ///
    /// Returns `None` for descriptors that are neither runtime-visible nor
    /// ACPI NVS.
    ///
    /// Execute permission follows the descriptor *type* rather than the
    /// absence of [`MemoryAttribute::EXECUTE_PROTECT`]: some firmware does
    /// not describe its own code pages correctly.
    #[must_use]
    pub fn from_descriptor(desc: &MemoryDescriptor) -> Option<Self> {
        if !desc.att.contains(MemoryAttribute::RUNTIME) && desc.ty != MemoryType::ACPI_NON_VOLATILE
        {
            return None;
        }

        let mut protection = Protection::READ | Protection::WRITE;
        if desc.ty == MemoryType::RUNTIME_SERVICES_CODE {
            protection |= Protection::EXECUTE;
        }
        if desc.att.contains(MemoryAttribute::READ_PROTECT) {
            protection.remove(Protection::READ);
        }
        if desc.att.contains(MemoryAttribute::EXECUTE_PROTECT) {
            protection.remove(Protection::EXECUTE);
        }
        if desc.att.contains(MemoryAttribute::READ_ONLY) {
            protection.remove(Protection::WRITE);
        }

        let cache = if desc.att.contains(MemoryAttribute::WRITE_BACK) {
            CacheMode::WriteBack
        } else {
            CacheMode::Uncached
        };

        let virt_start = match desc.virt_start {
            0 => desc.phys_start,
            va => va,
        };

        Some(Self {
            ty: desc.ty,
            virt_start,
            phys_start: desc.phys_start,
            page_count: desc.page_count,
            protection,
            cache,
        })
    }

    /// Whether `va` lies inside this region.
    #[must_use]
    pub fn contains(&self, va: u64) -> bool {
        let len = self.page_count.saturating_mul(PAGE_SIZE);
        va >= self.virt_start && va - self.virt_start < len
    }
}

/// The kernel's page-table manager, as far as the runtime mapping needs it.
pub trait PageMapper {
    /// Enters one 4 KiB page into the runtime address space.
    fn map_page(&mut self, va: u64, pa: u64, protection: Protection, cache: CacheMode) -> Result;

    /// The address-space root to activate when entering firmware.
    fn root(&self) -> u64;
}

/// A page the kernel's page-table manager refused to map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapError {
    pub va: u64,
    pub pa: u64,
    pub error: crate::Error,
}

impl Display for MapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "cannot map 0x{:x} -> 0x{:x}: {}", self.va, self.pa, self.error)
    }
}

impl core::error::Error for MapError {}

/// The isolated runtime address space, fully populated.
#[derive(Debug)]
pub struct RuntimeMapping {
    regions: Vec<RuntimeRegion>,
    root: u64,
}

impl RuntimeMapping {
    /// Maps every runtime-visible descriptor of `map` through `mapper`.
    ///
    /// On error the mapping is not returned, so nothing can ever switch to a
    /// half-built address space.
    pub fn build<P: PageMapper + ?Sized>(
        map: &MemoryMapRef<'_>,
        mapper: &mut P,
    ) -> core::result::Result<Self, MapError> {
        let mut regions = Vec::new();
        for region in map.entries().filter_map(|d| RuntimeRegion::from_descriptor(&d)) {
            for page in 0..region.page_count {
                let offset = page * PAGE_SIZE;
                let (va, pa) = (region.virt_start + offset, region.phys_start + offset);
                mapper
                    .map_page(va, pa, region.protection, region.cache)
                    .map_err(|error| MapError { va, pa, error })?;
            }
            log::trace!(
                "efi: runtime {:?} va 0x{:x} pa 0x{:x} pages {} {:?} {:?}",
                region.ty,
                region.virt_start,
                region.phys_start,
                region.page_count,
                region.protection,
                region.cache
            );
            regions.push(region);
        }

        Ok(Self {
            regions,
            root: mapper.root(),
        })
    }

    /// The regions that were mapped, in memory map order.
    #[must_use]
    pub fn regions(&self) -> &[RuntimeRegion] {
        &self.regions
    }

    /// The address-space root of the runtime page table.
    #[must_use]
    pub const fn root(&self) -> u64 {
        self.root
    }

    /// Finds the region containing `va`.
    #[must_use]
    pub fn region_of(&self, va: u64) -> Option<&RuntimeRegion> {
        self.regions.iter().find(|r| r.contains(va))
    }

    /// Whether `va` is mapped in the runtime address space.
    #[must_use]
    pub fn contains(&self, va: u64) -> bool {
        self.region_of(va).is_some()
    }
}
