// SPDX-License-Identifier: MIT OR Apache-2.0

//! A kernel-owned copy of the EFI System Resource Table.
//!
//! The firmware's copy is only readable while the runtime mapping is active,
//! but the table is read later from arbitrary contexts, so it is copied out
//! once at attach time and never touched in firmware memory again.

use crate::context::{Machine, Runtime};
use crate::firmware::RuntimeFirmware;
use crate::{Error, Result};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem::size_of;
use core::ptr;
pub use efirt_raw::esrt::{
    EsrtCapsuleFlags, EsrtEntry, EsrtHeader, FirmwareType, LastAttemptStatus, ESRT_GUID,
};
use efirt_raw::PhysicalAddress;

/// The resource table, header and entries, exactly as the firmware laid it
/// out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EsrtSnapshot {
    table: Box<[u8]>,
}

impl EsrtSnapshot {
    /// Copies the table at `addr` out of firmware memory.
    ///
    /// A missing or zero address means there is no table: `Ok(None)`. So
    /// does a table in a format version this crate does not know.
    pub fn init<M: Machine, F: RuntimeFirmware>(
        runtime: &Runtime<M, F>,
        addr: Option<PhysicalAddress>,
    ) -> Result<Option<Self>> {
        let Some(addr) = addr.filter(|&a| a != 0) else {
            return Ok(None);
        };

        let guard = runtime.enter();
        // SAFETY: the boot loader or the configuration table vouches for a
        // table at `addr`, and the guard keeps the runtime mapping active.
        let header: EsrtHeader = unsafe { guard.read(addr) };
        if header.fw_resource_version != EsrtHeader::FIRMWARE_RESOURCE_VERSION {
            drop(guard);
            log::warn!(
                "efi: ignoring ESRT version {}",
                header.fw_resource_version
            );
            return Ok(None);
        }

        let len = usize::try_from(header.fw_resource_count)
            .ok()
            .and_then(|n| n.checked_mul(size_of::<EsrtEntry>()))
            .and_then(|n| n.checked_add(size_of::<EsrtHeader>()))
            .ok_or(Error::OutOfMemory)?;
        let mut table = Vec::new();
        table.try_reserve_exact(len)?;
        table.resize(len, 0);
        // SAFETY: as above; the header claims `len` bytes.
        unsafe { guard.read_memory(addr, &mut table) };
        drop(guard);

        Ok(Some(Self {
            table: table.into_boxed_slice(),
        }))
    }

    /// The raw table.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.table
    }

    /// Size of the table in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[must_use]
    pub fn header(&self) -> EsrtHeader {
        // SAFETY: the table is at least one header long and every bit
        // pattern is a valid header.
        unsafe { ptr::read_unaligned(self.table.as_ptr().cast::<EsrtHeader>()) }
    }

    /// The entries, decoded.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = EsrtEntry> + '_ {
        self.table[size_of::<EsrtHeader>()..]
            .chunks_exact(size_of::<EsrtEntry>())
            // SAFETY: each chunk is exactly one entry and every bit pattern
            // is a valid entry.
            .map(|chunk| unsafe { ptr::read_unaligned(chunk.as_ptr().cast::<EsrtEntry>()) })
    }

    pub(crate) fn log_entries(&self) {
        for (i, entry) in self.entries().enumerate() {
            log::debug!(
                "efi: esrt[{i}] {} {:?} version 0x{:x} lowest 0x{:x} last 0x{:x} {:?}",
                entry.fw_class,
                entry.fw_type,
                entry.fw_version,
                entry.lowest_supported_fw_version,
                entry.last_attempt_version,
                entry.last_attempt_status
            );
        }
    }
}
