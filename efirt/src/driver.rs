// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::context::{Machine, Runtime, RuntimeGuard};
use crate::esrt::{EsrtSnapshot, ESRT_GUID};
use crate::firmware::RuntimeFirmware;
use crate::mem::{MapError, MemoryMapError, MemoryMapMeta, MemoryMapRef, PageMapper, RuntimeMapping};
use crate::{Config, Result, StatusExt};
use alloc::string::String;
use core::fmt::{self, Display, Formatter};
use core::mem::size_of;
use efirt_raw::table::configuration::ConfigurationTable;
use efirt_raw::table::runtime::ResetType;
use efirt_raw::table::system::SystemTable;
use efirt_raw::table::Revision;
use efirt_raw::{Char16, PhysicalAddress, Status};
use log::{error, info, warn};

/// Longest firmware vendor string read, in UCS-2 units.
const MAX_VENDOR_LEN: usize = 256;

/// Configuration table entries beyond this many are not searched.
const MAX_CONFIG_ENTRIES: usize = 1024;

/// What the boot loader hands over about the firmware.
#[derive(Clone, Copy, Debug)]
pub struct EfiInfo<'a> {
    /// Runtime virtual address of the system table.
    pub system_table: PhysicalAddress,
    /// The memory map, as returned by `GetMemoryMap`.
    pub memory_map: &'a [u8],
    pub memory_map_meta: MemoryMapMeta,
    /// The resource table, if the boot loader located it.
    pub esrt: Option<PhysicalAddress>,
}

/// Why [`Efi::attach`] failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachError {
    MemoryMap(MemoryMapError),
    Mapping(MapError),
    /// The system table at the given address has a bad signature.
    SystemTable(PhysicalAddress),
}

impl Display for AttachError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryMap(e) => write!(f, "bad memory map: {e}"),
            Self::Mapping(e) => write!(f, "runtime mapping failed: {e}"),
            Self::SystemTable(addr) => write!(f, "no system table at 0x{addr:x}"),
        }
    }
}

impl core::error::Error for AttachError {}

impl From<MemoryMapError> for AttachError {
    fn from(e: MemoryMapError) -> Self {
        Self::MemoryMap(e)
    }
}

impl From<MapError> for AttachError {
    fn from(e: MapError) -> Self {
        Self::Mapping(e)
    }
}

/// An attached firmware instance.
#[derive(Debug)]
pub struct Efi<M: Machine, F> {
    runtime: Runtime<M, F>,
    mapping: RuntimeMapping,
    esrt: Option<EsrtSnapshot>,
    revision: Revision,
    firmware_vendor: String,
    firmware_revision: u32,
    config: Config,
}

impl<M: Machine, F: RuntimeFirmware> Efi<M, F> {
    /// Brings up the runtime-services bridge.
    ///
    /// Builds the runtime mapping from the memory map, then switches into it
    /// once to read the system table and bind `firmware` to the services it
    /// names, and once more to copy out the resource table. A missing or
    /// unreadable resource table is not fatal.
    pub fn attach<P: PageMapper + ?Sized>(
        machine: M,
        firmware: F,
        mapper: &mut P,
        info: &EfiInfo<'_>,
        config: Config,
    ) -> core::result::Result<Self, AttachError> {
        let map = MemoryMapRef::new(info.memory_map, info.memory_map_meta)
            .inspect_err(|e| error!("efi: {e}"))?;
        let mapping = RuntimeMapping::build(&map, mapper).inspect_err(|e| error!("efi: {e}"))?;
        let runtime = Runtime::new(machine, firmware, mapping.root());

        let guard = runtime.enter();
        // SAFETY: the boot loader vouches for the system table, and it lives
        // in runtime data, which is mapped now.
        let st: SystemTable = unsafe { guard.read(info.system_table) };
        if st.header.signature != SystemTable::SIGNATURE {
            drop(guard);
            error!("efi: bad system table signature at 0x{:x}", info.system_table);
            return Err(AttachError::SystemTable(info.system_table));
        }
        guard.connect(&st);
        let firmware_vendor = read_vendor(&guard, st.firmware_vendor as u64);
        let esrt = info
            .esrt
            .filter(|&addr| addr != 0)
            .or_else(|| find_esrt(&guard, &st));
        drop(guard);

        info!("efi0: UEFI {}", st.header.revision);
        info!("efi0: {} rev 0x{:x}", firmware_vendor, st.firmware_revision);

        let esrt = match EsrtSnapshot::init(&runtime, esrt) {
            Ok(esrt) => esrt,
            Err(e) => {
                warn!("efi0: cannot copy ESRT: {e}");
                None
            }
        };
        if let Some(esrt) = &esrt {
            esrt.log_entries();
        }

        Ok(Self {
            runtime,
            mapping,
            esrt,
            revision: st.header.revision,
            firmware_vendor,
            firmware_revision: st.firmware_revision,
            config,
        })
    }

    /// The UEFI revision the system table conforms to.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    #[must_use]
    pub fn firmware_vendor(&self) -> &str {
        &self.firmware_vendor
    }

    #[must_use]
    pub const fn firmware_revision(&self) -> u32 {
        self.firmware_revision
    }

    #[must_use]
    pub const fn mapping(&self) -> &RuntimeMapping {
        &self.mapping
    }

    /// The resource table copied at attach, if the firmware has one.
    #[must_use]
    pub const fn esrt(&self) -> Option<&EsrtSnapshot> {
        self.esrt.as_ref()
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) const fn runtime(&self) -> &Runtime<M, F> {
        &self.runtime
    }

    /// Asks the firmware to reset the platform.
    ///
    /// Only returns if the firmware refused.
    pub fn reset_system(&self, ty: ResetType) -> Result {
        info!("efi0: reset {ty:?}");
        self.runtime
            .enter()
            .reset_system(ty, Status::SUCCESS, &[])
            .to_result()
    }
}

fn read_vendor<M: Machine, F: RuntimeFirmware>(guard: &RuntimeGuard<'_, M, F>, addr: u64) -> String {
    if addr == 0 {
        return String::new();
    }
    let units = (0..MAX_VENDOR_LEN as u64)
        // SAFETY: the vendor string lives in runtime data and is
        // NUL-terminated.
        .map(|i| unsafe { guard.read::<Char16>(addr + i * 2) })
        .take_while(|&c| c != 0);
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn find_esrt<M: Machine, F: RuntimeFirmware>(
    guard: &RuntimeGuard<'_, M, F>,
    st: &SystemTable,
) -> Option<PhysicalAddress> {
    let base = st.configuration_table as u64;
    if base == 0 {
        return None;
    }
    let count = st.number_of_configuration_table_entries.min(MAX_CONFIG_ENTRIES);
    (0..count as u64)
        .map(|i| base + i * size_of::<ConfigurationTable>() as u64)
        // SAFETY: the system table says `count` entries live at `base`.
        .map(|addr| unsafe { guard.read::<ConfigurationTable>(addr) })
        .find(|entry| entry.vendor_guid == ESRT_GUID)
        .map(|entry| entry.vendor_table as u64)
}
