// SPDX-License-Identifier: MIT OR Apache-2.0

//! A small firmware image on the stub platform.

#![allow(dead_code)]

use core::mem::{offset_of, size_of};
use efirt::mem::memory_map::{MemoryAttribute, MemoryDescriptor, MemoryType};
use efirt::mem::MemoryMapMeta;
use efirt::stub::{StubFirmware, StubMachine, StubPageMapper};
use efirt::{Config, Efi, EfiInfo};
use efirt_raw::table::Revision;

pub const KERNEL_ROOT: u64 = 0x1000;
pub const RUNTIME_ROOT: u64 = 0x2000;

pub const CODE_BASE: u64 = 0x7e00_0000;
pub const DATA_BASE: u64 = 0x7f00_0000;
pub const NVS_BASE: u64 = 0x7fe0_0000;

pub const SYSTEM_TABLE: u64 = DATA_BASE;
pub const ESRT_ADDR: u64 = DATA_BASE + 0x8000;

/// Stride used by real firmware, larger than the descriptor.
pub const DESC_SIZE: usize = 48;

pub fn memory_map(descs: &[MemoryDescriptor]) -> (Vec<u8>, MemoryMapMeta) {
    let mut buf = vec![0; descs.len() * DESC_SIZE];
    for (i, d) in descs.iter().enumerate() {
        let base = i * DESC_SIZE;
        let mut put = |offset: usize, bytes: &[u8]| {
            buf[base + offset..base + offset + bytes.len()].copy_from_slice(bytes);
        };
        put(offset_of!(MemoryDescriptor, ty), &d.ty.0.to_ne_bytes());
        put(offset_of!(MemoryDescriptor, phys_start), &d.phys_start.to_ne_bytes());
        put(offset_of!(MemoryDescriptor, virt_start), &d.virt_start.to_ne_bytes());
        put(offset_of!(MemoryDescriptor, page_count), &d.page_count.to_ne_bytes());
        put(offset_of!(MemoryDescriptor, att), &d.att.bits().to_ne_bytes());
    }
    assert!(DESC_SIZE >= size_of::<MemoryDescriptor>());
    let meta = MemoryMapMeta {
        map_size: buf.len(),
        desc_size: DESC_SIZE,
        desc_version: MemoryDescriptor::VERSION,
    };
    (buf, meta)
}

pub fn desc(ty: MemoryType, phys_start: u64, page_count: u64, att: MemoryAttribute) -> MemoryDescriptor {
    MemoryDescriptor {
        ty,
        phys_start,
        virt_start: 0,
        page_count,
        att,
    }
}

pub fn default_map() -> (Vec<u8>, MemoryMapMeta) {
    memory_map(&[
        desc(MemoryType::CONVENTIONAL, 0x10_0000, 256, MemoryAttribute::WRITE_BACK),
        desc(
            MemoryType::RUNTIME_SERVICES_CODE,
            CODE_BASE,
            4,
            MemoryAttribute::RUNTIME | MemoryAttribute::WRITE_BACK,
        ),
        desc(
            MemoryType::RUNTIME_SERVICES_DATA,
            DATA_BASE,
            16,
            MemoryAttribute::RUNTIME | MemoryAttribute::WRITE_BACK,
        ),
        desc(MemoryType::ACPI_NON_VOLATILE, NVS_BASE, 2, MemoryAttribute::UNCACHEABLE),
    ])
}

pub struct Platform {
    pub machine: StubMachine,
    pub firmware: StubFirmware,
    pub mapper: StubPageMapper,
    pub efi: Efi<StubMachine, StubFirmware>,
}

/// Attaches to a firmware with a system table and no resource table.
pub fn attach(config: Config) -> Platform {
    attach_with(config, None, |fw| {
        fw.install_system_table(SYSTEM_TABLE, Revision::EFI_2_70, "EDK II", 0x0001_0000, &[]);
    })
}

pub fn attach_with(config: Config, esrt: Option<u64>, setup: impl FnOnce(&StubFirmware)) -> Platform {
    let machine = StubMachine::new(KERNEL_ROOT);
    let firmware = StubFirmware::new();
    firmware.watch(&machine, RUNTIME_ROOT);
    setup(&firmware);

    let mut mapper = StubPageMapper::new(RUNTIME_ROOT);
    let (map, meta) = default_map();
    let info = EfiInfo {
        system_table: SYSTEM_TABLE,
        memory_map: &map,
        memory_map_meta: meta,
        esrt,
    };
    let efi = Efi::attach(machine.clone(), firmware.clone(), &mut mapper, &info, config)
        .expect("attach failed");
    Platform {
        machine,
        firmware,
        mapper,
        efi,
    }
}
