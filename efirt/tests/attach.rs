// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use common::*;
use efirt::esrt::{EsrtEntry, FirmwareType, LastAttemptStatus, ESRT_GUID};
use efirt::mem::{CacheMode, Protection};
use efirt::stub::{StubFirmware, StubMachine, StubPageMapper, RUNTIME_SERVICES_ADDR};
use efirt::{guid, AttachError, Config, Efi, EfiInfo, Error};
use efirt_raw::table::runtime::ResetType;
use efirt_raw::table::Revision;
use efirt_raw::Status;

fn capsule_entry(version: u32) -> EsrtEntry {
    EsrtEntry {
        fw_class: guid!("6d7e3e8e-1f3b-4a2c-9b55-0c4f2e0a7d11"),
        fw_type: FirmwareType::SYSTEM_FIRMWARE,
        fw_version: version,
        lowest_supported_fw_version: 1,
        capsule_flags: 0x0001_0000,
        last_attempt_version: version,
        last_attempt_status: LastAttemptStatus::SUCCESS,
    }
}

#[test]
fn banner_fields() {
    let p = attach(Config::default());
    assert_eq!(p.efi.revision(), Revision::EFI_2_70);
    assert_eq!(p.efi.firmware_vendor(), "EDK II");
    assert_eq!(p.efi.firmware_revision(), 0x0001_0000);
    assert_eq!(p.firmware.runtime_services(), Some(RUNTIME_SERVICES_ADDR));
    assert!(p.efi.esrt().is_none());
    assert_eq!(p.firmware.violations(), 0);
}

#[test]
fn runtime_mapping_built() {
    let p = attach(Config::default());
    let regions = p.efi.mapping().regions();
    // Code, data and NVS; conventional memory stays out.
    assert_eq!(regions.len(), 3);
    assert_eq!(p.efi.mapping().root(), RUNTIME_ROOT);
    assert_eq!(p.mapper.pages.len(), 4 + 16 + 2);

    let code = p.efi.mapping().region_of(CODE_BASE + 0x10).unwrap();
    assert!(code.protection.contains(Protection::EXECUTE));
    let data = p.efi.mapping().region_of(DATA_BASE).unwrap();
    assert_eq!(data.protection, Protection::READ | Protection::WRITE);
    assert_eq!(data.cache, CacheMode::WriteBack);
    let nvs = p.efi.mapping().region_of(NVS_BASE).unwrap();
    assert_eq!(nvs.cache, CacheMode::Uncached);
    assert!(!p.efi.mapping().contains(0x10_0000));
}

#[test]
fn context_restored_after_attach() {
    let p = attach(Config::default());
    assert!(p.machine.interrupts_enabled());
    assert_eq!(p.machine.root(), KERNEL_ROOT);
    assert!(!p.machine.fpu_in_firmware());
    assert!(p.machine.enters() >= 1);
}

#[test]
fn esrt_from_boot_info() {
    let entries = [capsule_entry(7), capsule_entry(9)];
    let p = attach_with(Config::default(), Some(ESRT_ADDR), |fw| {
        fw.install_system_table(SYSTEM_TABLE, Revision::EFI_2_70, "EDK II", 1, &[]);
        fw.install_esrt(ESRT_ADDR, 1, &entries);
    });

    let esrt = p.efi.esrt().expect("no ESRT");
    assert_eq!(esrt.len(), 16 + 2 * 40);
    assert_eq!(esrt.header().fw_resource_count, 2);
    let copied: Vec<_> = esrt.entries().collect();
    assert_eq!(copied, entries);
    assert_eq!(p.firmware.violations(), 0);
}

#[test]
fn esrt_from_configuration_table() {
    let p = attach_with(Config::default(), None, |fw| {
        fw.install_system_table(
            SYSTEM_TABLE,
            Revision::EFI_2_80,
            "Vendor",
            2,
            &[
                (guid!("8868e871-e4f1-11d3-bc22-0080c73c8881"), DATA_BASE + 0x6000),
                (ESRT_GUID, ESRT_ADDR),
            ],
        );
        fw.install_esrt(ESRT_ADDR, 1, &[capsule_entry(3)]);
    });

    let esrt = p.efi.esrt().expect("no ESRT");
    assert_eq!(esrt.entries().len(), 1);
    assert_eq!(esrt.entries().next().unwrap().fw_version, 3);
}

#[test]
fn null_esrt_pointer_falls_back_to_configuration_table() {
    let p = attach_with(Config::default(), Some(0), |fw| {
        fw.install_system_table(
            SYSTEM_TABLE,
            Revision::EFI_2_70,
            "EDK II",
            1,
            &[(ESRT_GUID, ESRT_ADDR)],
        );
        fw.install_esrt(ESRT_ADDR, 1, &[capsule_entry(5)]);
    });

    let esrt = p.efi.esrt().expect("no ESRT");
    assert_eq!(esrt.entries().next().unwrap().fw_version, 5);
}

#[test]
fn esrt_unknown_version_ignored() {
    let p = attach_with(Config::default(), Some(ESRT_ADDR), |fw| {
        fw.install_system_table(SYSTEM_TABLE, Revision::EFI_2_70, "EDK II", 1, &[]);
        fw.install_esrt(ESRT_ADDR, 2, &[capsule_entry(1)]);
    });
    assert!(p.efi.esrt().is_none());
}

#[test]
fn esrt_empty_table() {
    let p = attach_with(Config::default(), Some(ESRT_ADDR), |fw| {
        fw.install_system_table(SYSTEM_TABLE, Revision::EFI_2_70, "EDK II", 1, &[]);
        fw.install_esrt(ESRT_ADDR, 1, &[]);
    });
    let esrt = p.efi.esrt().unwrap();
    assert_eq!(esrt.len(), 16);
    assert_eq!(esrt.entries().len(), 0);
}

#[test]
fn bad_system_table_signature() {
    let machine = StubMachine::new(KERNEL_ROOT);
    let firmware = StubFirmware::new();
    let mut mapper = StubPageMapper::new(RUNTIME_ROOT);
    let (map, meta) = default_map();
    let info = EfiInfo {
        system_table: SYSTEM_TABLE,
        memory_map: &map,
        memory_map_meta: meta,
        esrt: None,
    };

    let err = Efi::attach(machine.clone(), firmware, &mut mapper, &info, Config::default())
        .unwrap_err();
    assert_eq!(err, AttachError::SystemTable(SYSTEM_TABLE));
    // The bracket was left even on the error path.
    assert_eq!(machine.root(), KERNEL_ROOT);
    assert!(machine.interrupts_enabled());
}

#[test]
fn mapping_failure_is_fatal() {
    let machine = StubMachine::new(KERNEL_ROOT);
    let firmware = StubFirmware::new();
    firmware.install_system_table(SYSTEM_TABLE, Revision::EFI_2_70, "EDK II", 1, &[]);
    let mut mapper = StubPageMapper::new(RUNTIME_ROOT);
    mapper.fail_at = Some(DATA_BASE + 0x3000);
    let (map, meta) = default_map();
    let info = EfiInfo {
        system_table: SYSTEM_TABLE,
        memory_map: &map,
        memory_map_meta: meta,
        esrt: None,
    };

    match Efi::attach(machine.clone(), firmware.clone(), &mut mapper, &info, Config::default()) {
        Err(AttachError::Mapping(e)) => {
            assert_eq!(e.va, DATA_BASE + 0x3000);
            assert_eq!(e.error, Error::OutOfMemory);
        }
        other => panic!("unexpected {other:?}"),
    }
    // Firmware was never entered.
    assert_eq!(machine.enters(), 0);
    assert_eq!(firmware.runtime_services(), None);
}

#[test]
fn bad_descriptor_version() {
    let (map, mut meta) = default_map();
    meta.desc_version = 2;
    let info = EfiInfo {
        system_table: SYSTEM_TABLE,
        memory_map: &map,
        memory_map_meta: meta,
        esrt: None,
    };
    let err = Efi::attach(
        StubMachine::new(KERNEL_ROOT),
        StubFirmware::new(),
        &mut StubPageMapper::new(RUNTIME_ROOT),
        &info,
        Config::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AttachError::MemoryMap(_)));
}

#[test]
fn reset_forwarded() {
    let p = attach(Config::default());
    p.efi.reset_system(ResetType::WARM).unwrap();
    assert_eq!(p.firmware.last_reset(), Some((ResetType::WARM, Status::SUCCESS)));
    assert_eq!(p.firmware.violations(), 0);
}
