// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use common::*;
use efirt::stub::NameQuirk;
use efirt::vars::{GetVariable, VariableAttributes, VariableIdentifier, VariableName, VariableVendor};
use efirt::{Config, Error, Status};
use proptest::prelude::*;
use std::collections::BTreeSet;

const NV_BS_RT: VariableAttributes = VariableAttributes::NON_VOLATILE
    .union(VariableAttributes::BOOTSERVICE_ACCESS)
    .union(VariableAttributes::RUNTIME_ACCESS);

fn id(name: &str) -> VariableIdentifier {
    VariableIdentifier::parse(VariableVendor::GLOBAL_VARIABLE, name).unwrap()
}

fn with_timeout() -> Platform {
    let p = attach(Config::default());
    let timeout = id("Timeout");
    p.firmware.insert_variable(
        timeout.vendor,
        timeout.name.as_units_with_nul(),
        NV_BS_RT,
        &[5, 0],
    );
    p
}

#[test]
fn get_existing() {
    let p = with_timeout();
    let mut buf = [0; 16];
    let got = p.efi.get_variable(&id("Timeout"), &mut buf).unwrap();
    assert_eq!(
        got,
        GetVariable::Value {
            size: 2,
            attributes: NV_BS_RT
        }
    );
    assert_eq!(&buf[..2], &[5, 0]);
    assert_eq!(p.firmware.violations(), 0);
}

#[test]
fn get_reports_size_needed() {
    let p = with_timeout();
    let mut buf = [0xaa; 1];
    assert_eq!(
        p.efi.get_variable(&id("Timeout"), &mut buf),
        Ok(GetVariable::SizeNeeded(2))
    );
    // Nothing copied.
    assert_eq!(buf, [0xaa]);
    assert_eq!(p.efi.get_variable(&id("Timeout"), &mut []), Ok(GetVariable::SizeNeeded(2)));
}

#[test]
fn get_missing() {
    let p = with_timeout();
    assert_eq!(p.efi.get_variable(&id("BootOrder"), &mut [0; 8]), Err(Error::NotFound));
}

#[test]
fn read_whole_variable() {
    let p = with_timeout();
    let (data, attributes) = p.efi.read_variable(&id("Timeout")).unwrap();
    assert_eq!(data, [5, 0]);
    assert_eq!(attributes, NV_BS_RT);
    // One call to learn the size, one to read.
    assert_eq!(p.firmware.calls().get_variable, 2);
}

#[test]
fn read_empty_variable() {
    let p = attach(Config::default());
    let var = id("Empty");
    p.firmware
        .insert_variable(var.vendor, var.name.as_units_with_nul(), NV_BS_RT, &[]);
    assert_eq!(p.efi.read_variable(&var), Ok((vec![], NV_BS_RT)));
    assert_eq!(p.firmware.calls().get_variable, 1);
}

#[test]
fn oversized_name_never_reaches_firmware() {
    let p = attach(Config {
        max_name_size: 16,
        ..Config::default()
    });
    let long = id("ABCDEFGHIJ");
    assert_eq!(p.efi.get_variable(&long, &mut [0; 4]), Err(Error::InvalidArgument));
    assert_eq!(p.efi.set_variable(&long, NV_BS_RT, &[1]), Err(Error::InvalidArgument));
    assert_eq!(p.efi.next_variable(&long), Err(Error::InvalidArgument));
    assert_eq!(p.firmware.calls().variable_calls(), 0);
}

#[test]
fn set_then_get() {
    let p = attach(Config::default());
    let var = id("BootNext");
    p.efi.set_variable(&var, NV_BS_RT, &[1, 0]).unwrap();
    assert_eq!(
        p.firmware.variable(var.vendor, var.name.as_units_with_nul()),
        Some((NV_BS_RT, vec![1, 0]))
    );

    p.efi
        .set_variable(&var, NV_BS_RT | VariableAttributes::APPEND_WRITE, &[2, 0])
        .unwrap();
    let (data, _) = p.efi.read_variable(&var).unwrap();
    assert_eq!(data, [1, 0, 2, 0]);
}

#[test]
fn delete_then_not_found() {
    let p = with_timeout();
    p.efi.delete_variable(&id("Timeout")).unwrap();
    assert_eq!(p.efi.get_variable(&id("Timeout"), &mut [0; 8]), Err(Error::NotFound));
    assert_eq!(p.efi.delete_variable(&id("Timeout")), Err(Error::NotFound));
    assert_eq!(p.firmware.variable_count(), 0);
}

#[test]
fn securelevel_refuses_writes() {
    let p = with_timeout();
    p.machine.set_securelevel(1);
    assert_eq!(
        p.efi.set_variable(&id("Timeout"), NV_BS_RT, &[9, 0]),
        Err(Error::NotPermitted)
    );
    assert_eq!(p.efi.delete_variable(&id("Timeout")), Err(Error::NotPermitted));
    assert_eq!(p.firmware.calls().set_variable, 0);

    // Reads are still allowed.
    assert!(p.efi.read_variable(&id("Timeout")).is_ok());

    p.machine.set_securelevel(0);
    assert!(p.efi.set_variable(&id("Timeout"), NV_BS_RT, &[9, 0]).is_ok());
}

#[test]
fn status_translated() {
    let p = with_timeout();
    for (status, error) in [
        (Status::DEVICE_ERROR, Error::Io),
        (Status::WRITE_PROTECTED, Error::ReadOnly),
        (Status::OUT_OF_RESOURCES, Error::TryAgain),
        (Status::SECURITY_VIOLATION, Error::PermissionDenied),
        (Status::UNSUPPORTED, Error::NotImplemented),
        (Status(0x1234), Error::InvalidSequence),
    ] {
        p.firmware.force_status(Some(status));
        assert_eq!(p.efi.get_variable(&id("Timeout"), &mut [0; 8]), Err(error), "{status:?}");
    }
}

fn populate(p: &Platform, names: &[&str]) {
    for name in names {
        let v = id(name);
        p.firmware
            .insert_variable(v.vendor, v.name.as_units_with_nul(), NV_BS_RT, &[0]);
    }
}

#[test]
fn enumerate_all() {
    let p = attach(Config::default());
    populate(&p, &["Boot0000", "Boot0001", "BootOrder", "Lang", "Timeout"]);
    let other = VariableIdentifier::parse(VariableVendor::IMAGE_SECURITY_DATABASE, "db").unwrap();
    p.firmware
        .insert_variable(other.vendor, other.name.as_units_with_nul(), NV_BS_RT, &[0]);

    let keys = p.efi.variable_keys().unwrap();
    assert_eq!(keys.len(), 6);
    assert!(keys.contains(&other));
    let mut sorted = keys.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 6);
    assert_eq!(p.firmware.violations(), 0);
}

#[test]
fn enumerate_empty_store() {
    let p = attach(Config::default());
    assert_eq!(p.efi.next_variable(&VariableIdentifier::default()), Ok(None));
    assert_eq!(p.efi.variable_keys(), Ok(vec![]));
}

#[test]
fn enumeration_grows_name_buffer() {
    let p = attach(Config {
        initial_name_capacity: 4,
        ..Config::default()
    });
    populate(&p, &["AVeryLongVariableName"]);

    let first = p.efi.next_variable(&VariableIdentifier::default()).unwrap();
    assert_eq!(first, Some(id("AVeryLongVariableName")));
    // Too small once, then right.
    assert_eq!(p.firmware.calls().get_next_variable_name, 2);
}

#[test]
fn enumeration_growth_is_capped() {
    let p = attach(Config {
        max_name_growth: 3,
        ..Config::default()
    });
    populate(&p, &["Timeout"]);
    p.firmware.set_name_quirk(NameQuirk::AlwaysGrow);

    assert_eq!(
        p.efi.next_variable(&VariableIdentifier::default()),
        Err(Error::ValueTooLarge)
    );
    assert_eq!(p.firmware.calls().get_next_variable_name, 4);
}

#[test]
fn enumeration_rejects_names_over_limit() {
    let p = attach(Config {
        initial_name_capacity: 4,
        max_name_size: 16,
        ..Config::default()
    });
    populate(&p, &["AVeryLongVariableName"]);
    assert_eq!(
        p.efi.next_variable(&VariableIdentifier::default()),
        Err(Error::ValueTooLarge)
    );
}

#[test]
fn enumeration_inconsistent_size() {
    let p = attach(Config::default());
    populate(&p, &["Timeout"]);
    p.firmware.set_name_quirk(NameQuirk::ShrinkingSize);
    assert_eq!(
        p.efi.next_variable(&VariableIdentifier::default()),
        Err(Error::Io)
    );
}

#[test]
fn enumeration_loop_detected() {
    let p = attach(Config::default());
    populate(&p, &["Boot0000", "Timeout"]);
    p.firmware.set_name_quirk(NameQuirk::Repeat);
    assert_eq!(p.efi.variable_keys(), Err(Error::Io));
}

#[test]
fn utf8_names() {
    let name = VariableName::encode("Größe").unwrap();
    assert_eq!(name.to_utf8().unwrap(), "Größe");
    assert_eq!(VariableName::encode("\u{10000}"), Err(Error::InvalidArgument));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn enumeration_visits_each_variable_once(
        names in prop::collection::btree_set("[A-Za-z0-9]{1,40}", 0..24),
        initial_name_capacity in 1usize..48,
    ) {
        let p = attach(Config {
            initial_name_capacity,
            ..Config::default()
        });
        let names: Vec<_> = names.iter().map(String::as_str).collect();
        populate(&p, &names);

        let keys = p.efi.variable_keys().unwrap();
        let found: BTreeSet<String> = keys.iter().map(|k| k.name.to_utf8().unwrap()).collect();
        prop_assert_eq!(keys.len(), names.len());
        prop_assert_eq!(found.len(), names.len());
        prop_assert!(names.iter().all(|n| found.contains(*n)));
        prop_assert_eq!(p.firmware.violations(), 0);
    }
}
