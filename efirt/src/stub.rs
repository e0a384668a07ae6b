// SPDX-License-Identifier: MIT OR Apache-2.0

//! A deterministic platform for running the bridge on the host.
//!
//! [`StubMachine`] models interrupt disabling, the address-space root and
//! FPU ownership. Disabling interrupts nests, and they count as enabled
//! only once every disable has been restored, so threads sharing one
//! machine behave like CPUs that each restore only their own disable. [`StubFirmware`] keeps its variable store, clock and
//! memory in plain collections. It can be told to watch a [`StubMachine`],
//! in which case every call made while the machine is not in firmware
//! context is counted as a violation. [`StubPageMapper`] records what it is
//! asked to map.
//!
//! All three are cheap handles to shared state, so a test can keep a clone
//! after handing one to [`Efi::attach`](crate::Efi::attach).

use crate::context::{Entered, Machine};
use crate::firmware::RuntimeFirmware;
use crate::mem::{CacheMode, PageMapper, Protection};
use crate::{Error, Result};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem::{offset_of, size_of, size_of_val};
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use efirt_raw::esrt::{EsrtEntry, EsrtHeader};
use efirt_raw::table::configuration::ConfigurationTable;
use efirt_raw::table::runtime::{ResetType, VariableAttributes};
use efirt_raw::table::system::SystemTable;
use efirt_raw::table::{Header, Revision};
use efirt_raw::time::{Time, TimeCapabilities};
use efirt_raw::{Char16, Guid, Status};
use spin::Mutex;

#[derive(Debug)]
struct MachineState {
    interrupt_disables: AtomicUsize,
    root: AtomicU64,
    fpu_in_firmware: AtomicBool,
    securelevel: AtomicI32,
    enters: AtomicUsize,
}

/// One CPU, as far as entering firmware is concerned.
#[derive(Clone, Debug)]
pub struct StubMachine {
    state: Arc<MachineState>,
}

impl StubMachine {
    /// A CPU with interrupts enabled, running on address space `root`.
    #[must_use]
    pub fn new(root: u64) -> Self {
        Self {
            state: Arc::new(MachineState {
                interrupt_disables: AtomicUsize::new(0),
                root: AtomicU64::new(root),
                fpu_in_firmware: AtomicBool::new(false),
                securelevel: AtomicI32::new(0),
                enters: AtomicUsize::new(0),
            }),
        }
    }

    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.state.interrupt_disables.load(Ordering::SeqCst) == 0
    }

    #[must_use]
    pub fn root(&self) -> u64 {
        self.state.root.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fpu_in_firmware(&self) -> bool {
        self.state.fpu_in_firmware.load(Ordering::SeqCst)
    }

    /// How many times the FPU was handed to firmware.
    #[must_use]
    pub fn enters(&self) -> usize {
        self.state.enters.load(Ordering::SeqCst)
    }

    pub fn set_securelevel(&self, level: i32) {
        self.state.securelevel.store(level, Ordering::SeqCst);
    }
}

impl Machine for StubMachine {
    type InterruptState = ();

    fn disable_interrupts(&self) {
        self.state.interrupt_disables.fetch_add(1, Ordering::SeqCst);
    }

    fn restore_interrupts(&self, (): ()) {
        self.state.interrupt_disables.fetch_sub(1, Ordering::SeqCst);
    }

    fn address_space_root(&self) -> u64 {
        self.root()
    }

    fn load_address_space_root(&self, root: u64) {
        self.state.root.store(root, Ordering::SeqCst);
    }

    fn fpu_enter(&self) {
        self.state.enters.fetch_add(1, Ordering::SeqCst);
        self.state.fpu_in_firmware.store(true, Ordering::SeqCst);
    }

    fn fpu_leave(&self) {
        self.state.fpu_in_firmware.store(false, Ordering::SeqCst);
    }

    fn securelevel(&self) -> i32 {
        self.state.securelevel.load(Ordering::SeqCst)
    }
}

/// How many times each service was called.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_time: usize,
    pub set_time: usize,
    pub get_variable: usize,
    pub get_next_variable_name: usize,
    pub set_variable: usize,
    pub reset_system: usize,
}

impl CallCounts {
    /// Calls that touch the variable store.
    #[must_use]
    pub const fn variable_calls(&self) -> usize {
        self.get_variable + self.get_next_variable_name + self.set_variable
    }
}

/// Misbehaviors of `GetNextVariableName` seen in the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameQuirk {
    #[default]
    None,
    /// Always claims the buffer is two bytes too small.
    AlwaysGrow,
    /// Claims the buffer is too small but asks for the size it already has.
    ShrinkingSize,
    /// Returns the first variable forever.
    Repeat,
}

#[derive(Debug, Default)]
struct FirmwareState {
    variables: BTreeMap<(Guid, Vec<Char16>), (VariableAttributes, Vec<u8>)>,
    time: Option<Time>,
    time_status: Status,
    memory: BTreeMap<u64, Vec<u8>>,
    calls: CallCounts,
    name_quirk: NameQuirk,
    forced_status: Option<Status>,
    last_reset: Option<(ResetType, Status)>,
    runtime_services: Option<u64>,
    watched: Option<(StubMachine, u64)>,
    violations: usize,
}

impl FirmwareState {
    fn check_context(&mut self) {
        if let Some((machine, root)) = &self.watched {
            if machine.interrupts_enabled() || machine.root() != *root || !machine.fpu_in_firmware()
            {
                self.violations += 1;
            }
        }
    }
}

/// Firmware runtime services backed by host collections.
#[derive(Clone, Debug, Default)]
pub struct StubFirmware {
    state: Arc<Mutex<FirmwareState>>,
}

impl StubFirmware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a violation for every call made while `machine` is not in the
    /// firmware context rooted at `root`.
    pub fn watch(&self, machine: &StubMachine, root: u64) {
        self.state.lock().watched = Some((machine.clone(), root));
    }

    #[must_use]
    pub fn violations(&self) -> usize {
        self.state.lock().violations
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    pub fn insert_variable(
        &self,
        vendor: Guid,
        name: &[Char16],
        attributes: VariableAttributes,
        data: &[u8],
    ) {
        let mut key = name.to_vec();
        if key.last() != Some(&0) {
            key.push(0);
        }
        self.state
            .lock()
            .variables
            .insert((vendor, key), (attributes, data.to_vec()));
    }

    /// The stored value of a variable, with `name` NUL-terminated.
    #[must_use]
    pub fn variable(&self, vendor: Guid, name: &[Char16]) -> Option<(VariableAttributes, Vec<u8>)> {
        self.state
            .lock()
            .variables
            .get(&(vendor, name.to_vec()))
            .cloned()
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.state.lock().variables.len()
    }

    /// Sets the clock. `None` makes `GetTime` fail with `status`.
    pub fn set_clock(&self, time: Option<Time>, status: Status) {
        let mut state = self.state.lock();
        state.time = time;
        state.time_status = status;
    }

    #[must_use]
    pub fn clock(&self) -> Option<Time> {
        self.state.lock().time
    }

    pub fn set_name_quirk(&self, quirk: NameQuirk) {
        self.state.lock().name_quirk = quirk;
    }

    /// Makes every variable service return `status`.
    pub fn force_status(&self, status: Option<Status>) {
        self.state.lock().forced_status = status;
    }

    #[must_use]
    pub fn last_reset(&self) -> Option<(ResetType, Status)> {
        self.state.lock().last_reset
    }

    /// The runtime-services pointer received by `connect`.
    #[must_use]
    pub fn runtime_services(&self) -> Option<u64> {
        self.state.lock().runtime_services
    }

    /// Places `bytes` in firmware memory at `addr`.
    pub fn install_memory(&self, addr: u64, bytes: &[u8]) {
        self.state.lock().memory.insert(addr, bytes.to_vec());
    }

    /// Writes `value` at `offset`. Writes that would not fit are dropped.
    fn patch(bytes: &mut [u8], offset: usize, value: &[u8]) {
        let dst = offset
            .checked_add(value.len())
            .and_then(|end| bytes.get_mut(offset..end));
        if let Some(dst) = dst {
            dst.copy_from_slice(value);
        }
    }

    /// Lays out a system table at `addr`, its vendor string right after it
    /// and its configuration table right after that.
    pub fn install_system_table(
        &self,
        addr: u64,
        revision: Revision,
        vendor: &str,
        firmware_revision: u32,
        configuration: &[(Guid, u64)],
    ) {
        let st_len = size_of::<SystemTable>();
        let vendor_addr = addr + st_len as u64;
        let vendor_units: Vec<Char16> = vendor.encode_utf16().chain([0]).collect();
        let config_addr = vendor_addr + size_of_val(vendor_units.as_slice()) as u64;
        let config_addr = config_addr.next_multiple_of(8);

        let mut st = alloc::vec![0; st_len];
        let header = offset_of!(SystemTable, header);
        let patch = Self::patch;
        patch(
            &mut st,
            header + offset_of!(Header, signature),
            &SystemTable::SIGNATURE.to_ne_bytes(),
        );
        patch(&mut st, header + offset_of!(Header, revision), &revision.0.to_ne_bytes());
        patch(&mut st, header + offset_of!(Header, size), &(st_len as u32).to_ne_bytes());
        patch(
            &mut st,
            offset_of!(SystemTable, firmware_vendor),
            &(vendor_addr as usize).to_ne_bytes(),
        );
        patch(
            &mut st,
            offset_of!(SystemTable, firmware_revision),
            &firmware_revision.to_ne_bytes(),
        );
        patch(
            &mut st,
            offset_of!(SystemTable, runtime_services),
            &(RUNTIME_SERVICES_ADDR as usize).to_ne_bytes(),
        );
        patch(
            &mut st,
            offset_of!(SystemTable, number_of_configuration_table_entries),
            &configuration.len().to_ne_bytes(),
        );
        if !configuration.is_empty() {
            patch(
                &mut st,
                offset_of!(SystemTable, configuration_table),
                &(config_addr as usize).to_ne_bytes(),
            );
        }
        self.install_memory(addr, &st);

        let vendor_bytes: Vec<u8> = vendor_units.iter().flat_map(|c| c.to_ne_bytes()).collect();
        self.install_memory(vendor_addr, &vendor_bytes);

        let entry_len = size_of::<ConfigurationTable>();
        let mut table = alloc::vec![0; entry_len * configuration.len()];
        for (i, (guid, ptr)) in configuration.iter().enumerate() {
            let base = i * entry_len;
            patch(
                &mut table,
                base + offset_of!(ConfigurationTable, vendor_guid),
                &guid.to_bytes(),
            );
            patch(
                &mut table,
                base + offset_of!(ConfigurationTable, vendor_table),
                &(*ptr as usize).to_ne_bytes(),
            );
        }
        if !table.is_empty() {
            self.install_memory(config_addr, &table);
        }
    }

    /// Lays out a resource table at `addr`.
    pub fn install_esrt(&self, addr: u64, version: u64, entries: &[EsrtEntry]) {
        let patch = Self::patch;
        let entry_len = size_of::<EsrtEntry>();
        let mut table = alloc::vec![0; size_of::<EsrtHeader>() + entry_len * entries.len()];
        let count = entries.len() as u32;
        patch(&mut table, offset_of!(EsrtHeader, fw_resource_count), &count.to_ne_bytes());
        patch(&mut table, offset_of!(EsrtHeader, fw_resource_count_max), &count.to_ne_bytes());
        patch(&mut table, offset_of!(EsrtHeader, fw_resource_version), &version.to_ne_bytes());

        for (i, e) in entries.iter().enumerate() {
            let base = size_of::<EsrtHeader>() + i * entry_len;
            patch(&mut table, base + offset_of!(EsrtEntry, fw_class), &e.fw_class.to_bytes());
            for (offset, value) in [
                (offset_of!(EsrtEntry, fw_type), e.fw_type.0),
                (offset_of!(EsrtEntry, fw_version), e.fw_version),
                (offset_of!(EsrtEntry, lowest_supported_fw_version), e.lowest_supported_fw_version),
                (offset_of!(EsrtEntry, capsule_flags), e.capsule_flags),
                (offset_of!(EsrtEntry, last_attempt_version), e.last_attempt_version),
                (offset_of!(EsrtEntry, last_attempt_status), e.last_attempt_status.0),
            ] {
                patch(&mut table, base + offset, &value.to_ne_bytes());
            }
        }
        self.install_memory(addr, &table);
    }
}

/// Where [`StubFirmware::install_system_table`] claims the runtime-services
/// table is. Nothing is installed there; the stub never calls through it.
pub const RUNTIME_SERVICES_ADDR: u64 = 0xdead_0000;

impl RuntimeFirmware for StubFirmware {
    fn connect(&self, _: &Entered, system_table: &SystemTable) {
        let mut state = self.state.lock();
        state.check_context();
        state.runtime_services = Some(system_table.runtime_services as u64);
    }

    fn get_time(
        &self,
        _: &Entered,
        time: &mut Time,
        capabilities: Option<&mut TimeCapabilities>,
    ) -> Status {
        let mut state = self.state.lock();
        state.check_context();
        state.calls.get_time += 1;
        let Some(now) = state.time else {
            return state.time_status;
        };
        *time = now;
        if let Some(caps) = capabilities {
            *caps = TimeCapabilities {
                resolution: 1,
                accuracy: 50_000_000,
                sets_to_zero: false.into(),
            };
        }
        state.time_status
    }

    fn set_time(&self, _: &Entered, time: &Time) -> Status {
        let mut state = self.state.lock();
        state.check_context();
        state.calls.set_time += 1;
        state.time = Some(*time);
        Status::SUCCESS
    }

    fn get_variable(
        &self,
        _: &Entered,
        name: &[Char16],
        vendor: &Guid,
        attributes: &mut VariableAttributes,
        data_size: &mut usize,
        data: &mut [u8],
    ) -> Status {
        let mut state = self.state.lock();
        state.check_context();
        state.calls.get_variable += 1;
        if let Some(status) = state.forced_status {
            return status;
        }
        let Some((attrs, value)) = state.variables.get(&(*vendor, name.to_vec())) else {
            return Status::NOT_FOUND;
        };
        let capacity = (*data_size).min(data.len());
        *data_size = value.len();
        if value.len() > capacity {
            return Status::BUFFER_TOO_SMALL;
        }
        data[..value.len()].copy_from_slice(value);
        *attributes = *attrs;
        Status::SUCCESS
    }

    fn get_next_variable_name(
        &self,
        _: &Entered,
        name_size: &mut usize,
        name: &mut [Char16],
        vendor: &mut Guid,
    ) -> Status {
        let mut state = self.state.lock();
        state.check_context();
        state.calls.get_next_variable_name += 1;
        if let Some(status) = state.forced_status {
            return status;
        }

        let capacity = (*name_size).min(size_of_val(name));
        match state.name_quirk {
            NameQuirk::None | NameQuirk::Repeat => {}
            NameQuirk::AlwaysGrow => {
                *name_size = capacity + 2;
                return Status::BUFFER_TOO_SMALL;
            }
            NameQuirk::ShrinkingSize => {
                *name_size = capacity;
                return Status::BUFFER_TOO_SMALL;
            }
        }

        let Some(end) = name[..capacity / 2].iter().position(|&c| c == 0) else {
            return Status::INVALID_PARAMETER;
        };
        let cursor = (*vendor, name[..=end].to_vec());

        let next = if end == 0 || state.name_quirk == NameQuirk::Repeat {
            state.variables.keys().next()
        } else if state.variables.contains_key(&cursor) {
            state
                .variables
                .range(cursor..)
                .nth(1)
                .map(|(key, _)| key)
        } else {
            return Status::INVALID_PARAMETER;
        };
        let Some((next_vendor, next_name)) = next else {
            return Status::NOT_FOUND;
        };

        let needed = size_of_val(next_name.as_slice());
        if needed > capacity {
            *name_size = needed;
            return Status::BUFFER_TOO_SMALL;
        }
        name[..next_name.len()].copy_from_slice(next_name);
        *vendor = *next_vendor;
        *name_size = needed;
        Status::SUCCESS
    }

    fn set_variable(
        &self,
        _: &Entered,
        name: &[Char16],
        vendor: &Guid,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Status {
        let mut state = self.state.lock();
        state.check_context();
        state.calls.set_variable += 1;
        if let Some(status) = state.forced_status {
            return status;
        }

        let key = (*vendor, name.to_vec());
        if attributes.contains(VariableAttributes::APPEND_WRITE) {
            let stored = attributes - VariableAttributes::APPEND_WRITE;
            let entry = state
                .variables
                .entry(key)
                .or_insert_with(|| (stored, Vec::new()));
            entry.1.extend_from_slice(data);
            return Status::SUCCESS;
        }
        if data.is_empty() || attributes.is_empty() {
            return match state.variables.remove(&key) {
                Some(_) => Status::SUCCESS,
                None => Status::NOT_FOUND,
            };
        }
        state.variables.insert(key, (attributes, data.to_vec()));
        Status::SUCCESS
    }

    fn reset_system(&self, _: &Entered, ty: ResetType, status: Status, _: &[u8]) -> Status {
        let mut state = self.state.lock();
        state.check_context();
        state.calls.reset_system += 1;
        state.last_reset = Some((ty, status));
        Status::SUCCESS
    }

    /// Copies from the installed region containing `addr`. Bytes outside
    /// every region read as zero.
    unsafe fn read_memory(&self, _: &Entered, addr: u64, dst: &mut [u8]) {
        let mut state = self.state.lock();
        state.check_context();
        dst.fill(0);
        let Some((&base, bytes)) = state.memory.range(..=addr).next_back() else {
            return;
        };
        let Some(src) = usize::try_from(addr - base).ok().and_then(|o| bytes.get(o..)) else {
            return;
        };
        let len = src.len().min(dst.len());
        dst[..len].copy_from_slice(&src[..len]);
    }
}

/// Records the pages it is asked to map.
#[derive(Clone, Debug, Default)]
pub struct StubPageMapper {
    pub root: u64,
    pub pages: Vec<(u64, u64, Protection, CacheMode)>,
    /// Mapping this virtual address fails.
    pub fail_at: Option<u64>,
}

impl StubPageMapper {
    #[must_use]
    pub fn new(root: u64) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }
}

impl PageMapper for StubPageMapper {
    fn map_page(&mut self, va: u64, pa: u64, protection: Protection, cache: CacheMode) -> Result {
        if self.fail_at == Some(va) {
            return Err(Error::OutOfMemory);
        }
        self.pages.push((va, pa, protection, cache));
        Ok(())
    }

    fn root(&self) -> u64 {
        self.root
    }
}
