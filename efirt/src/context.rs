// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entering and leaving firmware context.
//!
//! Firmware code and every pointer it hands out are only valid while the
//! runtime page table is active. [`Runtime::enter`] switches to it and
//! returns a [`RuntimeGuard`]; dropping the guard is the only way back. The
//! firmware capability is reachable only through the guard, so a firmware
//! call outside the bracket does not type-check.
//!
//! At most one bracket is open system-wide: the guard holds a global
//! spinlock for its whole lifetime. Interrupts go off before that lock is
//! taken and come back on only after it is released.

use crate::firmware::RuntimeFirmware;
use core::fmt::{self, Debug, Formatter};
use core::marker::PhantomData;
use core::mem::{size_of, MaybeUninit};
use core::slice;
use efirt_raw::table::runtime::{ResetType, VariableAttributes};
use efirt_raw::table::system::SystemTable;
use efirt_raw::time::{Time, TimeCapabilities};
use efirt_raw::{Char16, Guid, Status};
use spin::{Mutex, MutexGuard};

/// Machine-dependent hooks of the kernel.
///
/// None of these can fail; a kernel that cannot perform them has no way to
/// call firmware safely anyway.
pub trait Machine {
    /// Whatever is needed to put the interrupt enable state back.
    type InterruptState: Copy;

    /// Disables interrupts on the local CPU, returning the previous state.
    fn disable_interrupts(&self) -> Self::InterruptState;

    /// Restores the interrupt state saved by
    /// [`disable_interrupts`](Self::disable_interrupts).
    fn restore_interrupts(&self, state: Self::InterruptState);

    /// The currently active address-space root.
    fn address_space_root(&self) -> u64;

    /// Activates the address space rooted at `root`.
    fn load_address_space_root(&self, root: u64);

    /// Saves the kernel's FPU state and hands the FPU to firmware.
    fn fpu_enter(&self);

    /// Takes the FPU back from firmware and restores the kernel's state.
    fn fpu_leave(&self);

    /// The kernel's current securelevel.
    fn securelevel(&self) -> i32;
}

/// Proof that a bracket is open.
///
/// Only [`RuntimeGuard`] can create one, and every [`RuntimeFirmware`]
/// method takes it, so firmware can only be called from inside a bracket.
#[derive(Debug)]
pub struct Entered {
    _private: (),
}

/// The firmware capability together with the machinery to reach it.
#[derive(Debug)]
pub struct Runtime<M: Machine, F> {
    machine: M,
    firmware: F,
    root: u64,
    lock: Mutex<()>,
}

impl<M: Machine, F: RuntimeFirmware> Runtime<M, F> {
    /// Creates the switcher for the runtime address space rooted at `root`.
    pub const fn new(machine: M, firmware: F, root: u64) -> Self {
        Self {
            machine,
            firmware,
            root,
            lock: Mutex::new(()),
        }
    }

    /// The machine hooks, for operations that do not touch firmware.
    pub const fn machine(&self) -> &M {
        &self.machine
    }

    /// The address-space root activated by [`enter`](Self::enter).
    pub const fn root(&self) -> u64 {
        self.root
    }

    /// Switches into firmware context.
    ///
    /// Blocks, with interrupts already disabled, while another CPU is inside
    /// a bracket.
    pub fn enter(&self) -> RuntimeGuard<'_, M, F> {
        let interrupts = self.machine.disable_interrupts();
        let lock = self.lock.lock();
        let saved_root = self.machine.address_space_root();
        self.machine.load_address_space_root(self.root);
        self.machine.fpu_enter();
        RuntimeGuard {
            runtime: self,
            saved_root,
            interrupts,
            token: Entered { _private: () },
            lock: Some(lock),
            _not_send: PhantomData,
        }
    }
}

/// An open enter/leave bracket.
///
/// Dropping it returns the FPU, restores the previous address space exactly,
/// releases the lock and only then restores the previous interrupt state,
/// whatever the firmware returned.
pub struct RuntimeGuard<'a, M: Machine, F> {
    runtime: &'a Runtime<M, F>,
    saved_root: u64,
    interrupts: M::InterruptState,
    token: Entered,
    /// Taken in `drop`, before interrupts are restored.
    lock: Option<MutexGuard<'a, ()>>,
    // Interrupt and address-space state belong to this CPU.
    _not_send: PhantomData<*const ()>,
}

impl<M: Machine, F: RuntimeFirmware> RuntimeGuard<'_, M, F> {
    /// Binds the firmware capability to the runtime-services table named by
    /// the system table.
    pub fn connect(&self, system_table: &SystemTable) {
        self.runtime.firmware.connect(&self.token, system_table);
    }

    pub fn get_time(&self, time: &mut Time, capabilities: Option<&mut TimeCapabilities>) -> Status {
        self.runtime.firmware.get_time(&self.token, time, capabilities)
    }

    pub fn set_time(&self, time: &Time) -> Status {
        self.runtime.firmware.set_time(&self.token, time)
    }

    pub fn get_variable(
        &self,
        name: &[Char16],
        vendor: &Guid,
        attributes: &mut VariableAttributes,
        data_size: &mut usize,
        data: &mut [u8],
    ) -> Status {
        self.runtime
            .firmware
            .get_variable(&self.token, name, vendor, attributes, data_size, data)
    }

    pub fn get_next_variable_name(
        &self,
        name_size: &mut usize,
        name: &mut [Char16],
        vendor: &mut Guid,
    ) -> Status {
        self.runtime
            .firmware
            .get_next_variable_name(&self.token, name_size, name, vendor)
    }

    pub fn set_variable(
        &self,
        name: &[Char16],
        vendor: &Guid,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Status {
        self.runtime
            .firmware
            .set_variable(&self.token, name, vendor, attributes, data)
    }

    pub fn reset_system(&self, ty: ResetType, status: Status, data: &[u8]) -> Status {
        self.runtime.firmware.reset_system(&self.token, ty, status, data)
    }

    /// Copies firmware memory at runtime virtual address `addr` into `dst`.
    ///
    /// # Safety
    ///
    /// `addr..addr + dst.len()` must be covered by the runtime mapping.
    pub unsafe fn read_memory(&self, addr: u64, dst: &mut [u8]) {
        // SAFETY: forwarded to the caller.
        unsafe { self.runtime.firmware.read_memory(&self.token, addr, dst) }
    }

    /// Reads a `T` out of firmware memory.
    ///
    /// # Safety
    ///
    /// As for [`read_memory`](Self::read_memory), and every bit pattern must
    /// be a valid `T`.
    pub unsafe fn read<T>(&self, addr: u64) -> T {
        let mut value = MaybeUninit::<T>::zeroed();
        // SAFETY: the slice covers exactly the zero-initialized `value`, and
        // the caller vouches for the address and the bit pattern.
        unsafe {
            let bytes = slice::from_raw_parts_mut(value.as_mut_ptr().cast::<u8>(), size_of::<T>());
            self.read_memory(addr, bytes);
            value.assume_init()
        }
    }
}

impl<M: Machine, F> Debug for RuntimeGuard<'_, M, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeGuard")
            .field("saved_root", &format_args!("{:#x}", self.saved_root))
            .field("root", &format_args!("{:#x}", self.runtime.root))
            .finish_non_exhaustive()
    }
}

impl<M: Machine, F> Drop for RuntimeGuard<'_, M, F> {
    fn drop(&mut self) {
        let machine = &self.runtime.machine;
        machine.fpu_leave();
        machine.load_address_space_root(self.saved_root);
        drop(self.lock.take());
        machine.restore_interrupts(self.interrupts);
    }
}
