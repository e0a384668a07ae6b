// SPDX-License-Identifier: MIT OR Apache-2.0

//! The firmware runtime services as a capability.
//!
//! [`RuntimeFirmware`] has two implementations: [`FirmwareBinding`], which
//! calls through the function-pointer table the firmware published, and
//! [`StubFirmware`](crate::stub::StubFirmware), a deterministic test double.
//! Every method takes an [`Entered`] token, so neither can be called outside
//! an enter/leave bracket.

use crate::context::Entered;
use efirt_raw::table::runtime::{ResetType, VariableAttributes};
use efirt_raw::table::system::SystemTable;
use efirt_raw::time::{Time, TimeCapabilities};
use efirt_raw::{Char16, Guid, Status};

/// Post-boot firmware services.
///
/// Buffers are passed as slices; size parameters follow the firmware
/// convention of being updated in place with the size used or required.
pub trait RuntimeFirmware {
    /// Learns where the runtime-services table lives.
    ///
    /// Called once at attach, with the system table already copied out of
    /// firmware memory.
    fn connect(&self, entered: &Entered, system_table: &SystemTable);

    fn get_time(
        &self,
        entered: &Entered,
        time: &mut Time,
        capabilities: Option<&mut TimeCapabilities>,
    ) -> Status;

    fn set_time(&self, entered: &Entered, time: &Time) -> Status;

    /// Reads variable `name` (NUL-terminated) into `data`.
    ///
    /// On entry `data_size` is the usable length of `data`; on return it is
    /// the size of the value, also when that is too large to fit.
    fn get_variable(
        &self,
        entered: &Entered,
        name: &[Char16],
        vendor: &Guid,
        attributes: &mut VariableAttributes,
        data_size: &mut usize,
        data: &mut [u8],
    ) -> Status;

    /// Advances the enumeration cursor held in `name` and `vendor`.
    ///
    /// `name_size` is in bytes, both ways.
    fn get_next_variable_name(
        &self,
        entered: &Entered,
        name_size: &mut usize,
        name: &mut [Char16],
        vendor: &mut Guid,
    ) -> Status;

    /// Writes a variable. Empty `data` deletes it.
    fn set_variable(
        &self,
        entered: &Entered,
        name: &[Char16],
        vendor: &Guid,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Status;

    /// Resets the platform. Real firmware does not return.
    fn reset_system(&self, entered: &Entered, ty: ResetType, status: Status, data: &[u8])
        -> Status;

    /// Copies firmware memory into `dst`.
    ///
    /// # Safety
    ///
    /// `addr..addr + dst.len()` must lie in the active runtime mapping.
    unsafe fn read_memory(&self, entered: &Entered, addr: u64, dst: &mut [u8]);
}

cfg_if::cfg_if! {
    // Architectures with a defined firmware calling convention.
    if #[cfg(any(
        target_arch = "x86_64",
        target_arch = "x86",
        target_arch = "aarch64",
        target_arch = "arm",
        target_arch = "riscv64"
    ))] {
        mod binding;
        pub use binding::FirmwareBinding;
    }
}
