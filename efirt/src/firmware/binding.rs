// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RuntimeFirmware;
use crate::context::Entered;
use core::fmt::{self, Debug, Formatter};
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};
use efirt_raw::table::runtime::{ResetType, RuntimeServices, VariableAttributes};
use efirt_raw::table::system::SystemTable;
use efirt_raw::time::{Time, TimeCapabilities};
use efirt_raw::{Char16, Guid, Status};

/// Calls into the firmware's runtime-services table.
///
/// Starts out unbound; [`RuntimeFirmware::connect`] installs the table
/// pointer found in the system table. Calls made before that report
/// [`Status::NOT_STARTED`].
pub struct FirmwareBinding {
    runtime_services: AtomicPtr<RuntimeServices>,
}

impl FirmwareBinding {
    /// Creates an unbound binding.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            runtime_services: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Whether [`connect`](RuntimeFirmware::connect) found a table.
    pub fn is_connected(&self) -> bool {
        !self.runtime_services.load(Ordering::Acquire).is_null()
    }

    fn services(&self, _: &Entered) -> Option<&RuntimeServices> {
        // SAFETY: the pointer came from the system table and the token shows
        // that the runtime mapping it is valid in is active.
        unsafe { self.runtime_services.load(Ordering::Acquire).as_ref() }
    }
}

impl Default for FirmwareBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FirmwareBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareBinding")
            .field(
                "runtime_services",
                &self.runtime_services.load(Ordering::Relaxed),
            )
            .finish()
    }
}

fn ptr_or_null<T>(slice: &mut [T]) -> *mut T {
    if slice.is_empty() {
        ptr::null_mut()
    } else {
        slice.as_mut_ptr()
    }
}

impl RuntimeFirmware for FirmwareBinding {
    fn connect(&self, _: &Entered, system_table: &SystemTable) {
        self.runtime_services
            .store(system_table.runtime_services, Ordering::Release);
    }

    fn get_time(
        &self,
        entered: &Entered,
        time: &mut Time,
        capabilities: Option<&mut TimeCapabilities>,
    ) -> Status {
        let Some(rt) = self.services(entered) else {
            return Status::NOT_STARTED;
        };
        let capabilities = capabilities.map_or(ptr::null_mut(), ptr::from_mut);
        // SAFETY: both pointers are valid for writes for the whole call.
        unsafe { (rt.get_time)(time, capabilities) }
    }

    fn set_time(&self, entered: &Entered, time: &Time) -> Status {
        let Some(rt) = self.services(entered) else {
            return Status::NOT_STARTED;
        };
        // SAFETY: `time` is valid for reads for the whole call.
        unsafe { (rt.set_time)(time) }
    }

    fn get_variable(
        &self,
        entered: &Entered,
        name: &[Char16],
        vendor: &Guid,
        attributes: &mut VariableAttributes,
        data_size: &mut usize,
        data: &mut [u8],
    ) -> Status {
        debug_assert_eq!(name.last(), Some(&0));
        let Some(rt) = self.services(entered) else {
            return Status::NOT_STARTED;
        };
        *data_size = (*data_size).min(data.len());
        // SAFETY: the name is NUL-terminated and the firmware writes at most
        // `data_size` bytes, which `data` holds.
        unsafe {
            (rt.get_variable)(
                name.as_ptr(),
                vendor,
                attributes,
                data_size,
                ptr_or_null(data),
            )
        }
    }

    fn get_next_variable_name(
        &self,
        entered: &Entered,
        name_size: &mut usize,
        name: &mut [Char16],
        vendor: &mut Guid,
    ) -> Status {
        let Some(rt) = self.services(entered) else {
            return Status::NOT_STARTED;
        };
        *name_size = (*name_size).min(core::mem::size_of_val(name));
        // SAFETY: the firmware writes at most `name_size` bytes into `name`.
        unsafe { (rt.get_next_variable_name)(name_size, name.as_mut_ptr(), vendor) }
    }

    fn set_variable(
        &self,
        entered: &Entered,
        name: &[Char16],
        vendor: &Guid,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Status {
        debug_assert_eq!(name.last(), Some(&0));
        let Some(rt) = self.services(entered) else {
            return Status::NOT_STARTED;
        };
        let data_ptr = if data.is_empty() {
            ptr::null()
        } else {
            data.as_ptr()
        };
        // SAFETY: all buffers are valid for reads for the whole call.
        unsafe { (rt.set_variable)(name.as_ptr(), vendor, attributes, data.len(), data_ptr) }
    }

    fn reset_system(
        &self,
        entered: &Entered,
        ty: ResetType,
        status: Status,
        data: &[u8],
    ) -> Status {
        let Some(rt) = self.services(entered) else {
            return Status::NOT_STARTED;
        };
        // SAFETY: `data` is valid for reads; the call does not return.
        unsafe { (rt.reset_system)(ty, status, data.len(), data.as_ptr()) }
    }

    unsafe fn read_memory(&self, _: &Entered, addr: u64, dst: &mut [u8]) {
        // SAFETY: the caller guarantees the source range is mapped.
        unsafe {
            ptr::copy_nonoverlapping(addr as usize as *const u8, dst.as_mut_ptr(), dst.len());
        }
    }
}
