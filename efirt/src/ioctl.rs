// SPDX-License-Identifier: MIT OR Apache-2.0

//! Requests of the `efi` character device.
//!
//! Sizes supplied by user space are validated here, before any firmware
//! call. Name sizes are in bytes and include the terminating NUL.

use crate::context::Machine;
use crate::esrt::ESRT_GUID;
use crate::firmware::RuntimeFirmware;
use crate::vars::{GetVariable, VariableAttributes, VariableIdentifier, VariableName};
use crate::{Efi, Error, Result};
use efirt_raw::{Char16, Guid};

/// Ioctl group of the device.
pub const EFIIOC_GROUP: u8 = b'E';

/// Command numbers within [`EFIIOC_GROUP`].
pub const EFIIOC_GET_TABLE: u8 = 1;
pub const EFIIOC_VAR_GET: u8 = 4;
pub const EFIIOC_VAR_NEXT: u8 = 5;
pub const EFIIOC_VAR_SET: u8 = 6;

/// Argument of [`EFIIOC_GET_TABLE`].
#[derive(Debug)]
pub struct GetTableIoc<'a> {
    /// Destination, or `None` to only learn `table_len`.
    pub buf: Option<&'a mut [u8]>,
    pub uuid: Guid,
    /// Out: size of the table.
    pub table_len: usize,
    pub buf_len: usize,
}

/// Argument of [`EFIIOC_VAR_GET`], [`EFIIOC_VAR_NEXT`] and
/// [`EFIIOC_VAR_SET`].
#[derive(Debug)]
pub struct VarIoc<'a> {
    pub name: Option<&'a mut [Char16]>,
    /// Bytes of `name` in use, terminator included.
    pub namesize: usize,
    pub vendor: Guid,
    pub attrib: VariableAttributes,
    pub data: Option<&'a mut [u8]>,
    pub datasize: usize,
}

/// A decoded request.
#[derive(Debug)]
pub enum EfiIoctl<'r, 'a> {
    GetTable(&'r mut GetTableIoc<'a>),
    VarGet(&'r mut VarIoc<'a>),
    VarNext(&'r mut VarIoc<'a>),
    VarSet(&'r mut VarIoc<'a>),
}

impl<M: Machine, F: RuntimeFirmware> Efi<M, F> {
    /// Dispatches one request and reports the outcome as an errno.
    pub fn ioctl(&self, request: EfiIoctl<'_, '_>) -> Result {
        match request {
            EfiIoctl::GetTable(ioc) => self.ioctl_get_table(ioc),
            EfiIoctl::VarGet(ioc) => self.ioctl_var_get(ioc),
            EfiIoctl::VarNext(ioc) => self.ioctl_var_next(ioc),
            EfiIoctl::VarSet(ioc) => self.ioctl_var_set(ioc),
        }
    }

    fn ioctl_get_table(&self, ioc: &mut GetTableIoc<'_>) -> Result {
        if ioc.uuid != ESRT_GUID {
            return Err(Error::NotFound);
        }
        let table = self.esrt().ok_or(Error::NotFound)?.as_bytes();

        ioc.table_len = table.len();
        let Some(buf) = ioc.buf.as_deref_mut() else {
            return Ok(());
        };
        if ioc.buf_len < table.len() || buf.len() < ioc.buf_len {
            return Err(Error::InvalidArgument);
        }
        buf[..table.len()].copy_from_slice(table);
        Ok(())
    }

    /// The in-use part of the name buffer, as whole UCS-2 units.
    fn name_units<'n>(&self, ioc: &'n VarIoc<'_>) -> Result<&'n [Char16]> {
        let name = ioc.name.as_deref().ok_or(Error::InvalidArgument)?;
        if ioc.namesize == 0 || ioc.namesize % 2 != 0 || ioc.namesize > self.config().max_name_size {
            return Err(Error::InvalidArgument);
        }
        name.get(..ioc.namesize / 2).ok_or(Error::InvalidArgument)
    }

    /// The name of a VarGet or VarSet request: the last declared unit must be
    /// NUL, and anything after the first NUL is padding.
    fn terminated_name(&self, ioc: &VarIoc<'_>) -> Result<VariableName> {
        let units = self.name_units(ioc)?;
        if units.last() != Some(&0) {
            return Err(Error::InvalidArgument);
        }
        VariableName::from_units_until_nul(units)
    }

    fn data_len(ioc: &VarIoc<'_>) -> Result<usize> {
        match &ioc.data {
            Some(data) if ioc.datasize <= data.len() => Ok(ioc.datasize),
            None if ioc.datasize == 0 => Ok(0),
            _ => Err(Error::InvalidArgument),
        }
    }

    fn ioctl_var_get(&self, ioc: &mut VarIoc<'_>) -> Result {
        let name = self.terminated_name(ioc)?;
        let id = VariableIdentifier::new(ioc.vendor, name);
        let len = Self::data_len(ioc)?;

        let data: &mut [u8] = match ioc.data.as_deref_mut() {
            Some(data) => &mut data[..len],
            None => &mut [],
        };
        match self.get_variable(&id, data)? {
            GetVariable::Value { size, attributes } => {
                ioc.datasize = size;
                ioc.attrib = attributes;
            }
            GetVariable::SizeNeeded(size) => {
                ioc.datasize = size;
                ioc.data = None;
            }
        }
        Ok(())
    }

    fn ioctl_var_next(&self, ioc: &mut VarIoc<'_>) -> Result {
        let cursor = VariableName::from_units_until_nul(self.name_units(ioc)?)?;
        let cursor = VariableIdentifier::new(ioc.vendor, cursor);

        let Some(next) = self.next_variable(&cursor)? else {
            ioc.namesize = 0;
            return Ok(());
        };

        let units = next.name.as_units_with_nul();
        let size = next.name.size();
        if size > ioc.namesize {
            ioc.name = None;
        } else if let Some(name) = ioc.name.as_deref_mut() {
            name[..units.len()].copy_from_slice(units);
            ioc.vendor = next.vendor;
        }
        ioc.namesize = size;
        Ok(())
    }

    fn ioctl_var_set(&self, ioc: &mut VarIoc<'_>) -> Result {
        let name = self.terminated_name(ioc)?;
        let id = VariableIdentifier::new(ioc.vendor, name);
        let len = Self::data_len(ioc)?;
        let data = ioc.data.as_deref().map_or(&[][..], |d| &d[..len]);

        self.set_variable(&id, ioc.attrib, data)
    }
}
