// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firmware variables.
//!
//! Every operation is one encode, call, decode transaction inside a single
//! enter/leave bracket. Firmware status codes are translated before they
//! reach the caller, with two conventions that are not errors:
//!
//! - a value that does not fit the caller's buffer is reported as
//!   [`GetVariable::SizeNeeded`], so the caller can retry with the right size;
//! - the end of an enumeration is `Ok(None)`.

mod name;

pub use name::{VariableIdentifier, VariableName};
pub use efirt_raw::table::runtime::{VariableAttributes, VariableVendor};

use crate::context::Machine;
use crate::firmware::RuntimeFirmware;
use crate::{Efi, Error, Result, StatusExt};
use alloc::vec::Vec;
use core::mem::size_of_val;
use efirt_raw::Status;

/// Outcome of a successful [`Efi::get_variable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GetVariable {
    /// The value was copied into the buffer.
    Value {
        size: usize,
        attributes: VariableAttributes,
    },
    /// The buffer was too small; nothing was copied.
    SizeNeeded(usize),
}

impl<M: Machine, F: RuntimeFirmware> Efi<M, F> {
    fn check_name(&self, name: &VariableName) -> Result {
        if name.size() > self.config().max_name_size {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    /// Reads a variable into `buf`.
    pub fn get_variable(&self, id: &VariableIdentifier, buf: &mut [u8]) -> Result<GetVariable> {
        self.check_name(&id.name)?;

        let mut attributes = VariableAttributes::empty();
        let mut size = buf.len();
        let status = self.runtime().enter().get_variable(
            id.name.as_units_with_nul(),
            &id.vendor,
            &mut attributes,
            &mut size,
            buf,
        );

        match status {
            Status::SUCCESS if size <= buf.len() => Ok(GetVariable::Value { size, attributes }),
            Status::SUCCESS => {
                log::warn!("efi: firmware returned {size} bytes for {id} into {}", buf.len());
                Err(Error::Io)
            }
            Status::BUFFER_TOO_SMALL => Ok(GetVariable::SizeNeeded(size)),
            status => Err(status.into()),
        }
    }

    /// Reads a whole variable into a freshly allocated buffer.
    ///
    /// One call learns the size and a second reads the value. A value that
    /// grew in between is reported as [`Error::TryAgain`].
    pub fn read_variable(&self, id: &VariableIdentifier) -> Result<(Vec<u8>, VariableAttributes)> {
        let mut buf = Vec::new();
        let size = match self.get_variable(id, &mut buf)? {
            GetVariable::Value { attributes, .. } => return Ok((buf, attributes)),
            GetVariable::SizeNeeded(size) => size,
        };
        buf.try_reserve_exact(size)?;
        buf.resize(size, 0);

        match self.get_variable(id, &mut buf)? {
            GetVariable::Value { size, attributes } => {
                buf.truncate(size);
                Ok((buf, attributes))
            }
            GetVariable::SizeNeeded(grown) => {
                log::debug!("efi: {id} grew from {size} to {grown} bytes while reading");
                Err(Error::TryAgain)
            }
        }
    }

    /// Writes a variable. An empty `data` deletes it.
    ///
    /// Refused without asking the firmware while the kernel securelevel
    /// forbids it.
    pub fn set_variable(
        &self,
        id: &VariableIdentifier,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Result {
        let level = self.runtime().machine().securelevel();
        if level > self.config().max_write_securelevel {
            log::warn!("efi: refusing to write {id} at securelevel {level}");
            return Err(Error::NotPermitted);
        }
        self.check_name(&id.name)?;

        self.runtime()
            .enter()
            .set_variable(id.name.as_units_with_nul(), &id.vendor, attributes, data)
            .to_result()
    }

    /// Deletes a variable.
    pub fn delete_variable(&self, id: &VariableIdentifier) -> Result {
        self.set_variable(id, VariableAttributes::empty(), &[])
    }

    /// Returns the variable after `cursor` in firmware order, or `None` at
    /// the end. Start with [`VariableIdentifier::default`].
    ///
    /// If the firmware reports the name buffer as too small, the buffer is
    /// grown to the reported size and the call repeated, at most
    /// [`Config::max_name_growth`](crate::Config::max_name_growth) times.
    pub fn next_variable(
        &self,
        cursor: &VariableIdentifier,
    ) -> Result<Option<VariableIdentifier>> {
        self.check_name(&cursor.name)?;

        let config = self.config();
        let cursor_units = cursor.name.as_units_with_nul();
        let mut capacity = config.initial_name_capacity.max(cursor_units.len());
        let mut name: Vec<u16> = Vec::new();

        for _ in 0..=config.max_name_growth {
            name.clear();
            name.try_reserve_exact(capacity)?;
            name.extend_from_slice(cursor_units);
            name.resize(capacity, 0);

            let mut vendor = cursor.vendor;
            let mut size = size_of_val(name.as_slice());
            let status =
                self.runtime()
                    .enter()
                    .get_next_variable_name(&mut size, &mut name, &mut vendor);

            match status {
                Status::SUCCESS => {
                    let units = name.get(..size / 2).ok_or(Error::Io)?;
                    let name = VariableName::from_units_until_nul(units)
                        .map_err(|_| Error::InvalidSequence)?;
                    return Ok(Some(VariableIdentifier::new(vendor, name)));
                }
                Status::BUFFER_TOO_SMALL => {
                    let needed = size.div_ceil(2);
                    if needed <= capacity {
                        log::warn!("efi: firmware asks for {size} bytes after {capacity} units");
                        return Err(Error::Io);
                    }
                    if size > config.max_name_size {
                        return Err(Error::ValueTooLarge);
                    }
                    capacity = needed;
                }
                Status::NOT_FOUND => return Ok(None),
                status => return Err(status.into()),
            }
        }

        log::warn!("efi: variable name still too small after {capacity} units");
        Err(Error::ValueTooLarge)
    }

    /// Enumerates every variable.
    pub fn variable_keys(&self) -> Result<Vec<VariableIdentifier>> {
        let mut keys: Vec<VariableIdentifier> = Vec::new();
        let mut cursor = VariableIdentifier::default();
        while let Some(next) = self.next_variable(&cursor)? {
            if keys.contains(&next) {
                log::warn!("efi: variable enumeration revisited {next}");
                return Err(Error::Io);
            }
            keys.try_reserve(1)?;
            keys.push(next.clone());
            cursor = next;
        }
        Ok(keys)
    }
}
