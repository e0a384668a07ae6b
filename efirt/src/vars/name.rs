// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Error, Result};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};
use efirt_raw::{Char16, Guid};

/// A variable name in the firmware's UCS-2 encoding.
///
/// Always holds exactly one NUL, as its last unit.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableName(Vec<Char16>);

impl VariableName {
    /// The empty name, which starts an enumeration.
    #[must_use]
    pub fn empty() -> Self {
        Self(vec![0])
    }

    /// Encodes a UTF-8 name.
    ///
    /// Names containing NUL or characters outside the Basic Multilingual
    /// Plane are rejected.
    pub fn encode(name: &str) -> Result<Self> {
        if name.contains('\0') {
            return Err(Error::InvalidArgument);
        }
        // One UTF-8 byte never yields more than one UCS-2 unit.
        let mut units = vec![0; name.len() + 1];
        let len =
            ucs2::encode(name, &mut units[..name.len()]).map_err(|_| Error::InvalidArgument)?;
        units.truncate(len + 1);
        Ok(Self(units))
    }

    /// Takes the units up to the first NUL, which must exist.
    pub fn from_units_until_nul(units: &[Char16]) -> Result<Self> {
        let end = units
            .iter()
            .position(|&c| c == 0)
            .ok_or(Error::InvalidArgument)?;
        Ok(Self(units[..=end].to_vec()))
    }

    /// The units, terminator included.
    #[must_use]
    pub fn as_units_with_nul(&self) -> &[Char16] {
        &self.0
    }

    /// The units, terminator excluded.
    #[must_use]
    pub fn as_units(&self) -> &[Char16] {
        &self.0[..self.0.len() - 1]
    }

    /// Encoded size in bytes, terminator included.
    #[must_use]
    pub fn size(&self) -> usize {
        core::mem::size_of_val(self.0.as_slice())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.len() == 1
    }

    /// Decodes the name to UTF-8.
    pub fn to_utf8(&self) -> Result<String> {
        let units = self.as_units();
        let mut bytes = vec![0; units.len() * 3];
        let len = ucs2::decode(units, &mut bytes).map_err(|_| Error::InvalidSequence)?;
        bytes.truncate(len);
        String::from_utf8(bytes).map_err(|_| Error::InvalidSequence)
    }
}

impl Default for VariableName {
    fn default() -> Self {
        Self::empty()
    }
}

impl Display for VariableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        char::decode_utf16(self.as_units().iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .try_for_each(|c| write!(f, "{c}"))
    }
}

impl fmt::Debug for VariableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// A firmware variable: a name scoped by a vendor GUID.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableIdentifier {
    pub vendor: Guid,
    pub name: VariableName,
}

impl VariableIdentifier {
    #[must_use]
    pub const fn new(vendor: Guid, name: VariableName) -> Self {
        Self { vendor, name }
    }

    /// Shorthand for encoding `name` and pairing it with `vendor`.
    pub fn parse(vendor: Guid, name: &str) -> Result<Self> {
        Ok(Self::new(vendor, VariableName::encode(name)?))
    }
}

impl Display for VariableIdentifier {
    /// Formats as `Name-GUID`, the way variable files are usually named.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.vendor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efirt_raw::table::runtime::VariableVendor;

    #[test]
    fn encode() {
        let name = VariableName::encode("Boot0001").unwrap();
        assert_eq!(name.as_units_with_nul().len(), 9);
        assert_eq!(name.size(), 18);
        assert_eq!(name.as_units()[0], u16::from(b'B'));
        assert_eq!(name.to_utf8().unwrap(), "Boot0001");
        assert_eq!(name.to_string(), "Boot0001");

        let empty = VariableName::encode("").unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty, VariableName::empty());
        assert_eq!(empty.size(), 2);
    }

    #[test]
    fn encode_rejects() {
        assert_eq!(VariableName::encode("a\0b"), Err(Error::InvalidArgument));
        assert_eq!(VariableName::encode("\u{1f600}"), Err(Error::InvalidArgument));
    }

    #[test]
    fn non_ascii() {
        let name = VariableName::encode("Größe").unwrap();
        assert_eq!(name.as_units().len(), 5);
        assert_eq!(name.to_utf8().unwrap(), "Größe");
    }

    #[test]
    fn from_units() {
        let units = [u16::from(b'A'), u16::from(b'B'), 0];
        let name = VariableName::from_units_until_nul(&units).unwrap();
        assert_eq!(name.as_units_with_nul(), &units);

        let padded = VariableName::from_units_until_nul(&[65, 66, 0, 0, 0]).unwrap();
        assert_eq!(padded, name);
        assert!(VariableName::from_units_until_nul(&[]).is_err());

        let name = VariableName::from_units_until_nul(&[65, 0, 66, 0]).unwrap();
        assert_eq!(name.as_units(), &[65]);
        assert!(VariableName::from_units_until_nul(&[65, 66]).is_err());
    }

    #[test]
    fn identifier_display() {
        let id = VariableIdentifier::parse(VariableVendor::GLOBAL_VARIABLE, "Timeout").unwrap();
        assert_eq!(
            id.to_string(),
            "Timeout-8be4df61-93ca-11d2-aa0d-00e098032b8c"
        );
    }
}
