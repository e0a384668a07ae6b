// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt::{self, Display, Formatter};

/// The fields every firmware table starts with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Header {
    /// Identifies the kind of table, e.g.
    /// [`SystemTable::SIGNATURE`](super::system::SystemTable::SIGNATURE).
    pub signature: u64,
    pub revision: Revision,
    /// Bytes in the whole table, this header included.
    pub size: u32,
    /// Not checked by the kernel.
    pub crc32: u32,
    pub reserved: u32,
}

/// The interface revision a table conforms to.
///
/// The major number is in the upper half and the minor in the lower half.
/// From 2.0 on the minor holds two decimal digits, so minor 31 is printed
/// `2.3.1` and minor 70 is printed `2.7`. EFI 1.x minors are printed
/// zero-padded, as in `1.02`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Revision(pub u32);

#[allow(missing_docs)]
impl Revision {
    pub const EFI_1_10: Self = Self::new(1, 10);
    pub const EFI_2_00: Self = Self::new(2, 0);
    pub const EFI_2_31: Self = Self::new(2, 31);
    pub const EFI_2_70: Self = Self::new(2, 70);
    pub const EFI_2_80: Self = Self::new(2, 80);
    pub const EFI_2_100: Self = Self::new(2, 100);
}

impl Revision {
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self(((major as u32) << 16) | minor as u32)
    }

    #[must_use]
    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    #[must_use]
    pub const fn minor(self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.major(), self.minor()) {
            (major @ 0..=1, minor) => write!(f, "{major}.{minor:02}"),
            (major, minor) if minor % 10 == 0 => write!(f, "{major}.{}", minor / 10),
            (major, minor) => write!(f, "{major}.{}.{}", minor / 10, minor % 10),
        }
    }
}
