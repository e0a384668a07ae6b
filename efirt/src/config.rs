// SPDX-License-Identifier: MIT OR Apache-2.0

/// Tunables of an attached [`Efi`](crate::Efi) instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Largest accepted variable name, in bytes, terminator included.
    pub max_name_size: usize,

    /// Capacity, in UCS-2 units, of the first buffer used to enumerate
    /// variable names.
    pub initial_name_capacity: usize,

    /// How many times enumeration may grow its name buffer for a single
    /// step before giving up.
    pub max_name_growth: usize,

    /// Variable writes are refused while the kernel securelevel is above
    /// this value.
    pub max_write_securelevel: i32,

    /// Firmware clock readings before this year are rejected.
    pub epoch_year_floor: u16,
}

impl Config {
    pub const DEFAULT: Self = Self {
        max_name_size: 1024,
        initial_name_capacity: 128,
        max_name_growth: 4,
        max_write_securelevel: 0,
        epoch_year_floor: 1970,
    };
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
