// SPDX-License-Identifier: MIT OR Apache-2.0

//! The firmware clock record.

use crate::Boolean;
use bitflags::bitflags;
use core::fmt::{self, Display, Formatter};

/// A reading of, or a setting for, the firmware clock.
///
/// Firmware fills this in without range guarantees. Nothing here checks the
/// fields; the kernel validates them when converting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Time {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub pad1: u8,
    pub nanosecond: u32,
    /// Offset from UTC in minutes, or `0x7ff` for an unspecified zone.
    pub time_zone: i16,
    pub daylight: Daylight,
    pub pad2: u8,
}

/// Calendar date and time of day, without the zone.
impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

bitflags! {
    /// Daylight saving state of a [`Time`].
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Daylight: u8 {
        const ADJUST_DAYLIGHT = 1 << 0;
        const IN_DAYLIGHT = 1 << 1;
    }
}

/// What `GetTime` reports about the clock hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TimeCapabilities {
    /// Ticks per second.
    pub resolution: u32,
    /// Drift, in parts per trillion.
    pub accuracy: u32,
    pub sets_to_zero: Boolean,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn layout() {
        assert_eq!(size_of::<Time>(), 16);
        assert_eq!(offset_of!(Time, nanosecond), 8);
        assert_eq!(offset_of!(Time, daylight), 14);
        assert_eq!(size_of::<TimeCapabilities>(), 12);
    }

    #[test]
    fn display_omits_zone() {
        let t = Time {
            year: 2024,
            month: 6,
            day: 5,
            hour: 7,
            minute: 8,
            second: 9,
            time_zone: -300,
            ..Time::default()
        };
        assert_eq!(t.to_string(), "2024-06-05 07:08:09");
    }
}
