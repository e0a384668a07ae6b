// SPDX-License-Identifier: MIT OR Apache-2.0

//! The firmware clock as the kernel's time-of-day source.
//!
//! The firmware clock is treated as UTC. Time zone and daylight information
//! is ignored on reads and cleared on writes, as is the nanosecond field.

use crate::context::Machine;
use crate::firmware::RuntimeFirmware;
use crate::{Efi, Error, Result, StatusExt};
use efirt_raw::time::{Daylight, Time};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

/// A time-of-day clock, in seconds since the Unix epoch.
pub trait TimeOfDay {
    fn read_time(&self) -> Result<i64>;

    fn write_time(&self, secs: i64) -> Result;
}

/// Converts a firmware clock reading to Unix seconds.
///
/// The firmware is not trusted to keep its clock sane: every calendar field
/// is range checked, the day is checked against the length of the month, and
/// years before `year_floor` are rejected.
pub fn time_to_unix(time: &Time, year_floor: u16) -> Result<i64> {
    if time.second > 59
        || time.minute > 59
        || time.hour > 23
        || !(1..=31).contains(&time.day)
        || !(1..=12).contains(&time.month)
        || time.year < year_floor
    {
        return Err(Error::InvalidArgument);
    }

    let month = Month::try_from(time.month).map_err(|_| Error::InvalidArgument)?;
    let date = Date::from_calendar_date(i32::from(time.year), month, time.day)
        .map_err(|_| Error::InvalidArgument)?;
    let tod = time::Time::from_hms(time.hour, time.minute, time.second)
        .map_err(|_| Error::InvalidArgument)?;
    Ok(PrimitiveDateTime::new(date, tod).assume_utc().unix_timestamp())
}

/// Converts Unix seconds to a firmware clock value.
pub fn unix_to_time(secs: i64) -> Result<Time> {
    let dt = OffsetDateTime::from_unix_timestamp(secs).map_err(|_| Error::InvalidArgument)?;
    let year = u16::try_from(dt.year()).map_err(|_| Error::InvalidArgument)?;
    Ok(Time {
        year,
        month: u8::from(dt.month()),
        day: dt.day(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        nanosecond: 0,
        time_zone: 0,
        daylight: Daylight::empty(),
        ..Time::default()
    })
}

impl<M: Machine, F: RuntimeFirmware> TimeOfDay for Efi<M, F> {
    fn read_time(&self) -> Result<i64> {
        let mut time = Time::default();
        self.runtime().enter().get_time(&mut time, None).to_result()?;
        time_to_unix(&time, self.config().epoch_year_floor)
            .inspect_err(|_| log::warn!("efi: invalid firmware time {time}"))
    }

    fn write_time(&self, secs: i64) -> Result {
        let time = unix_to_time(secs)?;
        if time.year < self.config().epoch_year_floor {
            return Err(Error::InvalidArgument);
        }
        self.runtime().enter().set_time(&time).to_result()
    }
}
