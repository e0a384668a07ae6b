// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Error, Result};
use efirt_raw::Status;

/// Extension trait which turns a firmware [`Status`] into a [`Result`].
pub trait StatusExt {
    /// Converts this status code into a [`Result`].
    ///
    /// Anything but [`Status::SUCCESS`] is an error, including warnings.
    fn to_result(self) -> Result;

    /// Converts this status code into a [`Result`] with a given `Ok` value.
    fn to_result_with_val<T>(self, val: impl FnOnce() -> T) -> Result<T>;
}

impl StatusExt for Status {
    #[inline]
    fn to_result(self) -> Result {
        self.to_result_with_val(|| ())
    }

    #[inline]
    fn to_result_with_val<T>(self, val: impl FnOnce() -> T) -> Result<T> {
        if self.is_success() {
            Ok(val())
        } else {
            Err(self.into())
        }
    }
}

impl From<Status> for Error {
    /// The one translation table from firmware status to error kind.
    ///
    /// Warnings and codes with no entry, including vendor-defined ones, map
    /// to [`Error::InvalidSequence`]. Callers check for success before
    /// converting; a stray [`Status::SUCCESS`] takes the same default.
    fn from(status: Status) -> Self {
        match status {
            Status::INVALID_PARAMETER
            | Status::BAD_BUFFER_SIZE
            | Status::NO_MAPPING
            | Status::INCOMPATIBLE_VERSION
            | Status::INVALID_LANGUAGE => Self::InvalidArgument,
            Status::UNSUPPORTED => Self::NotImplemented,
            Status::BUFFER_TOO_SMALL => Self::ValueTooLarge,
            Status::OUT_OF_RESOURCES
            | Status::NOT_READY
            | Status::NOT_STARTED
            | Status::ALREADY_STARTED => Self::TryAgain,
            Status::ACCESS_DENIED | Status::SECURITY_VIOLATION => Self::PermissionDenied,
            Status::NOT_FOUND => Self::NotFound,
            Status::LOAD_ERROR
            | Status::DEVICE_ERROR
            | Status::VOLUME_CORRUPTED
            | Status::NO_MEDIA
            | Status::MEDIA_CHANGED
            | Status::ICMP_ERROR
            | Status::TFTP_ERROR
            | Status::PROTOCOL_ERROR
            | Status::HTTP_ERROR
            | Status::CRC_ERROR
            | Status::END_OF_MEDIA
            | Status::END_OF_FILE
            | Status::COMPROMISED_DATA
            | Status::IP_ADDRESS_CONFLICT => Self::Io,
            Status::TIMEOUT | Status::NO_RESPONSE => Self::TimedOut,
            Status::WRITE_PROTECTED => Self::ReadOnly,
            Status::VOLUME_FULL => Self::NoSpace,
            Status::ABORTED => Self::Interrupted,
            _ => Self::InvalidSequence,
        }
    }
}
