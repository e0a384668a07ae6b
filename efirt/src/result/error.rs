// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt::{self, Display, Formatter};

/// The small, stable vocabulary of failures reported to callers.
///
/// Each kind has a fixed errno value for the character-device boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// Malformed request, or a parameter the firmware rejected.
    InvalidArgument,
    /// The firmware does not implement the service.
    NotImplemented,
    /// A buffer was too small for the value.
    ValueTooLarge,
    /// The firmware is temporarily out of resources.
    TryAgain,
    /// The firmware denied access.
    PermissionDenied,
    /// Refused by kernel policy before reaching firmware.
    NotPermitted,
    /// No such variable or table.
    NotFound,
    /// Device, media or data integrity failure.
    Io,
    /// The firmware timed out or did not respond.
    TimedOut,
    /// The variable store is write protected.
    ReadOnly,
    /// The variable store is full.
    NoSpace,
    /// The firmware aborted the operation.
    Interrupted,
    /// Unmapped or undefined status code.
    InvalidSequence,
    /// A kernel allocation failed.
    OutOfMemory,
}

impl Error {
    /// The errno value reported through the ioctl interface.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::NotPermitted => 1,
            Self::NotFound => 2,
            Self::Interrupted => 4,
            Self::Io => 5,
            Self::OutOfMemory => 12,
            Self::PermissionDenied => 13,
            Self::InvalidArgument => 22,
            Self::NoSpace => 28,
            Self::ReadOnly => 30,
            Self::TryAgain => 35,
            Self::TimedOut => 60,
            Self::NotImplemented => 78,
            Self::InvalidSequence => 84,
            Self::ValueTooLarge => 87,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::NotImplemented => "function not implemented",
            Self::ValueTooLarge => "value too large to be stored in data type",
            Self::TryAgain => "resource temporarily unavailable",
            Self::PermissionDenied => "permission denied",
            Self::NotPermitted => "operation not permitted",
            Self::NotFound => "no such file or directory",
            Self::Io => "input/output error",
            Self::TimedOut => "operation timed out",
            Self::ReadOnly => "read-only file system",
            Self::NoSpace => "no space left on device",
            Self::Interrupted => "interrupted system call",
            Self::InvalidSequence => "illegal byte sequence",
            Self::OutOfMemory => "cannot allocate memory",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl core::error::Error for Error {}

impl From<alloc::collections::TryReserveError> for Error {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
