// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firmware status codes.
//!
//! Runtime services return only a few of these. The rest belong to boot-time
//! protocols, but nothing stops firmware from handing one back after boot,
//! so every defined code is named here for the kernel's translation table.

/// Marks a status as an error.
const fn error(code: usize) -> usize {
    Status::ERROR_BIT | code
}

/// Marks a status as a warning.
const fn warning(code: usize) -> usize {
    code
}

newtype_enum! {
/// The word a firmware service returns.
///
/// Vendors may define codes of their own, so this is an open set: any `usize`
/// is a valid `Status`.
#[must_use]
pub enum Status: usize => {
    SUCCESS = 0,

    WARN_UNKNOWN_GLYPH = warning(1),
    WARN_DELETE_FAILURE = warning(2),
    WARN_WRITE_FAILURE = warning(3),
    WARN_BUFFER_TOO_SMALL = warning(4),
    WARN_STALE_DATA = warning(5),
    WARN_FILE_SYSTEM = warning(6),
    WARN_RESET_REQUIRED = warning(7),

    LOAD_ERROR = error(1),
    /// A name, GUID, size or clock field was rejected.
    INVALID_PARAMETER = error(2),
    /// The platform does not offer this service at runtime.
    UNSUPPORTED = error(3),
    BAD_BUFFER_SIZE = error(4),
    /// The required size has been written back through the size argument.
    BUFFER_TOO_SMALL = error(5),
    NOT_READY = error(6),
    /// The clock or the variable store failed.
    DEVICE_ERROR = error(7),
    /// The variable is read-only.
    WRITE_PROTECTED = error(8),
    /// The variable store is full.
    OUT_OF_RESOURCES = error(9),
    VOLUME_CORRUPTED = error(10),
    VOLUME_FULL = error(11),
    NO_MEDIA = error(12),
    MEDIA_CHANGED = error(13),
    /// No such variable, or the end of an enumeration.
    NOT_FOUND = error(14),
    ACCESS_DENIED = error(15),
    NO_RESPONSE = error(16),
    NO_MAPPING = error(17),
    TIMEOUT = error(18),
    NOT_STARTED = error(19),
    ALREADY_STARTED = error(20),
    ABORTED = error(21),
    ICMP_ERROR = error(22),
    TFTP_ERROR = error(23),
    PROTOCOL_ERROR = error(24),
    INCOMPATIBLE_VERSION = error(25),
    /// An authenticated variable write failed verification.
    SECURITY_VIOLATION = error(26),
    CRC_ERROR = error(27),
    END_OF_MEDIA = error(28),
    END_OF_FILE = error(31),
    INVALID_LANGUAGE = error(32),
    COMPROMISED_DATA = error(33),
    IP_ADDRESS_CONFLICT = error(34),
    HTTP_ERROR = error(35),
}}

impl Status {
    /// The top bit of the native word.
    pub const ERROR_BIT: usize = !(usize::MAX >> 1);

    /// Only [`Status::SUCCESS`] is success; warnings are not.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bit_is_the_top_bit() {
        assert_eq!(Status::ERROR_BIT.leading_zeros(), 0);
        assert_eq!(Status::ERROR_BIT.count_ones(), 1);
        assert_eq!(Status::NOT_FOUND.0, Status::ERROR_BIT | 14);
        assert_eq!(Status::WARN_BUFFER_TOO_SMALL.0, 4);
    }

    #[test]
    fn only_zero_is_success() {
        assert!(Status::SUCCESS.is_success());
        assert!(Status::default().is_success());
        assert!(!Status::WARN_DELETE_FAILURE.is_success());
        assert!(!Status::BUFFER_TOO_SMALL.is_success());
    }

    #[test]
    fn unknown_codes_print_raw() {
        assert_eq!(format!("{:?}", Status::NOT_FOUND), "NOT_FOUND");
        assert_eq!(format!("{:?}", Status(0x1234)), "Status(4660)");
    }
}
