// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error kinds seen by callers of the bridge, and the translation from
//! firmware status codes.

mod error;
pub use error::Error;

mod status;
pub use status::StatusExt;

/// Return type of every fallible operation in this crate.
///
/// Firmware status codes never appear in it: they are translated to an
/// [`Error`] kind at the call site through [`StatusExt`].
pub type Result<Output = ()> = core::result::Result<Output, Error>;
