//! Error types for radiolink-core.
//!
//! Internally every fallible operation returns [`Result`]. At the
//! application boundary an error collapses to the signed integer defined by
//! [`ErrorCode`] (or a code inside a subsystem range); [`status_code`] does
//! that conversion for any result.
//!
//! # Error classes
//!
//! | Class | Variants | Typical cause |
//! |-------|----------|---------------|
//! | Configuration | [`Error::InvalidParameter`] | bad config, stale handle, wrong device type |
//! | Exhaustion | [`Error::NoMemory`] | device store, bus table or binding table full |
//! | Lifecycle | [`Error::NotInitialised`] | call before `init()` or after `deinit()` |
//! | Transport | [`Error::Platform`], [`Error::NotResponding`] | port driver failure |
//! | Soft | [`Error::NotImplemented`], [`Error::NotSupported`] | family absent, adopted bus |
//!
//! Acquisition failures are always rolled back before the error is returned,
//! so none of these leave partially built state behind.

use thiserror::Error;

use radiolink_types::{ErrorCode, Subsystem};

/// Errors reported by the registry and its collaborators.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Unclassified failure.
    #[error("Unknown error")]
    Unknown,

    /// The registry (or a device family) has not been initialised.
    #[error("Not initialised")]
    NotInitialised,

    /// The requested family or feature is absent from this build.
    #[error("Not implemented")]
    NotImplemented,

    /// The resource cannot honour the request.
    #[error("Not supported")]
    NotSupported,

    /// Bad configuration, unknown handle, or a request the device type forbids.
    #[error("Invalid parameter")]
    InvalidParameter,

    /// A fixed-capacity table is full.
    #[error("No memory")]
    NoMemory,

    /// The module did not respond.
    #[error("Device not responding")]
    NotResponding,

    /// The platform driver failed.
    #[error("Platform error")]
    Platform,

    /// The operation timed out.
    #[error("Timed out")]
    Timeout,

    /// The module reported an error.
    #[error("Device error")]
    DeviceError,

    /// The requested item does not exist.
    #[error("Not found")]
    NotFound,

    /// A malformed address.
    #[error("Invalid address")]
    InvalidAddress,

    /// A transient failure; retrying may succeed.
    #[error("Temporary failure")]
    TemporaryFailure,

    /// Authentication was refused.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// A code from a subsystem's private range.
    #[error("{subsystem} error {code}")]
    Subsystem {
        /// The subsystem owning the code.
        subsystem: Subsystem,
        /// The raw signed code.
        code: i32,
    },
}

impl Error {
    /// The signed status code for this error.
    ///
    /// ```
    /// use radiolink_core::Error;
    ///
    /// assert_eq!(Error::NoMemory.code(), -6);
    /// assert_eq!(Error::InvalidParameter.code(), -5);
    /// ```
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Error::Subsystem { code, .. } => *code,
            other => other.common_code().as_i32(),
        }
    }

    fn common_code(&self) -> ErrorCode {
        match self {
            Error::Unknown | Error::Subsystem { .. } => ErrorCode::Unknown,
            Error::NotInitialised => ErrorCode::NotInitialised,
            Error::NotImplemented => ErrorCode::NotImplemented,
            Error::NotSupported => ErrorCode::NotSupported,
            Error::InvalidParameter => ErrorCode::InvalidParameter,
            Error::NoMemory => ErrorCode::NoMemory,
            Error::NotResponding => ErrorCode::NotResponding,
            Error::Platform => ErrorCode::Platform,
            Error::Timeout => ErrorCode::Timeout,
            Error::DeviceError => ErrorCode::DeviceError,
            Error::NotFound => ErrorCode::NotFound,
            Error::InvalidAddress => ErrorCode::InvalidAddress,
            Error::TemporaryFailure => ErrorCode::TemporaryFailure,
            Error::AuthenticationFailure => ErrorCode::AuthenticationFailure,
        }
    }

    /// Rebuild an error from a raw negative code.
    ///
    /// Returns `None` for `0` and positive values, which are not errors.
    /// Codes that belong to no known range map to [`Error::Unknown`].
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        if code >= 0 {
            return None;
        }
        let error = match Subsystem::of(code) {
            Some(Subsystem::Common) => match ErrorCode::from_i32(code) {
                Some(ErrorCode::NotInitialised) => Error::NotInitialised,
                Some(ErrorCode::NotImplemented) => Error::NotImplemented,
                Some(ErrorCode::NotSupported) => Error::NotSupported,
                Some(ErrorCode::InvalidParameter) => Error::InvalidParameter,
                Some(ErrorCode::NoMemory) => Error::NoMemory,
                Some(ErrorCode::NotResponding) => Error::NotResponding,
                Some(ErrorCode::Platform) => Error::Platform,
                Some(ErrorCode::Timeout) => Error::Timeout,
                Some(ErrorCode::DeviceError) => Error::DeviceError,
                Some(ErrorCode::NotFound) => Error::NotFound,
                Some(ErrorCode::InvalidAddress) => Error::InvalidAddress,
                Some(ErrorCode::TemporaryFailure) => Error::TemporaryFailure,
                Some(ErrorCode::AuthenticationFailure) => Error::AuthenticationFailure,
                _ => Error::Unknown,
            },
            Some(subsystem) => Error::Subsystem { subsystem, code },
            None => Error::Unknown,
        };
        Some(error)
    }

    /// Create an error for a code inside a subsystem's range.
    ///
    /// Falls back to [`Error::Unknown`] if `code` is outside that range.
    #[must_use]
    pub fn subsystem(subsystem: Subsystem, code: i32) -> Self {
        if subsystem != Subsystem::Common && subsystem.contains(code) {
            Error::Subsystem { subsystem, code }
        } else {
            Error::Unknown
        }
    }
}

impl From<Error> for i32 {
    fn from(err: Error) -> Self {
        err.code()
    }
}

/// Result type alias using radiolink-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Collapse a result into the signed status code handed to the application.
///
/// ```
/// use radiolink_core::{Error, status_code};
///
/// assert_eq!(status_code(&Ok::<_, Error>(42)), 0);
/// assert_eq!(status_code(&Err::<(), _>(Error::NotInitialised)), -2);
/// ```
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => ErrorCode::Success.as_i32(),
        Err(err) => err.code(),
    }
}
