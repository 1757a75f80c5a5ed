//! Signed status codes shared by every radiolink subsystem.
//!
//! Every public operation ultimately reports one signed integer: `0` for
//! success and a negative value otherwise. The common codes occupy the block
//! `0..=-255`; each radio subsystem owns a disjoint range below that so a raw
//! code is never ambiguous about where it came from.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status codes common to every subsystem.
///
/// This enum is marked `#[non_exhaustive]` so further common codes can be
/// added without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(i32)]
pub enum ErrorCode {
    /// The operation succeeded.
    Success = 0,
    /// Unclassified failure.
    Unknown = -1,
    /// The subsystem (or the registry lock) was never initialised.
    NotInitialised = -2,
    /// The feature is not present in this build.
    NotImplemented = -3,
    /// The request is valid but cannot be honoured by this resource.
    NotSupported = -4,
    /// Bad configuration, unknown handle, or a disallowed request.
    InvalidParameter = -5,
    /// A table or pool is exhausted.
    NoMemory = -6,
    /// The module did not answer.
    NotResponding = -7,
    /// The underlying platform driver failed.
    Platform = -8,
    /// The operation timed out.
    Timeout = -9,
    /// The module reported an error.
    DeviceError = -10,
    /// The requested item does not exist.
    NotFound = -11,
    /// An address was malformed.
    InvalidAddress = -12,
    /// A retry may succeed.
    TemporaryFailure = -13,
    /// Authentication was refused.
    AuthenticationFailure = -14,
}

impl ErrorCode {
    /// Every common code, in declaration order.
    pub const ALL: [ErrorCode; 15] = [
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::NotInitialised,
        ErrorCode::NotImplemented,
        ErrorCode::NotSupported,
        ErrorCode::InvalidParameter,
        ErrorCode::NoMemory,
        ErrorCode::NotResponding,
        ErrorCode::Platform,
        ErrorCode::Timeout,
        ErrorCode::DeviceError,
        ErrorCode::NotFound,
        ErrorCode::InvalidAddress,
        ErrorCode::TemporaryFailure,
        ErrorCode::AuthenticationFailure,
    ];

    /// The raw signed value of this code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Look up a common code by its raw value.
    ///
    /// # Examples
    ///
    /// ```
    /// use radiolink_types::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::from_i32(-6), Some(ErrorCode::NoMemory));
    /// assert_eq!(ErrorCode::from_i32(-300), None);
    /// ```
    #[must_use]
    pub fn from_i32(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_i32() == code)
    }

    /// Returns `true` for [`ErrorCode::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, ErrorCode::Success)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.as_i32()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ErrorCode::from_i32(value).ok_or(value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCode::Success => "success",
            ErrorCode::Unknown => "unknown error",
            ErrorCode::NotInitialised => "not initialised",
            ErrorCode::NotImplemented => "not implemented",
            ErrorCode::NotSupported => "not supported",
            ErrorCode::InvalidParameter => "invalid parameter",
            ErrorCode::NoMemory => "no memory",
            ErrorCode::NotResponding => "not responding",
            ErrorCode::Platform => "platform error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::DeviceError => "device error",
            ErrorCode::NotFound => "not found",
            ErrorCode::InvalidAddress => "invalid address",
            ErrorCode::TemporaryFailure => "temporary failure",
            ErrorCode::AuthenticationFailure => "authentication failure",
        };
        write!(f, "{} ({})", text, self.as_i32())
    }
}

/// Owner of a block of negative status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Subsystem {
    /// Codes shared by everything, `0..=-255`.
    Common,
    /// Cellular codes, `-256..=-511`.
    Cell,
    /// Short-range radio codes, `-512..=-767`.
    ShortRange,
    /// GNSS codes, `-1024..=-1279`.
    Gnss,
}

impl Subsystem {
    /// Every subsystem, highest range first.
    pub const ALL: [Subsystem; 4] = [
        Subsystem::Common,
        Subsystem::Cell,
        Subsystem::ShortRange,
        Subsystem::Gnss,
    ];

    /// The highest (closest to zero) code in this subsystem's range.
    #[must_use]
    pub const fn max(self) -> i32 {
        match self {
            Subsystem::Common => 0,
            Subsystem::Cell => -256,
            Subsystem::ShortRange => -512,
            Subsystem::Gnss => -1024,
        }
    }

    /// The lowest code in this subsystem's range.
    #[must_use]
    pub const fn min(self) -> i32 {
        self.max() - 255
    }

    /// Returns `true` if `code` lies inside this subsystem's range.
    #[must_use]
    pub const fn contains(self, code: i32) -> bool {
        code <= self.max() && code >= self.min()
    }

    /// Classify a raw code.
    ///
    /// Positive values and the unassigned gap between the short-range and
    /// GNSS ranges belong to nobody.
    ///
    /// # Examples
    ///
    /// ```
    /// use radiolink_types::Subsystem;
    ///
    /// assert_eq!(Subsystem::of(-5), Some(Subsystem::Common));
    /// assert_eq!(Subsystem::of(-260), Some(Subsystem::Cell));
    /// assert_eq!(Subsystem::of(-1030), Some(Subsystem::Gnss));
    /// assert_eq!(Subsystem::of(-800), None);
    /// assert_eq!(Subsystem::of(3), None);
    /// ```
    #[must_use]
    pub fn of(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.contains(code))
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Common => write!(f, "common"),
            Subsystem::Cell => write!(f, "cellular"),
            Subsystem::ShortRange => write!(f, "short-range"),
            Subsystem::Gnss => write!(f, "GNSS"),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn classification_never_panics(code in any::<i32>()) {
            if let Some(subsystem) = Subsystem::of(code) {
                prop_assert!(subsystem.contains(code));
            }
        }

        #[test]
        fn known_values_round_trip(index in 0usize..ErrorCode::ALL.len()) {
            let code = ErrorCode::ALL[index];
            prop_assert_eq!(ErrorCode::from_i32(code.as_i32()), Some(code));
        }
    }
}
