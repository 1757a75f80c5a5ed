//! Device type tags and handles.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Family of radio/positioning module behind a device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum DeviceType {
    /// Cellular module.
    Cell = 0,
    /// GNSS receiver.
    Gnss = 1,
    /// Short-range radio module driven over AT commands.
    ShortRange = 2,
    /// Short-range radio where the application runs on the module itself.
    ShortRangeOpenCpu = 3,
}

impl DeviceType {
    /// Every device type, in the order families are initialised.
    pub const ALL: [DeviceType; 4] = [
        DeviceType::Cell,
        DeviceType::Gnss,
        DeviceType::ShortRange,
        DeviceType::ShortRangeOpenCpu,
    ];

    /// Position of this type in [`DeviceType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for the two short-range variants.
    ///
    /// ```
    /// use radiolink_types::DeviceType;
    ///
    /// assert!(DeviceType::ShortRangeOpenCpu.is_short_range());
    /// assert!(!DeviceType::Gnss.is_short_range());
    /// ```
    #[must_use]
    pub const fn is_short_range(self) -> bool {
        matches!(self, DeviceType::ShortRange | DeviceType::ShortRangeOpenCpu)
    }

    /// Returns `true` if devices of this type carry an AT client that a GNSS
    /// device can be reached through.
    #[must_use]
    pub const fn has_at_client(self) -> bool {
        matches!(self, DeviceType::Cell | DeviceType::ShortRange)
    }
}

impl TryFrom<u8> for DeviceType {
    type Error = ErrorCode;

    /// ```
    /// use radiolink_types::{DeviceType, ErrorCode};
    ///
    /// assert_eq!(DeviceType::try_from(1), Ok(DeviceType::Gnss));
    /// assert_eq!(DeviceType::try_from(9), Err(ErrorCode::InvalidParameter));
    /// ```
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DeviceType::ALL
            .iter()
            .copied()
            .find(|t| *t as u8 == value)
            .ok_or(ErrorCode::InvalidParameter)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Cell => write!(f, "cellular"),
            DeviceType::Gnss => write!(f, "GNSS"),
            DeviceType::ShortRange => write!(f, "short-range"),
            DeviceType::ShortRangeOpenCpu => write!(f, "short-range (open CPU)"),
        }
    }
}

/// Opaque reference to a registry-managed device.
///
/// A handle names a slot in one registry's device store together with the
/// generation of that slot at the time the device was created. Once the
/// device is closed the slot's generation moves on, so a stale copy held by
/// the application no longer resolves. "No device" is `Option::<DeviceHandle>::None`.
///
/// Handles are normally only obtained from a registry; [`DeviceHandle::from_parts`]
/// exists for stores and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceHandle {
    store: u32,
    index: u32,
    generation: u32,
}

impl DeviceHandle {
    /// Build a handle from its raw parts.
    #[must_use]
    pub const fn from_parts(store: u32, index: u32, generation: u32) -> Self {
        Self {
            store,
            index,
            generation,
        }
    }

    /// Identifier of the store that issued this handle.
    #[must_use]
    pub const fn store(self) -> u32 {
        self.store
    }

    /// Slot index within the issuing store.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}:{}.{}", self.store, self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_index_matches_all() {
        for (i, ty) in DeviceType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
    }

    #[test]
    fn test_at_client_hosts() {
        assert!(DeviceType::Cell.has_at_client());
        assert!(DeviceType::ShortRange.has_at_client());
        assert!(!DeviceType::Gnss.has_at_client());
        assert!(!DeviceType::ShortRangeOpenCpu.has_at_client());
    }

    #[test]
    fn test_handle_equality_covers_generation() {
        let a = DeviceHandle::from_parts(1, 0, 0);
        let b = DeviceHandle::from_parts(1, 0, 1);
        assert_ne!(a, b);
        assert_eq!(a, DeviceHandle::from_parts(1, 0, 0));
        assert_eq!(b.to_string(), "dev1:0.1");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_device_type_serde_names() {
        let json = serde_json::to_string(&DeviceType::ShortRangeOpenCpu).unwrap();
        assert_eq!(json, "\"short_range_open_cpu\"");
        let ty: DeviceType = serde_json::from_str("\"gnss\"").unwrap();
        assert_eq!(ty, DeviceType::Gnss);
    }
}
