//! Core types used throughout Viv.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of a file stored on the device.
///
/// Combines what ANT-FS calls the type and sub-type into one value:
/// `raw_type | (subtype << 8)`. Values other than the known constants are
/// carried through verbatim; the device may expose types this library has
/// never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileType(pub u16);

impl FileType {
    /// Unknown file type observed on real devices.
    pub const UNKNOWN_0001: Self = Self(0x0001);

    /// Device information file.
    pub const FIT_DEVICE: Self = Self(0x0180);

    /// .FIT activity recording.
    pub const FIT_ACTIVITY: Self = Self(0x0480);

    /// Combine the raw type and sub-type bytes from a directory entry.
    pub fn from_raw_parts(file_type: u8, subtype: u8) -> Self {
        Self(u16::from(file_type) | (u16::from(subtype) << 8))
    }

    /// Get the combined raw value.
    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn is_fit_activity(self) -> bool {
        self == Self::FIT_ACTIVITY
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FIT_ACTIVITY => write!(f, "fit-activity"),
            Self::FIT_DEVICE => write!(f, "fit-device"),
            _ => write!(f, "{:#06x}", self.0),
        }
    }
}

/// File operation flags from a directory entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct FileFlags(u8);

impl FileFlags {
    /// Observed on real devices, semantics unknown.
    pub const UNKNOWN: u8 = 0x10;

    /// File may be erased.
    pub const ERASABLE: u8 = 0x20;

    /// File can be downloaded.
    pub const READABLE: u8 = 0x40;

    /// Create flags from the raw wire byte.
    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Check if a flag is set.
    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Get raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Logical content of a directory entry.
///
/// This is the caller-facing view; it does not correspond byte-for-byte to
/// the wire format (see [`crate::directory`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Creation time of the file, in seconds since the POSIX epoch.
    pub posix_time: i64,

    /// Length of the file in bytes.
    pub length: u32,

    /// Identifier of the file for download and erase commands.
    pub index: u16,

    /// Type of the file.
    pub file_type: FileType,

    /// File operation flags.
    pub flags: FileFlags,
}

impl DirectoryEntry {
    pub fn is_erasable(&self) -> bool {
        self.flags.has(FileFlags::ERASABLE)
    }

    pub fn is_readable(&self) -> bool {
        self.flags.has(FileFlags::READABLE)
    }
}
