//! Directory wire format.
//!
//! The directory is downloaded as file index 0 and decodes into an
//! ANT-FS-style header followed by fixed-size records, all little-endian:
//!
//! ```text
//! Header (16 bytes):
//!   version (1) │ record_length (1) │ time_format (1) │ reserved (5) │
//!   time (4)    │ reserved (4)
//! Entry (16 bytes):
//!   index (2) │ file_type (1) │ subtype (1) │ file_id (2) │
//!   type_flags (1) │ flags (1) │ length (4) │ time (4)
//! ```
//!
//! Timestamps are device-epoch seconds (see [`crate::epoch`]).

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::epoch;
use crate::error::DirectoryError;
use crate::types::{DirectoryEntry, FileFlags, FileType};

/// Bytes per directory record, header and entries alike.
pub const RECORD_LEN: usize = 16;

/// Expected directory header version.
const EXPECTED_VERSION: u8 = 1;

/// Expected time format (seconds since the device epoch).
const EXPECTED_TIME_FORMAT: u8 = 0;

/// Decoded directory header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryHeader {
    /// The device's clock, in device-epoch seconds.
    pub device_time: u32,
}

impl DirectoryHeader {
    /// Header size on the wire.
    pub const LEN: usize = RECORD_LEN;

    /// Decode and validate a header from the front of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, DirectoryError> {
        if bytes.len() < Self::LEN {
            return Err(DirectoryError::Truncated(bytes.len()));
        }

        let version = bytes[0];
        if version != EXPECTED_VERSION {
            return Err(DirectoryError::BadVersion(version));
        }

        let record_length = bytes[1];
        if record_length as usize != RECORD_LEN {
            return Err(DirectoryError::BadRecordLength(record_length));
        }

        let time_format = bytes[2];
        if time_format != EXPECTED_TIME_FORMAT {
            return Err(DirectoryError::BadTimeFormat(time_format));
        }

        Ok(Self {
            device_time: LittleEndian::read_u32(&bytes[8..12]),
        })
    }

    /// The device's clock as a POSIX timestamp.
    pub fn posix_time(&self) -> i64 {
        epoch::to_posix(self.device_time)
    }
}

/// A directory entry as laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDirectoryEntry {
    /// Index of this file, used to address it in commands.
    pub index: u16,

    /// ANT-FS file type.
    pub file_type: u8,

    /// Sub-type of the file type.
    pub subtype: u8,

    /// File id. Depends on the file type, but on the Viiiiva it is
    /// identical to the index.
    pub file_id: u16,

    /// Type flags (semantics defined by the file type).
    pub type_flags: u8,

    /// File operation flags.
    pub flags: u8,

    /// Size of the file in bytes.
    pub length: u32,

    /// File timestamp in device-epoch seconds.
    pub time: u32,
}

impl RawDirectoryEntry {
    /// Entry size on the wire.
    pub const LEN: usize = RECORD_LEN;

    /// Decode an entry from the front of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, DirectoryError> {
        if bytes.len() < Self::LEN {
            return Err(DirectoryError::Truncated(bytes.len()));
        }

        Ok(Self {
            index: LittleEndian::read_u16(&bytes[0..2]),
            file_type: bytes[2],
            subtype: bytes[3],
            file_id: LittleEndian::read_u16(&bytes[4..6]),
            type_flags: bytes[6],
            flags: bytes[7],
            length: LittleEndian::read_u32(&bytes[8..12]),
            time: LittleEndian::read_u32(&bytes[12..16]),
        })
    }

    /// The logical view of this entry.
    pub fn entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            posix_time: epoch::to_posix(self.time),
            length: self.length,
            index: self.index,
            file_type: FileType::from_raw_parts(self.file_type, self.subtype),
            flags: FileFlags::new(self.flags),
        }
    }
}

/// A parsed directory: the device clock plus the entries keyed by index.
///
/// Iteration over [`Directory::entries`] is ascending by index. Duplicate
/// indices overwrite; the device does not emit duplicates in practice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    clock_posix: i64,
    entries: BTreeMap<u16, DirectoryEntry>,
}

impl Directory {
    /// Decode a downloaded directory blob.
    ///
    /// Reads the header, then entries until the buffer is exhausted. A
    /// trailing tail shorter than one record is an error, never silently
    /// dropped.
    pub fn decode(bytes: &[u8]) -> Result<Self, DirectoryError> {
        let header = DirectoryHeader::decode(bytes)?;

        let mut entries = BTreeMap::new();
        let mut rest = &bytes[DirectoryHeader::LEN..];
        while !rest.is_empty() {
            let raw = RawDirectoryEntry::decode(rest)?;
            entries.insert(raw.index, raw.entry());
            rest = &rest[RawDirectoryEntry::LEN..];
        }

        Ok(Self {
            clock_posix: header.posix_time(),
            entries,
        })
    }

    /// The device's clock as a POSIX timestamp.
    pub fn clock_posix(&self) -> i64 {
        self.clock_posix
    }

    /// Entries keyed by file index.
    pub fn entries(&self) -> &BTreeMap<u16, DirectoryEntry> {
        &self.entries
    }

    /// Look up an entry by file index.
    pub fn get(&self, index: u16) -> Option<&DirectoryEntry> {
        self.entries.get(&index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
