//! Error types for Viv.

use std::fmt;

use thiserror::Error;

/// Result type alias for Viv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Viv.
#[derive(Error, Debug)]
pub enum Error {
    /// Packet framing failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A well-framed packet violated a command's expectations.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A downloaded directory blob could not be parsed.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The delegate's transport rejected a write.
    #[error("transport error: {0}")]
    Transport(String),

    /// A notification arrived with no command in flight, or a command
    /// timed out.
    #[error("unexpected state: {0}")]
    State(String),
}

/// Packet framing and wire-format errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("sequence number out of range: {0}")]
    InvalidSeqno(u8),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("bad packet length: {0} bytes")]
    BadLength(usize),

    #[error("length mismatch: header says {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("checksum mismatch")]
    CrcMismatch,
}

/// Command state-machine errors: the packet was well-framed but its
/// direction, command id, or payload shape was not what the in-flight
/// command expected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("packet not addressed from device to host")]
    WrongDirection,

    #[error("unexpected command id {got:#06x} (expected {expected:#06x})")]
    UnexpectedCommand { expected: u16, got: u16 },

    #[error("acknowledgement payload too short: {0} bytes")]
    ShortAck(usize),

    #[error("acknowledgement does not echo the request")]
    AckMismatch,

    #[error("empty reply payload")]
    EmptyReply,

    #[error("reply packet out of sequence")]
    OutOfSequence,

    #[error("malformed reply payload")]
    MalformedReply,
}

/// Directory codec errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory truncated: {0} trailing bytes")]
    Truncated(usize),

    #[error("unsupported directory version: {0}")]
    BadVersion(u8),

    #[error("unexpected directory record length: {0}")]
    BadRecordLength(u8),

    #[error("unexpected directory time format: {0}")]
    BadTimeFormat(u8),
}

/// Error classification reported to [`ManagerDelegate::did_error`].
///
/// The discriminants are part of the delegate contract and must not be
/// renumbered.
///
/// [`ManagerDelegate::did_error`]: crate::manager::ManagerDelegate::did_error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// No error.
    None = 0,
    /// Framing failed: wrong length, CRC mismatch, or a bad directory
    /// header.
    BadHeader = 1,
    /// Framing succeeded but the packet content violated a command's
    /// expectations.
    BadPayload = 2,
    /// State violation: a stray notification, a write failure, a timeout.
    Unexpected = 3,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::BadHeader => write!(f, "bad header"),
            Self::BadPayload => write!(f, "bad payload"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

impl Error {
    /// Classify this error for the delegate contract.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(_) | Self::Directory(_) => ErrorKind::BadHeader,
            Self::Command(_) => ErrorKind::BadPayload,
            Self::Transport(_) | Self::State(_) => ErrorKind::Unexpected,
        }
    }
}
