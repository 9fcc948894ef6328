//! # Viv
//!
//! Protocol engine for the Viiiiva heart-rate monitor's ANT-FS-flavoured
//! file system, carried over a BLE GATT characteristic.
//!
//! The Viiiiva exposes activity recordings and a directory listing behind a
//! bespoke 20-byte framed protocol. This crate implements the protocol
//! core: packet framing and CRC, burst (multi-packet) sequencing, the
//! per-command state machines, the directory wire format, and a
//! synchronous [`Manager`] that drives them against a caller-supplied
//! [`ManagerDelegate`].
//!
//! ## Data flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Host application                         │
//! │   download_directory / download_file / erase_file / set_time │
//! ├──────────────────────────────────────────────────────────────┤
//! │                         Manager                              │
//! │   owns the in-flight command, routes inbound packets,        │
//! │   invokes delegate callbacks                                 │
//! ├──────────────────┬───────────────────┬───────────────────────┤
//! │  Command state   │  Packet framing   │  Directory codec      │
//! │  machines        │  (CRC-8, seqno)   │  (header + entries)   │
//! ├──────────────────┴───────────────────┴───────────────────────┤
//! │        Delegate: write_value ↓ / notify_value ↑              │
//! │              (BLE GATT characteristic, external)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manager is single-threaded and synchronous: the caller feeds GATT
//! value notifications through [`Manager::notify_value`] on the same thread
//! that issued the command, and every delegate callback returns before the
//! manager method that triggered it does. The transport, timers, and file
//! content interpretation are the caller's concern.

#![warn(clippy::all, clippy::pedantic)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)] // Wire fields are truncated intentionally
#![allow(clippy::match_same_arms)] // Explicit arm per variant is clearer

pub mod commands;
pub mod directory;
pub mod epoch;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod types;

pub use directory::Directory;
pub use error::{Error, ErrorKind, Result};
pub use manager::{Manager, ManagerDelegate};
pub use protocol::{Burst, Packet};
pub use types::{DirectoryEntry, FileFlags, FileType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
