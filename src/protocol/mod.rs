//! Wire protocol for the Viiiiva config characteristic.
//!
//! Defines the packet format, the CRC, and burst sequencing.
//!
//! ## Packet Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Seqno(3 bits)+CRC(5 bits) │ Length (1) │ Sender (1) │ Receiver (1) │
//! ├──────────────────────────────────────────────────────────────────┤
//! │        Command id (2, LE)       │      Payload (0..=14)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are little-endian. The CRC is computed over
//! every byte after the first; only its low 5 bits travel on the wire,
//! packed under the 3-bit sequence number.

mod burst;
mod packet;

pub use burst::Burst;
pub use packet::Packet;

use crc::{Crc, CRC_8_SMBUS};

/// Minimum packet size (header only).
pub const MIN_PACKET_SIZE: usize = 6;

/// Maximum packet size on the wire (one GATT characteristic value).
pub const MAX_PACKET_SIZE: usize = 20;

/// Maximum payload size.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - PAYLOAD_OFFSET;

/// Byte offset of the payload within a packet.
pub const PAYLOAD_OFFSET: usize = 6;

/// Peer id of the host in the sender/receiver bytes.
pub const PEER_HOST: u8 = 3;

/// Peer id of the Viiiiva in the sender/receiver bytes.
pub const PEER_DEVICE: u8 = 1;

/// Terminal sequence number, carried by the last packet of a burst.
pub const SEQNO_END: u8 = 7;

/// The maximum non-terminal sequence number before the ring wraps back
/// to 1.
pub const SEQNO_MODULUS: u8 = 6;

/// Command-id bit distinguishing an acknowledgement from the command it
/// acknowledges.
pub const ACK_FLAG: u16 = 0x8000;

/// Mask selecting the CRC bits of a packet's first byte.
pub const CRC_MASK: u8 = 0x1f;

/// CRC-8, polynomial 0x07, init 0, unreflected, no final XOR.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Calculate the packet CRC over `data`.
///
/// The wire carries only the low 5 bits ([`CRC_MASK`]).
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

/// Successor of a non-terminal sequence number in the 1..=6 ring.
pub fn next_seqno(seqno: u8) -> u8 {
    (seqno % SEQNO_MODULUS) + 1
}

/// The acknowledgement id for a command.
pub fn ack_id(cmd: u16) -> u16 {
    cmd | ACK_FLAG
}
