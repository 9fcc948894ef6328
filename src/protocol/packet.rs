//! Packet structure and handling.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ProtocolError;

use super::{
    ack_id, crc8, CRC_MASK, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, MIN_PACKET_SIZE, PAYLOAD_OFFSET,
    PEER_DEVICE, PEER_HOST, SEQNO_END,
};

/// A single framed value of the config characteristic.
///
/// Wire layout is fixed (see [`crate::protocol`]); the first byte packs a
/// 3-bit sequence number over a 5-bit truncated CRC of everything that
/// follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    seqno: u8,
    sender: u8,
    receiver: u8,
    cmd: u16,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a host-to-device packet.
    ///
    /// Rejects sequence numbers above [`SEQNO_END`] and payloads longer
    /// than [`MAX_PAYLOAD_SIZE`].
    pub fn host_to_device(
        seqno: u8,
        cmd: u16,
        payload: &[u8],
    ) -> Result<Self, ProtocolError> {
        if seqno > SEQNO_END {
            return Err(ProtocolError::InvalidSeqno(seqno));
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            seqno,
            sender: PEER_HOST,
            receiver: PEER_DEVICE,
            cmd,
            payload: payload.to_vec(),
        })
    }

    /// Create a host-to-device command packet (terminal seqno).
    ///
    /// Command payloads are fixed-size and always fit in a packet.
    pub(crate) fn command(cmd: u16, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
        Self {
            seqno: SEQNO_END,
            sender: PEER_HOST,
            receiver: PEER_DEVICE,
            cmd,
            payload: payload.to_vec(),
        }
    }

    /// Create an acknowledgement packet for `cmd`.
    pub fn ack(cmd: u16) -> Self {
        Self {
            seqno: SEQNO_END,
            sender: PEER_HOST,
            receiver: PEER_DEVICE,
            cmd: ack_id(cmd),
            payload: Vec::new(),
        }
    }

    /// Decode a packet from a characteristic value.
    ///
    /// Validates the length invariant (`len == 6 + payload_length`, within
    /// 6..=20) and the truncated CRC. Sender and receiver are not
    /// validated here; see [`Packet::is_from_device`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < MIN_PACKET_SIZE || bytes.len() > MAX_PACKET_SIZE {
            return Err(ProtocolError::BadLength(bytes.len()));
        }

        let expected = PAYLOAD_OFFSET + bytes[1] as usize;
        if bytes.len() != expected {
            return Err(ProtocolError::LengthMismatch {
                expected,
                got: bytes.len(),
            });
        }

        if bytes[0] & CRC_MASK != crc8(&bytes[1..]) & CRC_MASK {
            return Err(ProtocolError::CrcMismatch);
        }

        Ok(Self {
            seqno: bytes[0] >> 5,
            sender: bytes[2],
            receiver: bytes[3],
            cmd: LittleEndian::read_u16(&bytes[4..6]),
            payload: bytes[PAYLOAD_OFFSET..].to_vec(),
        })
    }

    /// Encode the packet to its wire bytes.
    ///
    /// The serialized length is `6 + payload.len()`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PAYLOAD_OFFSET + self.payload.len()];
        buf[1] = self.payload.len() as u8;
        buf[2] = self.sender;
        buf[3] = self.receiver;
        LittleEndian::write_u16(&mut buf[4..6], self.cmd);
        buf[PAYLOAD_OFFSET..].copy_from_slice(&self.payload);
        buf[0] = (self.seqno << 5) | (crc8(&buf[1..]) & CRC_MASK);
        buf
    }

    /// Sequence number (3 bits).
    pub fn seqno(&self) -> u8 {
        self.seqno
    }

    /// Command id in host byte order.
    pub fn cmd(&self) -> u16 {
        self.cmd
    }

    /// Sender peer byte.
    pub fn sender(&self) -> u8 {
        self.sender
    }

    /// Receiver peer byte.
    pub fn receiver(&self) -> u8 {
        self.receiver
    }

    /// Command payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Total packet size on the wire.
    pub fn size(&self) -> usize {
        PAYLOAD_OFFSET + self.payload.len()
    }

    /// Check if this packet is an acknowledgement.
    pub fn is_ack(&self) -> bool {
        self.cmd & super::ACK_FLAG != 0
    }

    /// Check the peer bytes for a device-to-host packet.
    ///
    /// Inbound packets that fail this check are rejected by every command.
    pub fn is_from_device(&self) -> bool {
        self.sender == PEER_DEVICE && self.receiver == PEER_HOST
    }
}
