//! Download command: fetch a file, or the directory, from the device.

use byteorder::{ByteOrder, LittleEndian};

use crate::directory::RECORD_LEN;
use crate::error::CommandError;
use crate::protocol::{Burst, Packet};

use super::read_ack;

/// Sent from host to Viiiiva to download a file.
pub const COMMAND_DOWNLOAD: u16 = 0x010b;

/// Sent from Viiiiva to host after a download command.
pub const COMMAND_DOWNLOAD_REPLY: u16 = 0x030b;

/// File index addressing the directory itself.
pub const DIRECTORY_INDEX: u16 = 0;

/// State machine for downloading one file (or the directory).
///
/// The flow is two-phase: the device first acknowledges the command,
/// echoing the request parameters, then streams the content as a burst of
/// reply packets. The command is finished once the acknowledgement has
/// arrived and the burst has carried its terminal packet.
#[derive(Debug)]
pub struct DownloadCommand {
    index: u16,
    offset: u32,
    length: u32,
    buf: Vec<u8>,
    burst: Burst,
    has_ack: bool,
}

impl DownloadCommand {
    /// Download a whole file from the start.
    pub fn new(index: u16) -> Self {
        Self::with_range(index, 0, u32::MAX)
    }

    /// Download `length` bytes of a file starting at `offset`.
    pub fn with_range(index: u16, offset: u32, length: u32) -> Self {
        Self {
            index,
            offset,
            length,
            buf: Vec::new(),
            burst: Burst::new(),
            has_ack: false,
        }
    }

    /// Download the directory listing.
    pub fn directory() -> Self {
        Self::new(DIRECTORY_INDEX)
    }

    /// The file index this command addresses.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Create the outbound packet issuing this download.
    pub fn make_command_packet(&self) -> Packet {
        let mut payload = [0u8; 10];
        LittleEndian::write_u16(&mut payload[0..2], self.index);
        LittleEndian::write_u32(&mut payload[2..6], self.offset);
        LittleEndian::write_u32(&mut payload[6..10], self.length);
        Packet::command(COMMAND_DOWNLOAD, &payload)
    }

    /// Feed an inbound value notification.
    pub fn read_packet(&mut self, packet: &Packet) -> Result<(), CommandError> {
        if self.has_ack {
            self.read_reply(packet)
        } else {
            self.read_ack(packet)
        }
    }

    /// The command is done once the ack has arrived and the reply burst
    /// has ended.
    pub fn is_finished(&self) -> bool {
        self.has_ack && self.burst.has_ended()
    }

    /// Bytes accumulated from the reply burst so far.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the command, yielding the downloaded bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.buf
    }

    fn read_ack(&mut self, packet: &Packet) -> Result<(), CommandError> {
        read_ack(packet, COMMAND_DOWNLOAD)?;

        let payload = packet.payload();
        if payload.len() < 10 {
            return Err(CommandError::ShortAck(payload.len()));
        }

        let echo_index = LittleEndian::read_u16(&payload[0..2]);
        let echo_offset = LittleEndian::read_u32(&payload[2..6]);
        let reply_length = LittleEndian::read_u32(&payload[6..10]);
        if echo_index != self.index || echo_offset != self.offset || reply_length > self.length {
            return Err(CommandError::AckMismatch);
        }

        // For the directory, the acknowledged length counts 16-byte
        // records rather than bytes.
        let hint = if self.index == DIRECTORY_INDEX {
            (reply_length as usize).saturating_mul(RECORD_LEN)
        } else {
            reply_length as usize
        };
        // Capacity hint only; an absurd length from the device must not
        // abort the process.
        let _ = self.buf.try_reserve(hint);

        tracing::trace!(index = self.index, reply_length, "download acknowledged");
        self.has_ack = true;
        Ok(())
    }

    fn read_reply(&mut self, packet: &Packet) -> Result<(), CommandError> {
        if packet.cmd() != COMMAND_DOWNLOAD_REPLY {
            return Err(CommandError::UnexpectedCommand {
                expected: COMMAND_DOWNLOAD_REPLY,
                got: packet.cmd(),
            });
        }
        if packet.payload().is_empty() {
            return Err(CommandError::EmptyReply);
        }
        if !packet.is_from_device() {
            return Err(CommandError::WrongDirection);
        }

        let burst = self.burst.advance(packet.seqno());
        if !burst.is_valid() {
            return Err(CommandError::OutOfSequence);
        }
        self.burst = burst;

        self.buf.extend_from_slice(packet.payload());
        tracing::trace!(
            index = self.index,
            seqno = packet.seqno(),
            total = self.buf.len(),
            "download reply packet"
        );
        Ok(())
    }
}
