//! Erase command: delete a file from the device.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CommandError;
use crate::protocol::Packet;

use super::read_ack;

/// Sent from host to Viiiiva to erase a file.
pub const COMMAND_ERASE: u16 = 0x040b;

/// Sent from Viiiiva to host after an erase command.
pub const COMMAND_ERASE_REPLY: u16 = 0x050b;

/// State machine for erasing one file.
///
/// The device acknowledges the command, then sends a one-byte status
/// reply; status 0 means the file was erased. The reply itself must be
/// acknowledged by the host (see
/// [`Command::should_ack_reply`](super::Command::should_ack_reply)).
#[derive(Debug)]
pub struct EraseCommand {
    index: u16,
    has_ack: bool,
    finished: bool,
    ok: bool,
}

impl EraseCommand {
    pub fn new(index: u16) -> Self {
        Self {
            index,
            has_ack: false,
            finished: false,
            ok: false,
        }
    }

    /// The file index this command erases.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Whether the device reported a successful erase.
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// Create the outbound packet issuing this erase.
    pub fn make_command_packet(&self) -> Packet {
        let mut payload = [0u8; 2];
        LittleEndian::write_u16(&mut payload, self.index);
        Packet::command(COMMAND_ERASE, &payload)
    }

    /// Feed an inbound value notification.
    pub fn read_packet(&mut self, packet: &Packet) -> Result<(), CommandError> {
        if self.has_ack {
            self.read_reply(packet)
        } else {
            read_ack(packet, COMMAND_ERASE).map(|()| self.has_ack = true)
        }
    }

    /// The command is done once both the ack and the status reply have
    /// arrived.
    pub fn is_finished(&self) -> bool {
        self.has_ack && self.finished
    }

    fn read_reply(&mut self, packet: &Packet) -> Result<(), CommandError> {
        if self.finished {
            return Err(CommandError::MalformedReply);
        }
        if packet.cmd() != COMMAND_ERASE_REPLY {
            return Err(CommandError::UnexpectedCommand {
                expected: COMMAND_ERASE_REPLY,
                got: packet.cmd(),
            });
        }
        if !packet.is_from_device() {
            return Err(CommandError::WrongDirection);
        }
        if packet.payload().len() != 1 {
            return Err(CommandError::MalformedReply);
        }

        self.finished = true;
        self.ok = packet.payload()[0] == 0;
        tracing::trace!(index = self.index, ok = self.ok, "erase reply");
        Ok(())
    }
}
