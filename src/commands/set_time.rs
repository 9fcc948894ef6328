//! Set-time command: set the device's clock.

use byteorder::{ByteOrder, LittleEndian};

use crate::epoch;
use crate::error::CommandError;
use crate::protocol::Packet;

use super::read_ack;

/// Sent from host to Viiiiva to set its clock.
pub const COMMAND_SET_TIME: u16 = 0x0108;

/// State machine for setting the device clock.
///
/// The device answers with a single acknowledgement; there is no reply
/// phase. The command is one-shot: the first inbound packet finishes it
/// whether or not it was a valid acknowledgement, and
/// [`SetTimeCommand::ok`] reports which it was.
#[derive(Debug)]
pub struct SetTimeCommand {
    device_time: u32,
    has_ack: bool,
    done: bool,
}

impl SetTimeCommand {
    /// Set the clock to `device_time` device-epoch seconds.
    pub fn new(device_time: u32) -> Self {
        Self {
            device_time,
            has_ack: false,
            done: false,
        }
    }

    /// Set the clock from a POSIX timestamp.
    pub fn from_posix(posix_time: i64) -> Self {
        Self::new(epoch::to_device(posix_time))
    }

    /// The time this command carries, in device-epoch seconds.
    pub fn device_time(&self) -> u32 {
        self.device_time
    }

    /// Whether the device acknowledged the command.
    pub fn ok(&self) -> bool {
        self.has_ack
    }

    /// Create the outbound packet issuing this command.
    pub fn make_command_packet(&self) -> Packet {
        let mut payload = [0u8; 4];
        LittleEndian::write_u32(&mut payload, self.device_time);
        Packet::command(COMMAND_SET_TIME, &payload)
    }

    /// Feed the first inbound packet.
    ///
    /// Finishes the command regardless of the outcome; a packet that is
    /// not a valid acknowledgement leaves [`SetTimeCommand::ok`] false.
    pub fn read_packet(&mut self, packet: &Packet) -> Result<(), CommandError> {
        let result = read_ack(packet, COMMAND_SET_TIME);
        self.has_ack = result.is_ok();
        self.done = true;
        result
    }

    /// Done after the first inbound packet, valid or not.
    pub fn is_finished(&self) -> bool {
        self.done
    }
}
