//! Commands sent to the Viiiiva.
//!
//! Every command is written as a single host-to-device packet. The device
//! answers with an acknowledgement value notification (the command id with
//! [`ACK_FLAG`] set — distinct from the GATT write response), and, for
//! download and erase, a follow-up reply command carrying the result.
//!
//! | Command | id | ack | reply |
//! |---|---|---|---|
//! | Download (file or directory) | `0x010b` | `0x810b` | `0x030b` |
//! | Erase | `0x040b` | `0x840b` | `0x050b` |
//! | Set time | `0x0108` | `0x8108` | — |
//!
//! [`ACK_FLAG`]: crate::protocol::ACK_FLAG

mod download;
mod erase;
mod set_time;

pub use download::{DownloadCommand, COMMAND_DOWNLOAD, COMMAND_DOWNLOAD_REPLY, DIRECTORY_INDEX};
pub use erase::{EraseCommand, COMMAND_ERASE, COMMAND_ERASE_REPLY};
pub use set_time::{SetTimeCommand, COMMAND_SET_TIME};

use crate::error::CommandError;
use crate::protocol::{ack_id, Packet};

/// The in-flight command owned by the manager.
///
/// A closed set: the device's command vocabulary is fixed, so the variants
/// are enumerated rather than abstracted behind a trait object.
#[derive(Debug)]
pub enum Command {
    Download(DownloadCommand),
    Erase(EraseCommand),
    SetTime(SetTimeCommand),
}

impl Command {
    /// Create the outbound packet that issues this command.
    pub fn make_command_packet(&self) -> Packet {
        match self {
            Self::Download(cmd) => cmd.make_command_packet(),
            Self::Erase(cmd) => cmd.make_command_packet(),
            Self::SetTime(cmd) => cmd.make_command_packet(),
        }
    }

    /// Feed an inbound value notification to the command state machine.
    pub fn read_packet(&mut self, packet: &Packet) -> Result<(), CommandError> {
        match self {
            Self::Download(cmd) => cmd.read_packet(packet),
            Self::Erase(cmd) => cmd.read_packet(packet),
            Self::SetTime(cmd) => cmd.read_packet(packet),
        }
    }

    /// Check whether the command has received everything it was waiting
    /// for.
    pub fn is_finished(&self) -> bool {
        match self {
            Self::Download(cmd) => cmd.is_finished(),
            Self::Erase(cmd) => cmd.is_finished(),
            Self::SetTime(cmd) => cmd.is_finished(),
        }
    }

    /// Human-readable name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Download(_) => "download command",
            Self::Erase(_) => "erase command",
            Self::SetTime(_) => "set time command",
        }
    }

    /// Whether the manager must acknowledge the reply command on
    /// completion.
    pub fn should_ack_reply(&self) -> bool {
        match self {
            // The download burst terminates itself.
            Self::Download(_) => false,
            Self::Erase(_) => true,
            Self::SetTime(_) => false,
        }
    }

    /// The acknowledgement packet for this command's reply, for commands
    /// where [`Command::should_ack_reply`] holds.
    pub fn reply_ack_packet(&self) -> Option<Packet> {
        match self {
            Self::Erase(_) => Some(Packet::ack(COMMAND_ERASE_REPLY)),
            Self::Download(_) | Self::SetTime(_) => None,
        }
    }
}

/// Validate an acknowledgement packet for `cmd`.
///
/// The packet must come from the device and carry the command id with the
/// acknowledgement bit set.
pub(crate) fn read_ack(packet: &Packet, cmd: u16) -> Result<(), CommandError> {
    if !packet.is_from_device() {
        return Err(CommandError::WrongDirection);
    }
    let expected = ack_id(cmd);
    if packet.cmd() != expected {
        return Err(CommandError::UnexpectedCommand {
            expected,
            got: packet.cmd(),
        });
    }
    Ok(())
}
