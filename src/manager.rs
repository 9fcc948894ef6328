//! Protocol manager: owns the in-flight command and drives the delegate.
//!
//! The manager is the single entry point of the protocol core. The caller
//! issues commands ([`Manager::download_directory`],
//! [`Manager::download_file`], [`Manager::erase_file`],
//! [`Manager::set_time`]) and feeds transport events back in
//! ([`Manager::notify_value`], [`Manager::notify_timeout`]); the manager
//! serialises packets through the delegate's
//! [`write_value`](ManagerDelegate::write_value) and reports progress and
//! results through the remaining delegate callbacks.
//!
//! Everything is synchronous and single-threaded: each manager method
//! returns only after all delegate callbacks it triggered have returned,
//! and a delegate callback must never re-enter the manager (asserted in
//! debug builds).

use crate::commands::{Command, DownloadCommand, EraseCommand, SetTimeCommand, DIRECTORY_INDEX};
use crate::directory::Directory;
use crate::error::{ErrorKind, Result};
use crate::protocol::Packet;
use crate::types::DirectoryEntry;

/// Delegate pattern for callbacks from [`Manager`] to client code.
///
/// `write_value`, the wait events, and `did_error` must be implemented;
/// the result callbacks default to no-ops so a delegate only handles the
/// commands it issues.
///
/// Data passed by reference into a callback is only valid for the call's
/// duration; copy it out if it must outlive the callback.
pub trait ManagerDelegate {
    /// Serialise a packet to the transport.
    ///
    /// An `Err` return means the write was not accepted; the manager
    /// reports it via [`did_error`](Self::did_error) and does not enter a
    /// wait.
    fn write_value(&mut self, value: &[u8]) -> Result<()>;

    /// A command has been issued and is awaiting its response.
    fn did_start_waiting(&mut self);

    /// The wait has ended, by success, error, or timeout.
    fn did_finish_waiting(&mut self);

    /// A non-fatal error occurred.
    fn did_error(&mut self, kind: ErrorKind, message: &str);

    /// The device's clock was read from a downloaded directory header.
    fn did_parse_clock(&mut self, _posix_time: i64) {}

    /// One directory entry was parsed. Called once per entry, in
    /// ascending index order.
    fn did_parse_directory_entry(&mut self, _entry: DirectoryEntry) {}

    /// All entries of the downloaded directory have been delivered.
    fn did_finish_parsing_directory(&mut self) {}

    /// A file download completed.
    fn did_download_file(&mut self, _index: u16, _data: &[u8]) {}

    /// An erase completed; `ok` reflects the device's status reply.
    fn did_erase_file(&mut self, _index: u16, _ok: bool) {}

    /// A set-time completed; `ok` reflects the device's acknowledgement.
    fn did_set_time(&mut self, _ok: bool) {}
}

/// Drives the Viiiiva protocol against a delegate-provided transport.
///
/// At most one command is in flight at a time; issuing a new command
/// silently discards a pending one. See the [module docs](self) for the
/// threading contract.
pub struct Manager<D: ManagerDelegate> {
    delegate: D,
    /// The in-flight command, if any.
    command: Option<Command>,
    /// True while a manager method is executing. Detects delegate
    /// callbacks that recurse back into the manager; checked in debug
    /// builds only.
    busy: bool,
}

impl<D: ManagerDelegate> Manager<D> {
    /// Create a manager calling back into `delegate`, assuming ownership.
    pub fn new(delegate: D) -> Self {
        Self {
            delegate,
            command: None,
            busy: false,
        }
    }

    /// Access the owned delegate.
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Mutably access the owned delegate.
    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Consume the manager, returning the delegate.
    pub fn into_delegate(self) -> D {
        self.delegate
    }

    /// Feed a GATT value notification from the device.
    pub fn notify_value(&mut self, value: &[u8]) {
        self.enter();
        self.handle_value(value);
        self.leave();
    }

    /// Report that the caller's response timer expired.
    ///
    /// Clears whichever command is in flight, reporting the timeout and
    /// ending the wait. A timeout with nothing in flight is a no-op.
    pub fn notify_timeout(&mut self) {
        self.enter();
        self.handle_timeout();
        self.leave();
    }

    /// Download the directory listing.
    ///
    /// On completion the parsed clock and entries are delivered through
    /// [`ManagerDelegate::did_parse_clock`],
    /// [`ManagerDelegate::did_parse_directory_entry`], and
    /// [`ManagerDelegate::did_finish_parsing_directory`].
    pub fn download_directory(&mut self) {
        self.enter();
        self.issue(Command::Download(DownloadCommand::directory()));
        self.leave();
    }

    /// Download the file at `index`.
    ///
    /// Completion is delivered through
    /// [`ManagerDelegate::did_download_file`].
    pub fn download_file(&mut self, index: u16) {
        self.enter();
        self.issue(Command::Download(DownloadCommand::new(index)));
        self.leave();
    }

    /// Erase the file at `index`.
    ///
    /// Completion is delivered through
    /// [`ManagerDelegate::did_erase_file`].
    pub fn erase_file(&mut self, index: u16) {
        self.enter();
        self.issue(Command::Erase(EraseCommand::new(index)));
        self.leave();
    }

    /// Set the device's clock to `posix_time`.
    ///
    /// Completion is delivered through [`ManagerDelegate::did_set_time`].
    pub fn set_time(&mut self, posix_time: i64) {
        self.enter();
        self.issue(Command::SetTime(SetTimeCommand::from_posix(posix_time)));
        self.leave();
    }

    fn enter(&mut self) {
        debug_assert!(!self.busy, "manager re-entered from a delegate callback");
        self.busy = true;
    }

    fn leave(&mut self) {
        self.busy = false;
    }

    fn handle_value(&mut self, value: &[u8]) {
        let Some(command) = self.command.as_mut() else {
            tracing::debug!("value notification with no command in flight");
            self.delegate
                .did_error(ErrorKind::Unexpected, "unexpected value notification");
            return;
        };

        let packet = match Packet::decode(value) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::debug!(cmd = command.name(), error = %err, "bad packet header");
                let msg = format!("{}: invalid value notification", command.name());
                self.delegate.did_error(ErrorKind::BadHeader, &msg);
                return;
            }
        };

        let result = command.read_packet(&packet);
        let finished = command.is_finished();
        if let Err(err) = result {
            tracing::debug!(cmd = command.name(), error = %err, "bad packet payload");
            let msg = format!("{}: invalid value notification", command.name());
            self.delegate.did_error(ErrorKind::BadPayload, &msg);
            // No return: a rejected packet still finishes a one-shot
            // command (set time), which must complete below.
        }

        if finished {
            if let Some(command) = self.command.take() {
                self.complete(command);
            }
        }
    }

    fn handle_timeout(&mut self) {
        if let Some(command) = self.command.take() {
            tracing::debug!(cmd = command.name(), "timed out waiting for response");
            let msg = format!("{}: timeout waiting for command", command.name());
            self.delegate.did_error(ErrorKind::Unexpected, &msg);
            self.delegate.did_finish_waiting();
        }
    }

    /// Install `command` and send its packet, discarding any pending
    /// command.
    fn issue(&mut self, command: Command) {
        tracing::debug!(cmd = command.name(), "issuing command");
        let packet = command.make_command_packet();
        self.command = Some(command);
        self.write_packet(&packet, true);
    }

    /// Run a finished command's result callbacks, end the wait, and
    /// acknowledge the reply where the command requires it.
    fn complete(&mut self, command: Command) {
        tracing::debug!(cmd = command.name(), "command finished");
        let reply_ack = command.reply_ack_packet();

        match command {
            Command::Download(cmd) => {
                let index = cmd.index();
                let data = cmd.into_data();
                if index == DIRECTORY_INDEX {
                    self.deliver_directory(&data);
                } else {
                    self.delegate.did_download_file(index, &data);
                }
            }
            Command::Erase(cmd) => {
                self.delegate.did_erase_file(cmd.index(), cmd.ok());
            }
            Command::SetTime(cmd) => {
                self.delegate.did_set_time(cmd.ok());
            }
        }

        self.delegate.did_finish_waiting();

        if let Some(ack) = reply_ack {
            // The reply ack is fire-and-forget: no new wait.
            self.write_packet(&ack, false);
        }
    }

    fn deliver_directory(&mut self, data: &[u8]) {
        match Directory::decode(data) {
            Ok(directory) => {
                tracing::debug!(entries = directory.len(), "directory parsed");
                self.delegate.did_parse_clock(directory.clock_posix());
                for entry in directory.entries().values() {
                    self.delegate.did_parse_directory_entry(*entry);
                }
                self.delegate.did_finish_parsing_directory();
            }
            Err(err) => {
                tracing::debug!(error = %err, "directory parse failed");
                self.delegate
                    .did_error(ErrorKind::BadHeader, "Error parsing directory");
            }
        }
    }

    fn write_packet(&mut self, packet: &Packet, wait_for_ack: bool) {
        let bytes = packet.encode();
        if let Err(err) = self.delegate.write_value(&bytes) {
            tracing::warn!(error = %err, "transport rejected write");
            self.delegate.did_error(ErrorKind::Unexpected, "WriteValue");
            return;
        }
        if wait_for_ack {
            self.delegate.did_start_waiting();
        }
    }
}
