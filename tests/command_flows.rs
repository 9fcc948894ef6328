//! End-to-end command flow tests.
//!
//! Drives a [`Manager`] with a recording delegate and hand-built device
//! frames, covering:
//! - Directory download (happy path, parse failure, clock readout)
//! - File download (including burst ordering violations)
//! - Erase (reply acknowledgement, status handling)
//! - Set time
//! - Stray notifications and command replacement

use byteorder::{ByteOrder, LittleEndian};

use viv::error::ErrorKind;
use viv::protocol::{crc8, CRC_MASK, MAX_PAYLOAD_SIZE, PEER_DEVICE, PEER_HOST, SEQNO_END};
use viv::{DirectoryEntry, Manager, ManagerDelegate, Result};

// ============================================================================
// Test Harness
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Write(Vec<u8>),
    StartWaiting,
    FinishWaiting,
    Error(ErrorKind, String),
    ParseClock(i64),
    Entry(DirectoryEntry),
    FinishParsingDirectory,
    DownloadFile(u16, Vec<u8>),
    EraseFile(u16, bool),
    SetTime(bool),
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl Recorder {
    /// Events recorded since the last call, draining the log.
    fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl ManagerDelegate for Recorder {
    fn write_value(&mut self, value: &[u8]) -> Result<()> {
        self.events.push(Event::Write(value.to_vec()));
        Ok(())
    }

    fn did_start_waiting(&mut self) {
        self.events.push(Event::StartWaiting);
    }

    fn did_finish_waiting(&mut self) {
        self.events.push(Event::FinishWaiting);
    }

    fn did_error(&mut self, kind: ErrorKind, message: &str) {
        self.events.push(Event::Error(kind, message.to_string()));
    }

    fn did_parse_clock(&mut self, posix_time: i64) {
        self.events.push(Event::ParseClock(posix_time));
    }

    fn did_parse_directory_entry(&mut self, entry: DirectoryEntry) {
        self.events.push(Event::Entry(entry));
    }

    fn did_finish_parsing_directory(&mut self) {
        self.events.push(Event::FinishParsingDirectory);
    }

    fn did_download_file(&mut self, index: u16, data: &[u8]) {
        self.events.push(Event::DownloadFile(index, data.to_vec()));
    }

    fn did_erase_file(&mut self, index: u16, ok: bool) {
        self.events.push(Event::EraseFile(index, ok));
    }

    fn did_set_time(&mut self, ok: bool) {
        self.events.push(Event::SetTime(ok));
    }
}

/// Build a device-to-host frame.
fn device_frame(seqno: u8, cmd: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 6 + payload.len()];
    bytes[1] = payload.len() as u8;
    bytes[2] = PEER_DEVICE;
    bytes[3] = PEER_HOST;
    bytes[4..6].copy_from_slice(&cmd.to_le_bytes());
    bytes[6..].copy_from_slice(payload);
    bytes[0] = (seqno << 5) | (crc8(&bytes[1..]) & CRC_MASK);
    bytes
}

/// Ack frame for a download command, echoing the request parameters.
fn download_ack(index: u16, offset: u32, reply_length: u32) -> Vec<u8> {
    let mut payload = [0u8; 10];
    LittleEndian::write_u16(&mut payload[0..2], index);
    LittleEndian::write_u32(&mut payload[2..6], offset);
    LittleEndian::write_u32(&mut payload[6..10], reply_length);
    device_frame(SEQNO_END, 0x810b, &payload)
}

/// Feed `blob` to the manager as a burst of maximum-size reply packets.
fn feed_burst(manager: &mut Manager<Recorder>, cmd: u16, blob: &[u8]) {
    let chunks: Vec<&[u8]> = blob.chunks(MAX_PAYLOAD_SIZE).collect();
    let mut seqno = 1u8;
    for (i, chunk) in chunks.iter().enumerate() {
        let s = if i == chunks.len() - 1 { SEQNO_END } else { seqno };
        manager.notify_value(&device_frame(s, cmd, chunk));
        seqno = (seqno % 6) + 1;
    }
}

fn directory_header(device_time: u32) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[0] = 1; // version
    bytes[1] = 16; // record length
    bytes[2] = 0; // time format
    LittleEndian::write_u32(&mut bytes[8..12], device_time);
    bytes
}

fn directory_entry(index: u16, flags: u8, length: u32, device_time: u32) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    LittleEndian::write_u16(&mut bytes[0..2], index);
    bytes[2] = 0x80; // file type
    bytes[3] = 0x04; // subtype: FIT activity
    LittleEndian::write_u16(&mut bytes[4..6], index);
    bytes[7] = flags;
    LittleEndian::write_u32(&mut bytes[8..12], length);
    LittleEndian::write_u32(&mut bytes[12..16], device_time);
    bytes
}

// ============================================================================
// Directory Download
// ============================================================================

#[test]
fn test_directory_download_happy_path() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_directory();

    let issued = manager.delegate_mut().drain();
    assert_eq!(issued.len(), 2);
    let Event::Write(request) = &issued[0] else {
        panic!("expected a write, got {issued:?}");
    };
    // index 0, offset 0, length u32::MAX
    assert_eq!(u16::from_le_bytes([request[4], request[5]]), 0x010b);
    assert_eq!(&request[6..8], &[0, 0]);
    assert_eq!(issued[1], Event::StartWaiting);

    let mut blob = Vec::new();
    blob.extend_from_slice(&directory_header(0x1000_0000));
    blob.extend_from_slice(&directory_entry(1, 0x60, 128, 0));
    blob.extend_from_slice(&directory_entry(2, 0x60, 256, 0));

    manager.notify_value(&download_ack(0, 0, 2));
    assert!(manager.delegate_mut().drain().is_empty());

    feed_burst(&mut manager, 0x030b, &blob);

    let events = manager.delegate_mut().drain();
    let clock_posix = 631_065_600 + i64::from(0x1000_0000u32);
    assert_eq!(events.len(), 5);
    assert_eq!(events[0], Event::ParseClock(clock_posix));
    let Event::Entry(first) = &events[1] else {
        panic!("expected an entry, got {events:?}");
    };
    assert_eq!(first.index, 1);
    assert_eq!(first.length, 128);
    assert!(first.is_erasable() && first.is_readable());
    let Event::Entry(second) = &events[2] else {
        panic!("expected an entry, got {events:?}");
    };
    assert_eq!(second.index, 2);
    assert_eq!(events[3], Event::FinishParsingDirectory);
    assert_eq!(events[4], Event::FinishWaiting);
}

#[test]
fn test_directory_entries_delivered_in_ascending_order() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_directory();
    manager.delegate_mut().drain();

    let mut blob = Vec::new();
    blob.extend_from_slice(&directory_header(0));
    for index in [7u16, 2, 5] {
        blob.extend_from_slice(&directory_entry(index, 0x40, 1, 0));
    }

    manager.notify_value(&download_ack(0, 0, 3));
    feed_burst(&mut manager, 0x030b, &blob);

    let indices: Vec<u16> = manager
        .delegate_mut()
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            Event::Entry(entry) => Some(entry.index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![2, 5, 7]);
}

#[test]
fn test_directory_parse_failure_still_finishes_wait() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_directory();
    manager.delegate_mut().drain();

    let mut blob = directory_header(0).to_vec();
    blob[0] = 9; // unsupported version

    manager.notify_value(&download_ack(0, 0, 0));
    feed_burst(&mut manager, 0x030b, &blob);

    let events = manager.delegate_mut().drain();
    assert_eq!(
        events,
        vec![
            Event::Error(ErrorKind::BadHeader, "Error parsing directory".into()),
            Event::FinishWaiting,
        ]
    );
}

// ============================================================================
// File Download
// ============================================================================

#[test]
fn test_file_download_happy_path() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_file(3);
    manager.delegate_mut().drain();

    let content: Vec<u8> = (0..40u8).collect();
    manager.notify_value(&download_ack(3, 0, 40));
    feed_burst(&mut manager, 0x030b, &content);

    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::DownloadFile(3, content),
            Event::FinishWaiting,
        ]
    );
}

#[test]
fn test_out_of_sequence_reply_reports_and_preserves_command() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_file(3);
    manager.delegate_mut().drain();

    manager.notify_value(&download_ack(3, 0, 100));
    manager.notify_value(&device_frame(1, 0x030b, &[1, 2, 3]));
    assert!(manager.delegate_mut().drain().is_empty());

    // Skip seqno 2: the payload must be rejected, not appended.
    manager.notify_value(&device_frame(3, 0x030b, &[9, 9, 9]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![Event::Error(
            ErrorKind::BadPayload,
            "download command: invalid value notification".into()
        )]
    );

    // The command survives the error; the burst resumes in order.
    manager.notify_value(&device_frame(2, 0x030b, &[4, 5]));
    manager.notify_value(&device_frame(SEQNO_END, 0x030b, &[6]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::DownloadFile(3, vec![1, 2, 3, 4, 5, 6]),
            Event::FinishWaiting,
        ]
    );
}

#[test]
fn test_corrupt_frame_reports_bad_header_and_preserves_command() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_file(3);
    manager.delegate_mut().drain();

    let mut corrupt = download_ack(3, 0, 8);
    corrupt[6] ^= 0xff;
    manager.notify_value(&corrupt);
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![Event::Error(
            ErrorKind::BadHeader,
            "download command: invalid value notification".into()
        )]
    );

    // The untouched ack still lands on the same in-flight command.
    manager.notify_value(&download_ack(3, 0, 8));
    manager.notify_value(&device_frame(SEQNO_END, 0x030b, &[1, 2, 3, 4, 5, 6, 7, 8]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::DownloadFile(3, vec![1, 2, 3, 4, 5, 6, 7, 8]),
            Event::FinishWaiting,
        ]
    );
}

// ============================================================================
// Erase
// ============================================================================

#[test]
fn test_erase_success_with_reply_ack() {
    let mut manager = Manager::new(Recorder::default());
    manager.erase_file(5);

    let issued = manager.delegate_mut().drain();
    let Event::Write(request) = &issued[0] else {
        panic!("expected a write, got {issued:?}");
    };
    assert_eq!(u16::from_le_bytes([request[4], request[5]]), 0x040b);
    assert_eq!(request[0] >> 5, SEQNO_END);
    assert_eq!(&request[6..], &[0x05, 0x00]);

    manager.notify_value(&device_frame(SEQNO_END, 0x840b, &[]));
    assert!(manager.delegate_mut().drain().is_empty());

    manager.notify_value(&device_frame(SEQNO_END, 0x050b, &[0x00]));
    let events = manager.delegate_mut().drain();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], Event::EraseFile(5, true));
    assert_eq!(events[1], Event::FinishWaiting);
    // The reply is acknowledged without a new wait.
    let Event::Write(ack) = &events[2] else {
        panic!("expected the reply ack, got {events:?}");
    };
    assert_eq!(ack.len(), 6);
    assert_eq!(u16::from_le_bytes([ack[4], ack[5]]), 0x850b);
}

#[test]
fn test_erase_failure_status() {
    let mut manager = Manager::new(Recorder::default());
    manager.erase_file(5);
    manager.delegate_mut().drain();

    manager.notify_value(&device_frame(SEQNO_END, 0x840b, &[]));
    manager.notify_value(&device_frame(SEQNO_END, 0x050b, &[0x01]));

    let events = manager.delegate_mut().drain();
    assert_eq!(events[0], Event::EraseFile(5, false));
    assert_eq!(events[1], Event::FinishWaiting);
}

// ============================================================================
// Set Time
// ============================================================================

#[test]
fn test_set_time() {
    let mut manager = Manager::new(Recorder::default());
    manager.set_time(1_600_000_000);

    let issued = manager.delegate_mut().drain();
    let Event::Write(request) = &issued[0] else {
        panic!("expected a write, got {issued:?}");
    };
    assert_eq!(u16::from_le_bytes([request[4], request[5]]), 0x0108);
    let device_time = 1_600_000_000u32 - 631_065_600;
    assert_eq!(&request[6..], &device_time.to_le_bytes());
    assert_eq!(issued[1], Event::StartWaiting);

    manager.notify_value(&device_frame(SEQNO_END, 0x8108, &[]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![Event::SetTime(true), Event::FinishWaiting]
    );
}

#[test]
fn test_set_time_finishes_on_bad_packet() {
    let mut manager = Manager::new(Recorder::default());
    manager.set_time(1_600_000_000);
    manager.delegate_mut().drain();

    // Set time is one-shot: a packet that is not its ack still finishes
    // the command, reporting failure.
    manager.notify_value(&device_frame(SEQNO_END, 0x810b, &[]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::Error(
                ErrorKind::BadPayload,
                "set time command: invalid value notification".into()
            ),
            Event::SetTime(false),
            Event::FinishWaiting,
        ]
    );

    // The command was dropped on completion.
    manager.notify_value(&device_frame(SEQNO_END, 0x8108, &[]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![Event::Error(
            ErrorKind::Unexpected,
            "unexpected value notification".into()
        )]
    );
}

// ============================================================================
// Manager State
// ============================================================================

#[test]
fn test_unexpected_notification() {
    let mut manager = Manager::new(Recorder::default());
    manager.notify_value(&device_frame(SEQNO_END, 0x8108, &[]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![Event::Error(
            ErrorKind::Unexpected,
            "unexpected value notification".into()
        )]
    );
}

#[test]
fn test_new_command_discards_pending_one() {
    let mut manager = Manager::new(Recorder::default());
    manager.erase_file(5);
    manager.delegate_mut().drain();

    // Replace the pending erase; no error is signalled.
    manager.set_time(1_600_000_000);
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::Write(
                viv::Packet::host_to_device(
                    SEQNO_END,
                    0x0108,
                    &(1_600_000_000u32 - 631_065_600).to_le_bytes(),
                )
                .unwrap()
                .encode()
            ),
            Event::StartWaiting,
        ]
    );

    // The erase ack now lands on the set-time command, which rejects it
    // and, being one-shot, completes without success.
    manager.notify_value(&device_frame(SEQNO_END, 0x840b, &[]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::Error(
                ErrorKind::BadPayload,
                "set time command: invalid value notification".into()
            ),
            Event::SetTime(false),
            Event::FinishWaiting,
        ]
    );
}

#[test]
fn test_timeout_clears_reply_command() {
    let mut manager = Manager::new(Recorder::default());
    manager.download_file(3);
    manager.delegate_mut().drain();

    manager.notify_timeout();
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![
            Event::Error(
                ErrorKind::Unexpected,
                "download command: timeout waiting for command".into()
            ),
            Event::FinishWaiting,
        ]
    );

    // Nothing is in flight any more.
    manager.notify_value(&device_frame(SEQNO_END, 0x810b, &[0u8; 10]));
    assert_eq!(
        manager.delegate_mut().drain(),
        vec![Event::Error(
            ErrorKind::Unexpected,
            "unexpected value notification".into()
        )]
    );
}
