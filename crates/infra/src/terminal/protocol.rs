//! Wire protocol for ZK-family attendance terminals.
//!
//! Packets are an 8-byte little-endian header (command, checksum, session,
//! reply counter) followed by an optional payload. Over TCP the packet is
//! additionally framed with a 4-byte magic and a 4-byte length; over UDP the
//! packet is the datagram. The checksum is the ones-complement sum of the
//! packet taken as 16-bit words, with the checksum field itself zeroed.
//!
//! Attendance records are fixed 40-byte rows. The timestamp is a packed
//! mixed-radix u32 counting seconds, minutes, hours, days (31 per month)
//! and months (12 per year) from the year 2000, in the terminal's own local
//! clock.

use chrono::{NaiveDate, NaiveDateTime};
use punchbridge_domain::RawPunch;

pub const CMD_CONNECT: u16 = 1000;
pub const CMD_EXIT: u16 = 1001;
pub const CMD_AUTH: u16 = 1102;
pub const CMD_ACK_OK: u16 = 2000;
pub const CMD_ACK_ERROR: u16 = 2001;
pub const CMD_ACK_UNAUTH: u16 = 1005;
pub const CMD_ATTLOG_RRQ: u16 = 13;
pub const CMD_PREPARE_DATA: u16 = 1500;
pub const CMD_DATA: u16 = 1501;

/// Magic prefix of every TCP frame.
pub const STREAM_MAGIC: [u8; 4] = [0x50, 0x50, 0x82, 0x7d];

/// Size of the packet header.
pub const HEADER_LEN: usize = 8;

/// Size of one attendance record.
pub const RECORD_LEN: usize = 40;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub command: u16,
    pub checksum: u16,
    pub session: u16,
    pub reply: u16,
}

impl PacketHeader {
    /// Parse the leading 8 bytes of a packet.
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            command: u16::from_le_bytes([packet[0], packet[1]]),
            checksum: u16::from_le_bytes([packet[2], packet[3]]),
            session: u16::from_le_bytes([packet[4], packet[5]]),
            reply: u16::from_le_bytes([packet[6], packet[7]]),
        })
    }
}

/// Build a complete packet (header + payload) with a valid checksum.
pub fn encode_packet(command: u16, session: u16, reply: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
    packet.extend_from_slice(&command.to_le_bytes());
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&session.to_le_bytes());
    packet.extend_from_slice(&reply.to_le_bytes());
    packet.extend_from_slice(payload);

    let checksum = checksum(&packet);
    packet[2..4].copy_from_slice(&checksum.to_le_bytes());
    packet
}

/// Verify a received packet's checksum.
pub fn verify_checksum(packet: &[u8]) -> bool {
    let Some(header) = PacketHeader::parse(packet) else {
        return false;
    };
    let mut copy = packet.to_vec();
    copy[2] = 0;
    copy[3] = 0;
    checksum(&copy) == header.checksum
}

/// Ones-complement 16-bit checksum with the checksum field zeroed.
fn checksum(packet: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = packet.chunks_exact(2);
    for pair in &mut chunks {
        sum += u32::from(u16::from_le_bytes([pair[0], pair[1]]));
    }
    if let Some(&odd) = chunks.remainder().first() {
        sum += u32::from(odd);
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Wrap a packet in the TCP frame (magic + length prefix).
pub fn frame_stream(packet: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8 + packet.len());
    frame.extend_from_slice(&STREAM_MAGIC);
    frame.extend_from_slice(&(packet.len() as u32).to_le_bytes());
    frame.extend_from_slice(packet);
    frame
}

/// Session key derived from the device comm key and the session id.
///
/// The key's bits are reversed, the session id added, the result XORed with
/// the ASCII tag "ZKSO" with its 16-bit halves swapped, then XORed again
/// with a fixed tick byte.
pub fn commkey_digest(key: u32, session: u16) -> [u8; 4] {
    const TICKS: u8 = 50;

    let reversed = key.reverse_bits();
    let mixed = reversed.wrapping_add(u32::from(session));
    let b = mixed.to_le_bytes();
    let tagged = [b[0] ^ b'Z', b[1] ^ b'K', b[2] ^ b'S', b[3] ^ b'O'];
    let swapped = [tagged[2], tagged[3], tagged[0], tagged[1]];
    [
        swapped[0] ^ TICKS,
        swapped[1] ^ TICKS,
        TICKS,
        swapped[3] ^ TICKS,
    ]
}

/// Decode the packed mixed-radix timestamp. Returns `None` for values that
/// produce an impossible calendar date.
pub fn decode_timestamp(mut t: u32) -> Option<NaiveDateTime> {
    let second = t % 60;
    t /= 60;
    let minute = t % 60;
    t /= 60;
    let hour = t % 24;
    t /= 24;
    let day = t % 31 + 1;
    t /= 31;
    let month = t % 12 + 1;
    t /= 12;
    let year = 2000 + i32::try_from(t).ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Encode a timestamp into the packed form. Inverse of [`decode_timestamp`]
/// for dates the format can represent.
pub fn encode_timestamp(ts: NaiveDateTime) -> u32 {
    use chrono::{Datelike, Timelike};

    let date = ts.date();
    let days = (date.year() as u32 - 2000) * 12 * 31 + (date.month() - 1) * 31 + (date.day() - 1);
    days * 86_400 + ts.hour() * 3_600 + ts.minute() * 60 + ts.second()
}

/// Parse a buffer of 40-byte attendance records.
///
/// The subject id is a NUL-padded string at offset 2, the vendor event-type
/// code sits at offset 26, and the packed timestamp at offset 27. Rows with
/// an empty subject or an undecodable timestamp are skipped, and trailing
/// bytes shorter than a full record are ignored.
pub fn parse_records(data: &[u8]) -> Vec<RawPunch> {
    data.chunks_exact(RECORD_LEN)
        .filter_map(|record| {
            let subject_raw = &record[2..11];
            let end = subject_raw.iter().position(|&b| b == 0).unwrap_or(subject_raw.len());
            let subject_id = std::str::from_utf8(&subject_raw[..end]).ok()?.trim().to_string();
            if subject_id.is_empty() {
                return None;
            }

            let kind_code = record[26];
            let packed = u32::from_le_bytes([record[27], record[28], record[29], record[30]]);
            let timestamp = decode_timestamp(packed)?;

            Some(RawPunch { subject_id, timestamp, kind_code })
        })
        .collect()
}
