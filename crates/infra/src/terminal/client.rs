//! TCP/UDP transport for ZK-family terminals.
//!
//! Fetches try the stream protocol first and fall back to the datagram
//! protocol (or the reverse for terminals marked `prefer_datagram`). Both
//! attempts run under the session timeout, and a session always sends the
//! disconnect command on the way out, even after a failure, because these
//! terminals hold very few concurrent connection slots.

use std::time::Duration;

use async_trait::async_trait;
use punchbridge_domain::constants::TERMINAL_SESSION_TIMEOUT;
use punchbridge_domain::{BridgeError, DateRange, RawPunch, Result, Terminal};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::protocol::{
    commkey_digest, encode_packet, frame_stream, parse_records, verify_checksum, PacketHeader,
    CMD_ACK_OK, CMD_ACK_UNAUTH, CMD_ATTLOG_RRQ, CMD_AUTH, CMD_CONNECT, CMD_DATA, CMD_EXIT,
    CMD_PREPARE_DATA, HEADER_LEN, STREAM_MAGIC,
};

const DATAGRAM_BUF_LEN: usize = 4096;

/// Upper bound on any wire-announced length. The largest real attendance
/// buffer is well under a megabyte; anything bigger is a corrupt or hostile
/// reply, not data.
const MAX_TRANSFER_LEN: usize = 4 * 1024 * 1024;

/// Terminal transport speaking the vendor protocol over TCP and UDP.
#[derive(Debug, Default)]
pub struct ZkTerminalClient;

impl ZkTerminalClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl punchbridge_core::TerminalTransport for ZkTerminalClient {
    async fn probe(&self, host: &str, port: u16, probe_timeout: Duration) -> Result<()> {
        match timeout(probe_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(BridgeError::Transport(format!("{host}:{port} unreachable: {e}"))),
            Err(_) => Err(BridgeError::Transport(format!(
                "{host}:{port} did not answer within {}s",
                probe_timeout.as_secs()
            ))),
        }
    }

    #[instrument(skip_all, fields(terminal = %terminal.name, host = %terminal.host))]
    async fn fetch_records(
        &self,
        terminal: &Terminal,
        range: Option<&DateRange>,
    ) -> Result<Vec<RawPunch>> {
        let stream_first = !terminal.prefer_datagram;
        let attempts: [Protocol; 2] = if stream_first {
            [Protocol::Stream, Protocol::Datagram]
        } else {
            [Protocol::Datagram, Protocol::Stream]
        };

        let mut failures = Vec::new();
        for protocol in attempts {
            match timeout(TERMINAL_SESSION_TIMEOUT, fetch_via(protocol, terminal)).await {
                Ok(Ok(mut records)) => {
                    if let Some(range) = range {
                        records.retain(|r| range.contains(r.timestamp.date()));
                    }
                    debug!(protocol = protocol.name(), records = records.len(), "fetch ok");
                    return Ok(records);
                }
                Ok(Err(e)) => {
                    warn!(protocol = protocol.name(), error = %e, "fetch attempt failed");
                    failures.push(format!("{}: {e}", protocol.name()));
                }
                Err(_) => {
                    warn!(protocol = protocol.name(), "fetch attempt timed out");
                    failures.push(format!("{}: session timed out", protocol.name()));
                }
            }
        }

        Err(BridgeError::Transport(format!(
            "fetch failed over TCP and UDP ({})",
            failures.join("; ")
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Stream,
    Datagram,
}

impl Protocol {
    fn name(self) -> &'static str {
        match self {
            Self::Stream => "tcp",
            Self::Datagram => "udp",
        }
    }
}

async fn fetch_via(protocol: Protocol, terminal: &Terminal) -> Result<Vec<RawPunch>> {
    match protocol {
        Protocol::Stream => {
            let mut wire = StreamWire::connect(&terminal.host, terminal.port).await?;
            run_session(&mut wire, terminal).await
        }
        Protocol::Datagram => {
            let mut wire = DatagramWire::connect(&terminal.host, terminal.port).await?;
            run_session(&mut wire, terminal).await
        }
    }
}

/// Full fetch session: connect, authenticate if challenged, request the
/// attendance buffer, disconnect. The disconnect runs on the failure path
/// too.
async fn run_session<W: Wire>(wire: &mut W, terminal: &Terminal) -> Result<Vec<RawPunch>> {
    let mut session = Session::handshake(wire, terminal).await?;
    let result = session.read_attendance(wire).await;
    session.teardown(wire).await;
    result
}

/// Protocol session state: the id assigned by the terminal and the rolling
/// reply counter.
struct Session {
    id: u16,
    reply: u16,
}

impl Session {
    async fn handshake<W: Wire>(wire: &mut W, terminal: &Terminal) -> Result<Self> {
        wire.send(&encode_packet(CMD_CONNECT, 0, 0, &[])).await?;
        let (header, _) = recv_packet(wire).await?;

        let mut session = Self { id: header.session, reply: 1 };
        match header.command {
            CMD_ACK_OK => Ok(session),
            CMD_ACK_UNAUTH => {
                session.authenticate(wire, terminal).await?;
                Ok(session)
            }
            other => Err(BridgeError::Transport(format!(
                "unexpected connect reply (command {other})"
            ))),
        }
    }

    async fn authenticate<W: Wire>(&mut self, wire: &mut W, terminal: &Terminal) -> Result<()> {
        let key = terminal
            .comm_key
            .as_deref()
            .unwrap_or("0")
            .parse::<u32>()
            .map_err(|_| {
                BridgeError::Auth(format!("comm key for {} is not numeric", terminal.name))
            })?;

        let digest = commkey_digest(key, self.id);
        wire.send(&encode_packet(CMD_AUTH, self.id, self.next_reply(), &digest)).await?;
        let (header, _) = recv_packet(wire).await?;
        if header.command != CMD_ACK_OK {
            return Err(BridgeError::Auth(format!(
                "terminal {} rejected the comm key",
                terminal.name
            )));
        }
        Ok(())
    }

    async fn read_attendance<W: Wire>(&mut self, wire: &mut W) -> Result<Vec<RawPunch>> {
        wire.send(&encode_packet(CMD_ATTLOG_RRQ, self.id, self.next_reply(), &[])).await?;

        let (header, payload) = recv_packet(wire).await?;
        let data = match header.command {
            // Small buffers come back inline.
            CMD_ACK_OK | CMD_DATA => payload,
            CMD_PREPARE_DATA => self.read_bulk(wire, &payload).await?,
            other => {
                return Err(BridgeError::Transport(format!(
                    "unexpected attendance reply (command {other})"
                )))
            }
        };

        // Bulk responses prefix the record array with its byte length.
        let records = if data.len() % super::protocol::RECORD_LEN == 4 {
            parse_records(&data[4..])
        } else {
            parse_records(&data)
        };
        Ok(records)
    }

    /// Accumulate CMD_DATA packets until the size announced by
    /// CMD_PREPARE_DATA has arrived, then consume the final acknowledgement.
    async fn read_bulk<W: Wire>(&mut self, wire: &mut W, prepare_payload: &[u8]) -> Result<Vec<u8>> {
        if prepare_payload.len() < 4 {
            return Err(BridgeError::Transport("truncated prepare-data reply".to_string()));
        }
        let expected = u32::from_le_bytes([
            prepare_payload[0],
            prepare_payload[1],
            prepare_payload[2],
            prepare_payload[3],
        ]) as usize;
        if expected > MAX_TRANSFER_LEN {
            return Err(BridgeError::Transport(format!(
                "announced transfer of {expected} bytes exceeds the {MAX_TRANSFER_LEN} byte limit"
            )));
        }

        let mut data = Vec::with_capacity(expected);
        while data.len() < expected {
            let (header, payload) = recv_packet(wire).await?;
            match header.command {
                CMD_DATA => data.extend_from_slice(&payload),
                CMD_ACK_OK => break,
                other => {
                    return Err(BridgeError::Transport(format!(
                        "unexpected data packet (command {other})"
                    )))
                }
            }
        }
        Ok(data)
    }

    /// Best-effort disconnect. Errors are logged, not raised: by this point
    /// the session outcome is already decided.
    async fn teardown<W: Wire>(&mut self, wire: &mut W) {
        let packet = encode_packet(CMD_EXIT, self.id, self.next_reply(), &[]);
        if let Err(e) = wire.send(&packet).await {
            debug!(error = %e, "disconnect failed");
        }
    }

    fn next_reply(&mut self) -> u16 {
        let current = self.reply;
        self.reply = self.reply.wrapping_add(1);
        current
    }
}

async fn recv_packet<W: Wire>(wire: &mut W) -> Result<(PacketHeader, Vec<u8>)> {
    let packet = wire.recv().await?;
    if !verify_checksum(&packet) {
        return Err(BridgeError::Transport("checksum mismatch in reply".to_string()));
    }
    let header = PacketHeader::parse(&packet)
        .ok_or_else(|| BridgeError::Transport("short reply packet".to_string()))?;
    Ok((header, packet[HEADER_LEN..].to_vec()))
}

/// One packet in, one packet out. Stream framing differences live behind
/// this trait so the session logic is shared between TCP and UDP.
trait Wire: Send {
    fn send(&mut self, packet: &[u8]) -> impl std::future::Future<Output = Result<()>> + Send;
    fn recv(&mut self) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

struct StreamWire {
    stream: TcpStream,
}

impl StreamWire {
    async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| BridgeError::Transport(format!("tcp connect failed: {e}")))?;
        Ok(Self { stream })
    }
}

impl Wire for StreamWire {
    async fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.stream
            .write_all(&frame_stream(packet))
            .await
            .map_err(|e| BridgeError::Transport(format!("tcp write failed: {e}")))
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        let mut prologue = [0u8; 8];
        self.stream
            .read_exact(&mut prologue)
            .await
            .map_err(|e| BridgeError::Transport(format!("tcp read failed: {e}")))?;
        if prologue[..4] != STREAM_MAGIC {
            return Err(BridgeError::Transport("bad frame magic".to_string()));
        }
        let len = u32::from_le_bytes([prologue[4], prologue[5], prologue[6], prologue[7]]) as usize;
        if len > MAX_TRANSFER_LEN {
            return Err(BridgeError::Transport(format!(
                "framed packet of {len} bytes exceeds the {MAX_TRANSFER_LEN} byte limit"
            )));
        }

        let mut packet = vec![0u8; len];
        self.stream
            .read_exact(&mut packet)
            .await
            .map_err(|e| BridgeError::Transport(format!("tcp read failed: {e}")))?;
        Ok(packet)
    }
}

struct DatagramWire {
    socket: UdpSocket,
}

impl DatagramWire {
    async fn connect(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| BridgeError::Transport(format!("udp bind failed: {e}")))?;
        socket
            .connect((host, port))
            .await
            .map_err(|e| BridgeError::Transport(format!("udp connect failed: {e}")))?;
        Ok(Self { socket })
    }
}

impl Wire for DatagramWire {
    async fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.socket
            .send(packet)
            .await
            .map_err(|e| BridgeError::Transport(format!("udp send failed: {e}")))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; DATAGRAM_BUF_LEN];
        let len = self
            .socket
            .recv(&mut buf)
            .await
            .map_err(|e| BridgeError::Transport(format!("udp recv failed: {e}")))?;
        buf.truncate(len);
        Ok(buf)
    }
}
