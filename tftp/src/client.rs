//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The lockstep TFTP client.

use crate::error::{Result, TftpError};
use crate::netascii::{NetasciiDecoder, NetasciiEncoder};
use crate::packet::{ErrorCode, TftpPacket, TransferMode, SEGMENT_SIZE};
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Default number of consecutive receive timeouts tolerated before a
/// transfer fails.
pub const DEFAULT_MAX_TIMEOUTS: u32 = 5;

/// Default per-receive timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A TFTP client (RFC 1350).
///
/// Transfers run in lockstep: every DATA packet is acknowledged before the
/// next is sent, and an unanswered packet is retransmitted up to the
/// configured timeout budget.
///
/// # Example
///
/// ```no_run
/// use retronet_tftp::{TftpClient, TransferMode};
///
/// # async fn example() -> retronet_tftp::Result<()> {
/// let mut client = TftpClient::bind().await?;
/// let mut sink = Vec::new();
/// let bytes = client
///     .receive_file("boot.img", TransferMode::Octet, &mut sink, "10.0.0.1:69".parse().unwrap())
///     .await?;
/// assert_eq!(bytes as usize, sink.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TftpClient {
    socket: UdpSocket,
    timeout: Duration,
    max_timeouts: u32,
    total_bytes_received: u64,
    total_bytes_sent: u64,
}

impl TftpClient {
    /// Binds a client socket to an ephemeral local port.
    pub async fn bind() -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(TftpClient {
            socket,
            timeout: DEFAULT_TIMEOUT,
            max_timeouts: DEFAULT_MAX_TIMEOUTS,
            total_bytes_received: 0,
            total_bytes_sent: 0,
        })
    }

    /// Sets the per-receive timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many consecutive receive timeouts end the transfer.
    /// Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_timeouts(mut self, max_timeouts: u32) -> Self {
        self.max_timeouts = max_timeouts.max(1);
        self
    }

    /// Bytes of payload received during the last download.
    #[must_use]
    pub fn total_bytes_received(&self) -> u64 {
        self.total_bytes_received
    }

    /// Bytes of payload sent during the last upload.
    #[must_use]
    pub fn total_bytes_sent(&self) -> u64 {
        self.total_bytes_sent
    }

    /// Requests `filename` from the server and writes its contents to
    /// `output`, returning the number of payload bytes received.
    ///
    /// In [`TransferMode::Netascii`] the payload counter reflects wire
    /// bytes, before CRLF translation.
    pub async fn receive_file<W>(
        &mut self,
        filename: &str,
        mode: TransferMode,
        output: &mut W,
        server: SocketAddr,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        if filename.is_empty() {
            return Err(TftpError::InvalidArgument("empty file name".to_string()));
        }
        self.total_bytes_received = 0;

        let mut decoder = (mode == TransferMode::Netascii).then(NetasciiDecoder::new);
        let mut exchange = Exchange::new(&self.socket, server, self.timeout, self.max_timeouts);
        let mut sent = TftpPacket::ReadRequest {
            filename: filename.to_string(),
            mode,
        };
        let mut block: u16 = 1;
        let mut translated = Vec::new();

        loop {
            let expected = block;
            let previous = block.wrapping_sub(1);
            let (data_block, payload) = exchange
                .send_and_await(&sent, |packet| match packet {
                    // The expected block, or a retransmit of the previous
                    // one whose ACK apparently got lost. Older duplicates
                    // are dropped without a fresh ACK, so a delayed
                    // retransmit cannot touch off an ACK/DATA echo loop.
                    TftpPacket::Data {
                        block: data_block,
                        payload,
                    } if data_block == expected || data_block == previous => {
                        Verdict::Deliver((data_block, payload))
                    }
                    TftpPacket::Data { .. } => Verdict::Ignore,
                    _ => Verdict::Unexpected,
                })
                .await?;

            if data_block == block {
                self.total_bytes_received += payload.len() as u64;
                match &mut decoder {
                    Some(decoder) => {
                        translated.clear();
                        decoder.decode(&payload, &mut translated);
                        output.write_all(&translated).await?;
                    }
                    None => output.write_all(&payload).await?,
                }
                block = block.wrapping_add(1);
            }
            // A duplicate of the previous block falls through so its ACK is
            // resent without re-delivering the data.

            sent = TftpPacket::Ack { block: data_block };
            if payload.len() < SEGMENT_SIZE {
                // Short block: end of transfer. The final ACK is sent once,
                // unconfirmed, per the protocol.
                exchange.send(&sent).await?;
                if let Some(decoder) = &mut decoder {
                    translated.clear();
                    decoder.finish(&mut translated);
                    output.write_all(&translated).await?;
                }
                output.flush().await?;
                debug!(
                    "received {} bytes of {filename} from {}",
                    self.total_bytes_received, exchange.peer
                );
                return Ok(self.total_bytes_received);
            }
        }
    }

    /// Sends the contents of `input` to the server as `filename`, returning
    /// the number of payload bytes sent.
    pub async fn send_file<R>(
        &mut self,
        filename: &str,
        mode: TransferMode,
        input: &mut R,
        server: SocketAddr,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        if filename.is_empty() {
            return Err(TftpError::InvalidArgument("empty file name".to_string()));
        }
        self.total_bytes_sent = 0;

        let encoder = (mode == TransferMode::Netascii).then(NetasciiEncoder::new);
        let mut exchange = Exchange::new(&self.socket, server, self.timeout, self.max_timeouts);
        let mut sent = TftpPacket::WriteRequest {
            filename: filename.to_string(),
            mode,
        };
        let mut block: u16 = 0;
        let mut staging: Vec<u8> = Vec::with_capacity(2 * SEGMENT_SIZE);
        let mut chunk = [0u8; SEGMENT_SIZE];
        let mut eof = false;
        let mut last_ack_wait = false;

        loop {
            exchange
                .send_and_await(&sent, |packet| match packet {
                    TftpPacket::Ack { block: ack_block } if ack_block == block => {
                        Verdict::Deliver(())
                    }
                    // Stale ACKs are discarded; the exchange keeps waiting.
                    TftpPacket::Ack { .. } => Verdict::Ignore,
                    _ => Verdict::Unexpected,
                })
                .await?;
            block = block.wrapping_add(1);

            if last_ack_wait {
                debug!(
                    "sent {} bytes of {filename} to {}",
                    self.total_bytes_sent, exchange.peer
                );
                return Ok(self.total_bytes_sent);
            }

            // Refill the staging buffer to at least one full segment.
            while staging.len() < SEGMENT_SIZE && !eof {
                let n = input.read(&mut chunk).await?;
                if n == 0 {
                    eof = true;
                } else {
                    match &encoder {
                        Some(encoder) => encoder.encode(&chunk[..n], &mut staging),
                        None => staging.extend_from_slice(&chunk[..n]),
                    }
                }
            }
            let take = staging.len().min(SEGMENT_SIZE);
            let payload: Bytes = Bytes::from(staging.drain(..take).collect::<Vec<u8>>());
            if payload.len() < SEGMENT_SIZE {
                last_ack_wait = true;
            }
            self.total_bytes_sent += payload.len() as u64;
            sent = TftpPacket::Data { block, payload };
        }
    }
}

/// What a reply filter decided about a decoded packet.
enum Verdict<T> {
    /// The awaited reply; hand it to the caller.
    Deliver(T),
    /// A stale duplicate of the right packet type; keep waiting.
    Ignore,
    /// A packet type that has no business arriving now; fail the transfer.
    Unexpected,
}

/// One side of a lockstep exchange: sends a control packet, then waits for
/// the matching reply, retransmitting on timeout and policing the peer's
/// transfer id.
struct Exchange<'a> {
    socket: &'a UdpSocket,
    /// Current peer endpoint: the well-known port until the first reply,
    /// then the server's chosen TID.
    peer: SocketAddr,
    /// The port the request was sent to; the first reply must not come
    /// from it (RFC 1350 requires the server to pick a fresh TID).
    request_port: u16,
    timeout: Duration,
    max_timeouts: u32,
    tid_bound: bool,
    buf: Box<[u8; 2 + 2 + SEGMENT_SIZE]>,
}

impl<'a> Exchange<'a> {
    fn new(socket: &'a UdpSocket, server: SocketAddr, timeout: Duration, max_timeouts: u32) -> Self {
        Exchange {
            socket,
            peer: server,
            request_port: server.port(),
            timeout,
            max_timeouts,
            tid_bound: false,
            buf: Box::new([0u8; 2 + 2 + SEGMENT_SIZE]),
        }
    }

    async fn send(&self, packet: &TftpPacket) -> Result<()> {
        self.socket.send_to(&packet.to_bytes(), self.peer).await?;
        Ok(())
    }

    async fn send_error(&self, to: SocketAddr, code: ErrorCode, message: &str) -> Result<()> {
        let error = TftpPacket::Error {
            code,
            message: message.to_string(),
        };
        self.socket.send_to(&error.to_bytes(), to).await?;
        Ok(())
    }

    /// Sends `packet` and waits for a reply `accept` recognizes.
    ///
    /// Timeouts retransmit `packet` and count against the budget. Replies
    /// from an unexpected endpoint are answered with ERROR 5 and do not
    /// reset the wait. An ERROR packet from the peer fails the transfer
    /// with its code and message intact.
    async fn send_and_await<T>(
        &mut self,
        packet: &TftpPacket,
        accept: impl Fn(TftpPacket) -> Verdict<T>,
    ) -> Result<T> {
        self.send(packet).await?;
        let mut timeouts = 0u32;
        loop {
            let received = tokio::time::timeout(self.timeout, self.socket.recv_from(&mut self.buf[..]))
                .await;
            let (len, from) = match received {
                Ok(result) => result?,
                Err(_elapsed) => {
                    timeouts += 1;
                    if timeouts >= self.max_timeouts {
                        return Err(TftpError::Timeout);
                    }
                    debug!("timeout {timeouts}/{} waiting on {}", self.max_timeouts, self.peer);
                    self.send(packet).await?;
                    continue;
                }
            };

            if !self.tid_bound {
                self.tid_bound = true;
                if from.port() == self.request_port {
                    self.send_error(from, ErrorCode::UnknownTid, "INCORRECT SOURCE PORT")
                        .await?;
                    return Err(TftpError::Protocol(format!(
                        "incorrect source port ({}) in request reply",
                        from.port()
                    )));
                }
                // Adopt the server's transfer id, and its address if the
                // reply came from a different interface.
                self.peer.set_port(from.port());
                if from.ip() != self.peer.ip() {
                    self.peer.set_ip(from.ip());
                }
            }

            if from != self.peer {
                warn!("datagram from unexpected endpoint {from}, expected {}", self.peer);
                self.send_error(from, ErrorCode::UnknownTid, "Unexpected host or port.")
                    .await?;
                continue;
            }

            match TftpPacket::decode(&self.buf[..len]) {
                Ok(TftpPacket::Error { code, message }) => {
                    return Err(TftpError::Peer { code, message });
                }
                Ok(reply) => match accept(reply) {
                    Verdict::Deliver(value) => return Ok(value),
                    Verdict::Ignore => continue,
                    Verdict::Unexpected => {
                        return Err(TftpError::Protocol(
                            "received unexpected packet type".to_string(),
                        ));
                    }
                },
                Err(err) => {
                    return Err(TftpError::Protocol(format!("bad packet: {err}")));
                }
            }
        }
    }
}
