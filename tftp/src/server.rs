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

//! A concurrent TFTP server.
//!
//! One acceptor task listens on the well-known port; every read or write
//! request is handed to its own transfer task bound to a fresh ephemeral
//! socket, which becomes the server's transfer id for that exchange. The
//! acceptor and the transfers share nothing but the shutdown flag and the
//! in-flight table.

use crate::error::{Result, TftpError};
use crate::netascii::{NetasciiDecoder, NetasciiEncoder};
use crate::packet::{ErrorCode, TftpPacket, TransferMode, SEGMENT_SIZE, TFTP_PORT};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which transfer directions the server honors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ServerMode {
    /// Serve reads only.
    GetOnly,
    /// Accept writes only.
    PutOnly,
    /// Serve reads and accept writes.
    #[default]
    GetAndPut,
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the acceptor binds to.
    pub bind_address: SocketAddr,
    /// Directory reads are served from. Requests resolving outside it are
    /// rejected with an access violation.
    pub root_dir: PathBuf,
    /// Directory writes land in; defaults to `root_dir` when `None`.
    pub write_dir: Option<PathBuf>,
    /// Which transfer directions to honor.
    pub mode: ServerMode,
    /// Per-receive timeout inside a transfer.
    pub timeout: Duration,
    /// Consecutive receive timeouts tolerated before a transfer is dropped.
    pub max_timeouts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: SocketAddr::from(([0, 0, 0, 0], TFTP_PORT)),
            root_dir: PathBuf::from("."),
            write_dir: None,
            mode: ServerMode::default(),
            timeout: Duration::from_secs(5),
            max_timeouts: crate::client::DEFAULT_MAX_TIMEOUTS,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration serving `root_dir` on the default port.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        ServerConfig {
            root_dir: root_dir.into(),
            ..ServerConfig::default()
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_bind_address(mut self, bind_address: SocketAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Sets the directory writes land in.
    #[must_use]
    pub fn with_write_dir(mut self, write_dir: impl Into<PathBuf>) -> Self {
        self.write_dir = Some(write_dir.into());
        self
    }

    /// Sets which transfer directions the server honors.
    #[must_use]
    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the per-receive timeout inside transfers.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the transfer retry budget. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_timeouts(mut self, max_timeouts: u32) -> Self {
        self.max_timeouts = max_timeouts.max(1);
        self
    }
}

/// A running TFTP server.
///
/// # Example
///
/// ```no_run
/// use retronet_tftp::{ServerConfig, TftpServer};
///
/// # async fn example() -> retronet_tftp::Result<()> {
/// let config = ServerConfig::new("/srv/tftp")
///     .with_bind_address("0.0.0.0:69".parse().unwrap());
/// let server = TftpServer::bind(config).await?;
/// // ... serve until shutdown ...
/// server.close().await;
/// # Ok(())
/// # }
/// ```
pub struct TftpServer {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TftpServer {
    /// Binds the acceptor socket and starts serving.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_address).await?;
        let local_addr = socket.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        info!("TFTP server bound to {local_addr}");

        let shared = Arc::new(Shared {
            config,
            running: running.clone(),
            shutdown: shutdown.clone(),
            transfers: DashMap::new(),
        });
        let handle = tokio::spawn(accept_loop(socket, shared));

        Ok(TftpServer {
            local_addr,
            running,
            shutdown,
            accept_handle: tokio::sync::Mutex::new(Some(handle)),
        })
    }

    /// The address the acceptor actually bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the acceptor and cancels in-flight transfers.
    ///
    /// Idempotent: closing an already-closed server does nothing.
    pub async fn close(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("shutting down TFTP server on {}", self.local_addr);
        self.shutdown.notify_waiters();
        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}

/// State shared between the acceptor and the transfer tasks.
struct Shared {
    config: ServerConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    /// Peers with a transfer in flight; retransmitted requests from an
    /// already-served TID are dropped instead of spawning a second handler.
    transfers: DashMap<SocketAddr, ()>,
}

async fn accept_loop(socket: UdpSocket, shared: Arc<Shared>) {
    let mut buf = [0u8; 1024];
    loop {
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        let received = tokio::select! {
            result = socket.recv_from(&mut buf) => result,
            () = shared.shutdown.notified() => break,
        };
        let (len, peer) = match received {
            Ok(pair) => pair,
            Err(err) => {
                warn!("accept socket receive failed: {err}");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let request = match TftpPacket::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(err) => {
                debug!("undecodable request from {peer}: {err}");
                continue;
            }
        };

        if shared.transfers.contains_key(&peer) {
            debug!("duplicate request from {peer} with a transfer in flight, dropping");
            continue;
        }

        match request {
            TftpPacket::ReadRequest { filename, mode } => {
                let shared = shared.clone();
                tokio::spawn(async move {
                    run_transfer(shared, peer, TransferKind::Read { filename, mode }).await;
                });
            }
            TftpPacket::WriteRequest { filename, mode } => {
                let shared = shared.clone();
                tokio::spawn(async move {
                    run_transfer(shared, peer, TransferKind::Write { filename, mode }).await;
                });
            }
            other => {
                debug!("non-request packet {other:?} on the accept port from {peer}");
                let reply = TftpPacket::Error {
                    code: ErrorCode::IllegalOperation,
                    message: "Expected a read or write request".to_string(),
                };
                let _ = socket.send_to(&reply.to_bytes(), peer).await;
            }
        }
    }
    info!("TFTP accept loop terminated");
}

enum TransferKind {
    Read { filename: String, mode: TransferMode },
    Write { filename: String, mode: TransferMode },
}

/// Runs one transfer on a fresh ephemeral socket, reporting failures to the
/// peer as ERROR packets.
async fn run_transfer(shared: Arc<Shared>, peer: SocketAddr, kind: TransferKind) {
    shared.transfers.insert(peer, ());
    let result = async {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(peer).await?;
        let transfer = Transfer {
            shared: &shared,
            socket,
            peer,
        };
        match kind {
            TransferKind::Read { filename, mode } => transfer.serve_read(&filename, mode).await,
            TransferKind::Write { filename, mode } => transfer.serve_write(&filename, mode).await,
        }
    }
    .await;
    shared.transfers.remove(&peer);

    if let Err(err) = result {
        debug!("transfer for {peer} ended with {err}");
    }
}

struct Transfer<'a> {
    shared: &'a Shared,
    socket: UdpSocket,
    peer: SocketAddr,
}

impl Transfer<'_> {
    async fn send(&self, packet: &TftpPacket) -> Result<()> {
        self.socket.send(&packet.to_bytes()).await?;
        Ok(())
    }

    /// Sends an ERROR packet and returns the matching local error.
    async fn fail(&self, code: ErrorCode, message: &str) -> TftpError {
        let reply = TftpPacket::Error {
            code,
            message: message.to_string(),
        };
        if let Err(err) = self.send(&reply).await {
            debug!("could not deliver error to {}: {err}", self.peer);
        }
        match code {
            ErrorCode::AccessViolation => TftpError::Policy(message.to_string()),
            code => TftpError::Peer {
                code,
                message: message.to_string(),
            },
        }
    }

    /// Serves a read request: DATA blocks out, ACKs in.
    async fn serve_read(&self, filename: &str, mode: TransferMode) -> Result<()> {
        let config = &self.shared.config;
        if config.mode == ServerMode::PutOnly {
            return Err(self.fail(ErrorCode::AccessViolation, "Access violation").await);
        }
        let path = match resolve_within(&config.root_dir, filename) {
            Some(path) => path,
            None => {
                return Err(self.fail(ErrorCode::AccessViolation, "Access violation").await);
            }
        };
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.fail(ErrorCode::FileNotFound, "File not found").await);
            }
            Err(err) => {
                warn!("cannot open {path:?}: {err}");
                return Err(self.fail(ErrorCode::AccessViolation, "Access violation").await);
            }
        };
        debug!("serving {path:?} to {} in {mode} mode", self.peer);

        let encoder = (mode == TransferMode::Netascii).then(NetasciiEncoder::new);
        let mut staging: Vec<u8> = Vec::with_capacity(2 * SEGMENT_SIZE);
        let mut chunk = [0u8; SEGMENT_SIZE];
        let mut eof = false;
        let mut block: u16 = 1;

        loop {
            while staging.len() < SEGMENT_SIZE && !eof {
                let n = file.read(&mut chunk).await?;
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
            let payload: Vec<u8> = staging.drain(..take).collect();
            let last = payload.len() < SEGMENT_SIZE;
            let data = TftpPacket::Data {
                block,
                payload: payload.into(),
            };

            self.await_ack(&data, block).await?;
            if last {
                debug!("finished sending {path:?} to {}", self.peer);
                return Ok(());
            }
            block = block.wrapping_add(1);
        }
    }

    /// Serves a write request: ACKs out, DATA blocks in.
    async fn serve_write(&self, filename: &str, mode: TransferMode) -> Result<()> {
        let config = &self.shared.config;
        if config.mode == ServerMode::GetOnly {
            return Err(self.fail(ErrorCode::AccessViolation, "Access violation").await);
        }
        let write_root = config.write_dir.as_ref().unwrap_or(&config.root_dir);
        let path = match resolve_within(write_root, filename) {
            Some(path) => path,
            None => {
                return Err(self.fail(ErrorCode::AccessViolation, "Access violation").await);
            }
        };
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(self.fail(ErrorCode::FileExists, "File already exists").await);
        }
        let mut file = match tokio::fs::File::create(&path).await {
            Ok(file) => file,
            Err(err) => {
                warn!("cannot create {path:?}: {err}");
                return Err(self.fail(ErrorCode::AccessViolation, "Access violation").await);
            }
        };
        debug!("receiving {path:?} from {} in {mode} mode", self.peer);

        let mut decoder = (mode == TransferMode::Netascii).then(NetasciiDecoder::new);
        let mut translated = Vec::new();
        let mut block: u16 = 0;

        loop {
            let ack = TftpPacket::Ack { block };
            let expected = block.wrapping_add(1);
            let (data_block, payload) = self.await_data(&ack, expected).await?;

            if data_block == expected {
                match &mut decoder {
                    Some(d) => {
                        translated.clear();
                        d.decode(&payload, &mut translated);
                        file.write_all(&translated).await?;
                    }
                    None => file.write_all(&payload).await?,
                }
                block = expected;
                if payload.len() < SEGMENT_SIZE {
                    self.send(&TftpPacket::Ack { block }).await?;
                    if let Some(d) = &mut decoder {
                        translated.clear();
                        d.finish(&mut translated);
                        file.write_all(&translated).await?;
                    }
                    file.flush().await?;
                    debug!("finished receiving {path:?} from {}", self.peer);
                    return Ok(());
                }
            }
            // A duplicate of the previous block loops around and re-ACKs.
        }
    }

    /// Sends `packet` and waits for ACK of `block`, honoring the retry
    /// budget and the server shutdown signal.
    async fn await_ack(&self, packet: &TftpPacket, block: u16) -> Result<()> {
        self.send(packet).await?;
        let mut buf = [0u8; 1024];
        let mut timeouts = 0u32;
        loop {
            let len = match self.receive(&mut buf, &mut timeouts, packet).await? {
                Some(len) => len,
                None => continue,
            };
            match TftpPacket::decode(&buf[..len]) {
                Ok(TftpPacket::Ack { block: ack_block }) if ack_block == block => return Ok(()),
                Ok(TftpPacket::Ack { .. }) => {} // stale, keep waiting
                Ok(TftpPacket::Error { code, message }) => {
                    return Err(TftpError::Peer { code, message });
                }
                Ok(_) => {
                    return Err(TftpError::Protocol(
                        "received unexpected packet type".to_string(),
                    ));
                }
                Err(err) => return Err(TftpError::Protocol(format!("bad packet: {err}"))),
            }
        }
    }

    /// Sends `packet` (an ACK) and waits for the expected DATA block or a
    /// duplicate of the previous one.
    async fn await_data(&self, packet: &TftpPacket, expected: u16) -> Result<(u16, bytes::Bytes)> {
        self.send(packet).await?;
        let previous = expected.wrapping_sub(1);
        let mut buf = [0u8; 4 + SEGMENT_SIZE];
        let mut timeouts = 0u32;
        loop {
            let len = match self.receive(&mut buf, &mut timeouts, packet).await? {
                Some(len) => len,
                None => continue,
            };
            match TftpPacket::decode(&buf[..len]) {
                Ok(TftpPacket::Data { block, payload })
                    if block == expected || block == previous =>
                {
                    return Ok((block, payload));
                }
                Ok(TftpPacket::Data { .. }) => {} // out of sequence, drop
                Ok(TftpPacket::Error { code, message }) => {
                    return Err(TftpError::Peer { code, message });
                }
                Ok(_) => {
                    return Err(TftpError::Protocol(
                        "received unexpected packet type".to_string(),
                    ));
                }
                Err(err) => return Err(TftpError::Protocol(format!("bad packet: {err}"))),
            }
        }
    }

    /// One bounded receive. Returns `Ok(Some(len))` on data, `Ok(None)`
    /// after a tolerated timeout (with `packet` retransmitted), and errors
    /// on budget exhaustion or shutdown.
    async fn receive(
        &self,
        buf: &mut [u8],
        timeouts: &mut u32,
        packet: &TftpPacket,
    ) -> Result<Option<usize>> {
        let config = &self.shared.config;
        let received = tokio::select! {
            result = tokio::time::timeout(config.timeout, self.socket.recv(buf)) => result,
            () = self.shared.shutdown.notified() => return Err(TftpError::Closed),
        };
        match received {
            Ok(result) => Ok(Some(result?)),
            Err(_elapsed) => {
                *timeouts += 1;
                if *timeouts >= config.max_timeouts {
                    return Err(TftpError::Timeout);
                }
                self.send(packet).await?;
                Ok(None)
            }
        }
    }
}

/// Resolves `filename` against `root` lexically, refusing any path that
/// steps outside it. Absolute request paths are treated as root-relative.
fn resolve_within(root: &Path, filename: &str) -> Option<PathBuf> {
    let requested = Path::new(filename);
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in requested.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(resolved)
}
