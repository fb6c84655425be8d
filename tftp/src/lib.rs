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

//! # Retronet TFTP
//!
//! A Trivial File Transfer Protocol (RFC 1350) implementation: a lockstep
//! [`TftpClient`] and a concurrent [`TftpServer`].
//!
//! ## Protocol shape
//!
//! TFTP runs over UDP in strict lockstep. The requester sends a read or
//! write request to the well-known port 69; the server answers from a
//! freshly chosen ephemeral port — its transfer id (TID) for the exchange —
//! and every 512-byte DATA block is acknowledged before the next one moves.
//! A DATA block shorter than 512 bytes marks the end of the file. Block
//! numbers wrap modulo 65536, so files larger than 32 MiB work.
//!
//! Loss is handled by retransmission: whichever side is waiting re-sends
//! its last control packet after a timeout, up to a configurable budget.
//! Duplicate DATA blocks are re-acknowledged but written only once, and
//! only the immediately previous block is ever re-acknowledged, which keeps
//! a delayed duplicate from igniting the classic ACK/DATA retransmission
//! storm.
//!
//! ## Modes
//!
//! `octet` moves raw bytes. `netascii` translates line endings (LF locally,
//! CRLF on the wire) on both sides of the transfer. `mail` is accepted on
//! the wire for completeness.
//!
//! ## Server policy
//!
//! The server serves files under a configured root directory and refuses —
//! with ERROR 2, "Access violation" — any request whose resolved path
//! escapes it, as well as any request in a direction its
//! [`ServerMode`] does not allow. Each transfer runs on its own task and
//! socket; [`TftpServer::close`] cancels them all.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod client;
mod error;
pub mod netascii;
mod packet;
mod server;

pub use self::client::{TftpClient, DEFAULT_MAX_TIMEOUTS};
pub use self::error::{Result, TftpError};
pub use self::packet::{ErrorCode, TftpPacket, TransferMode, SEGMENT_SIZE, TFTP_PORT};
pub use self::server::{ServerConfig, ServerMode, TftpServer};
