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

//! # Retronet Telnet
//!
//! A Telnet engine (RFC 854) with RFC 1143 "Q-method" option negotiation.
//!
//! ## Overview
//!
//! Telnet interleaves application data with in-band command sequences
//! introduced by the IAC byte (0xFF): two-byte commands, three-byte
//! WILL/WONT/DO/DONT option negotiations, and variable-length
//! subnegotiations bracketed by `IAC SB … IAC SE`. This crate separates
//! the two streams and keeps them separated both ways:
//!
//! - **Data transparency.** Any byte sequence without IAC is delivered to
//!   the caller verbatim; a doubled IAC delivers a literal 0xFF; command
//!   sequences are never delivered as data.
//! - **Loop-free negotiation.** Each side of each option runs the RFC 1143
//!   state machine, which answers every request exactly once and never
//!   acknowledges a steady-state confirmation — the property that makes
//!   WILL/DO echo storms impossible.
//! - **Pluggable options.** Per-option behavior lives in
//!   [`OptionHandler`] capability records collected in a
//!   [`HandlerRegistry`]: initial desires, acceptance policy and
//!   subnegotiation callbacks. Terminal-type, echo, suppress-go-ahead and
//!   binary transmission come built in.
//!
//! ## Core components
//!
//! [`TelnetCodec`] is the byte state machine, usable directly as a
//! `tokio_util` codec. [`TelnetStream`] couples it inline to a transport:
//! each `read` drives the machine until a data byte is ready.
//! [`TelnetConnection`] spawns a dedicated reader task instead, decoding
//! into a bounded 2 KiB ring the caller drains; the two variants share the
//! [`TelnetRead`] interface.
//!
//! ## Usage Example
//!
//! ```no_run
//! use retronet_telnet::{TelnetConnection, HandlerRegistry};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> retronet_telnet::Result<()> {
//! let tcp = TcpStream::connect("bbs.example.org:23").await?;
//! let connection = TelnetConnection::spawn(tcp, HandlerRegistry::default());
//!
//! let mut buf = [0u8; 512];
//! let n = connection.read(&mut buf).await?;
//! connection.write_all(b"guest\r\n").await?;
//! connection.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 855: Telnet Option Specifications
//! - RFC 856: Telnet Binary Transmission
//! - RFC 857: Telnet Echo Option
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 1091: Telnet Terminal-Type Option
//! - RFC 1143: The Q Method of Implementing TELNET Option Negotiation

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

mod codec;
pub mod consts;
mod error;
mod event;
mod frame;
pub mod handlers;
mod options;
mod ring;
mod stream;

pub use self::codec::{TelnetCodec, TelnetEncoder, SUBNEGOTIATION_BUFFER_MAX};
pub use self::error::{Result, TelnetError};
pub use self::event::TelnetEvent;
pub use self::frame::TelnetFrame;
pub use self::handlers::{HandlerRegistry, OptionHandler};
pub use self::options::{TelnetOption, TelnetSide};
pub use self::ring::{RingBuffer, RING_CAPACITY};
pub use self::stream::{TelnetConnection, TelnetRead, TelnetStream};
