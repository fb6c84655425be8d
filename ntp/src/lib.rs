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

//! # Retronet NTP
//!
//! An NTPv3 (RFC 1305) packet codec and the timing arithmetic needed to turn
//! a server reply into a round-trip delay and local clock offset.
//!
//! The crate is built from three small pieces:
//!
//! - [`NtpTimestamp`] — the 64-bit fixed-point wire timestamp: 32 bits of
//!   seconds since 1900-01-01 UTC and 32 bits of binary second fraction.
//!   Conversion to and from Unix milliseconds uses the timestamp's most
//!   significant bit to select the era base, so values past 2036 survive the
//!   trip.
//! - [`NtpMessage`] — the fixed 48-byte NTPv3 header, read and written in
//!   network byte order.
//! - [`TimeInfo`] — a received message plus the local destination time, from
//!   which [`TimeInfo::compute_details`] derives delay and offset while
//!   recording validation warnings as plain-text comments.
//!
//! [`SntpClient`] wires the three together for a simple query:
//!
//! ```no_run
//! use retronet_ntp::SntpClient;
//!
//! # async fn example() -> retronet_ntp::Result<()> {
//! let client = SntpClient::new();
//! let mut info = client.query("129.6.15.28:123".parse().unwrap()).await?;
//! info.compute_details();
//! println!("offset: {:?} ms, delay: {:?} ms", info.offset(), info.delay());
//! # Ok(())
//! # }
//! ```

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
mod packet;
mod time_info;
mod timestamp;

pub use self::client::SntpClient;
pub use self::error::{NtpError, Result};
pub use self::packet::{LeapIndicator, Mode, NtpMessage, NTP_PACKET_SIZE, NTP_PORT};
pub use self::time_info::TimeInfo;
pub use self::timestamp::NtpTimestamp;
