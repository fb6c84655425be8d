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

//! Error types for TFTP transfers.

use crate::packet::ErrorCode;
use thiserror::Error;

/// Result type for TFTP operations.
pub type Result<T> = std::result::Result<T, TftpError>;

/// TFTP error types.
#[derive(Debug, Error)]
pub enum TftpError {
    /// I/O error from the underlying UDP socket or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram violated the TFTP wire format or arrived out of protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The peer reported an error; its message is passed through verbatim.
    #[error("Error code {code} received: {message}")]
    Peer {
        /// RFC 1350 error code from the ERROR packet.
        code: ErrorCode,
        /// Peer-supplied error message.
        message: String,
    },

    /// The retry budget was exhausted without a reply.
    #[error("Connection timed out")]
    Timeout,

    /// A server-side policy rejection (path escape or transfer-mode
    /// mismatch).
    #[error("Access violation: {0}")]
    Policy(String),

    /// Programmer misuse of the API.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was cancelled because the endpoint was closed.
    #[error("Transfer endpoint closed")]
    Closed,
}

impl TftpError {
    /// Whether retrying the whole transfer might succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TftpError::Timeout | TftpError::Io(_))
    }
}
