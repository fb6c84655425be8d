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

//! Error types for NTP operations.

use thiserror::Error;

/// Result type for NTP operations.
pub type Result<T> = std::result::Result<T, NtpError>;

/// NTP error types.
#[derive(Debug, Error)]
pub enum NtpError {
    /// I/O error from the underlying UDP socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The datagram was not a well-formed NTP packet.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No reply arrived within the configured per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Programmer misuse of the API.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
