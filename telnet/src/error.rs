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

//! Error types for the Telnet engine.

use thiserror::Error;

/// Result type for Telnet operations.
pub type Result<T> = std::result::Result<T, TelnetError>;

/// Telnet error types.
#[derive(Debug, Error)]
pub enum TelnetError {
    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A negotiation request was refused, e.g. enabling an option no
    /// handler supports.
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// The connection has been closed.
    #[error("Connection closed")]
    Closed,
}
