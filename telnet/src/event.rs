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

//! Decoder output events.

use crate::options::{TelnetOption, TelnetSide};
use bytes::Bytes;

/// What the decoder produced from the inbound stream.
///
/// Negotiation bytes never surface here directly: the codec runs them
/// through the option state machine and queues any replies internally. A
/// completed negotiation is reported as [`TelnetEvent::OptionStatus`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TelnetEvent {
    /// One byte of application data, with IAC escapes already resolved.
    Data(u8),
    /// No operation.
    NoOperation,
    /// Data Mark.
    DataMark,
    /// The peer pressed Break or Attention.
    Break,
    /// Interrupt the current process.
    InterruptProcess,
    /// Cancel output of the current process.
    AbortOutput,
    /// The peer asks for a sign of life.
    AreYouThere,
    /// Erase the previous character.
    EraseCharacter,
    /// Erase the current line.
    EraseLine,
    /// End of input for half-duplex connections.
    GoAhead,
    /// An option changed state on one side of the connection.
    OptionStatus(TelnetOption, TelnetSide, bool),
    /// A complete subnegotiation payload arrived (option byte excluded).
    Subnegotiation(TelnetOption, Bytes),
}
