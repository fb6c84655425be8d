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

//! Wire-level Telnet frames.

use crate::options::TelnetOption;
use bytes::Bytes;
use std::fmt;

/// A single frame on the Telnet wire: one data byte, a two-byte command, a
/// three-byte negotiation, or a subnegotiation sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TelnetFrame {
    /// A plain data byte. An IAC data byte is escaped on encode.
    Data(u8),
    /// No operation.
    NoOperation,
    /// Data Mark: the stream half of a Synch.
    DataMark,
    /// Break.
    Break,
    /// Interrupt Process.
    InterruptProcess,
    /// Abort Output.
    AbortOutput,
    /// Are You There.
    AreYouThere,
    /// Erase Character.
    EraseCharacter,
    /// Erase Line.
    EraseLine,
    /// Go Ahead.
    GoAhead,
    /// Ask the peer to enable an option.
    Do(TelnetOption),
    /// Ask the peer to stop performing an option.
    Dont(TelnetOption),
    /// Offer to enable an option on our side.
    Will(TelnetOption),
    /// Refuse (or stop) performing an option.
    Wont(TelnetOption),
    /// A subnegotiation: `IAC SB option payload IAC SE`. The payload is
    /// stored unescaped; embedded IAC bytes are doubled on encode.
    Subnegotiate(TelnetOption, Bytes),
}

impl fmt::Display for TelnetFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelnetFrame::Data(byte) => write!(f, "Data(0x{byte:02X})"),
            TelnetFrame::NoOperation => write!(f, "NoOperation"),
            TelnetFrame::DataMark => write!(f, "DataMark"),
            TelnetFrame::Break => write!(f, "Break"),
            TelnetFrame::InterruptProcess => write!(f, "InterruptProcess"),
            TelnetFrame::AbortOutput => write!(f, "AbortOutput"),
            TelnetFrame::AreYouThere => write!(f, "AreYouThere"),
            TelnetFrame::EraseCharacter => write!(f, "EraseCharacter"),
            TelnetFrame::EraseLine => write!(f, "EraseLine"),
            TelnetFrame::GoAhead => write!(f, "GoAhead"),
            TelnetFrame::Do(option) => write!(f, "Do({option})"),
            TelnetFrame::Dont(option) => write!(f, "Dont({option})"),
            TelnetFrame::Will(option) => write!(f, "Will({option})"),
            TelnetFrame::Wont(option) => write!(f, "Wont({option})"),
            TelnetFrame::Subnegotiate(option, payload) => {
                write!(f, "Subnegotiate({option}, {} bytes)", payload.len())
            }
        }
    }
}
