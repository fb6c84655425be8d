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

//! Telnet wire constants (RFC 854 and friends).

/// End of subnegotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// Data Mark: the data stream portion of a Synch.
pub const DM: u8 = 242;
/// NVT character BRK.
pub const BRK: u8 = 243;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Abort Output.
pub const AO: u8 = 245;
/// Are You There.
pub const AYT: u8 = 246;
/// Erase Character.
pub const EC: u8 = 247;
/// Erase Line.
pub const EL: u8 = 248;
/// Go Ahead.
pub const GA: u8 = 249;
/// Begin subnegotiation.
pub const SB: u8 = 250;
/// Sender wants to enable an option on its side.
pub const WILL: u8 = 251;
/// Sender refuses (or stops) performing an option.
pub const WONT: u8 = 252;
/// Sender asks the peer to enable an option.
pub const DO: u8 = 253;
/// Sender asks the peer to stop performing an option.
pub const DONT: u8 = 254;
/// Interpret As Command.
pub const IAC: u8 = 255;

/// Carriage return.
pub const CR: u8 = 13;
/// Line feed.
pub const LF: u8 = 10;
/// NUL, the netascii CR padding byte.
pub const NUL: u8 = 0;

/// Option codes from the IANA Telnet options registry.
pub mod option {
    /// Binary Transmission (RFC 856).
    pub const BINARY: u8 = 0;
    /// Echo (RFC 857).
    pub const ECHO: u8 = 1;
    /// Reconnection (NIC 50005).
    pub const RCP: u8 = 2;
    /// Suppress Go Ahead (RFC 858).
    pub const SGA: u8 = 3;
    /// Negotiate Approximate Message Size.
    pub const NAMS: u8 = 4;
    /// Status (RFC 859).
    pub const STATUS: u8 = 5;
    /// Timing Mark (RFC 860).
    pub const TM: u8 = 6;
    /// Remote Controlled Trans and Echo (RFC 726).
    pub const RCTE: u8 = 7;
    /// Output Line Width (NIC 50005).
    pub const NAOL: u8 = 8;
    /// Output Page Size (NIC 50005).
    pub const NAOP: u8 = 9;
    /// Output Carriage-Return Disposition (RFC 652).
    pub const NAOCRD: u8 = 10;
    /// Extended ASCII (RFC 698).
    pub const XASCII: u8 = 17;
    /// Logout (RFC 727).
    pub const LOGOUT: u8 = 18;
    /// Terminal Type (RFC 1091).
    pub const TTYPE: u8 = 24;
    /// End of Record (RFC 885).
    pub const EOR: u8 = 25;
    /// Window Size (RFC 1073).
    pub const NAWS: u8 = 31;
    /// Terminal Speed (RFC 1079).
    pub const TSPEED: u8 = 32;
    /// Remote Flow Control (RFC 1372).
    pub const LFLOW: u8 = 33;
    /// Linemode (RFC 1184).
    pub const LINEMODE: u8 = 34;
    /// X Display Location (RFC 1096).
    pub const XDISPLOC: u8 = 35;
    /// Environment Option (RFC 1408).
    pub const OLD_ENVIRONMENT: u8 = 36;
    /// Authentication Option (RFC 2941).
    pub const AUTHENTICATION: u8 = 37;
    /// Encryption Option (RFC 2946).
    pub const ENCRYPTION: u8 = 38;
    /// New Environment Option (RFC 1572).
    pub const NEW_ENVIRONMENT: u8 = 39;
    /// Extended-Options-List (RFC 861).
    pub const EXOPL: u8 = 255;
}

/// Subnegotiation commands used by the Terminal Type option (RFC 1091).
pub mod ttype {
    /// Here is my terminal type.
    pub const IS: u8 = 0;
    /// Send your terminal type.
    pub const SEND: u8 = 1;
}
