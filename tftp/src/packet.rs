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

//! TFTP packet encoding and decoding (RFC 1350).
//!
//! ```text
//! RRQ/WRQ:  | opcode(2) | filename | 0 | mode | 0 |
//! DATA:     | opcode(2) | block(2) | payload (0..=512) |
//! ACK:      | opcode(2) | block(2) |
//! ERROR:    | opcode(2) | code(2)  | message | 0 |
//! ```

use crate::error::TftpError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// The well-known TFTP UDP port.
pub const TFTP_PORT: u16 = 69;

/// Maximum payload of a DATA packet. A shorter payload marks the final
/// block of a transfer.
pub const SEGMENT_SIZE: usize = 512;

mod opcode {
    pub const RRQ: u16 = 1;
    pub const WRQ: u16 = 2;
    pub const DATA: u16 = 3;
    pub const ACK: u16 = 4;
    pub const ERROR: u16 = 5;
}

/// The transfer mode named in a read or write request.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TransferMode {
    /// Text mode with CRLF line endings on the wire.
    Netascii,
    /// Raw binary bytes.
    #[default]
    Octet,
    /// Historical mail mode; accepted on the wire, otherwise untreated.
    Mail,
}

impl TransferMode {
    /// The mode name as it appears in request packets.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransferMode::Netascii => "netascii",
            TransferMode::Octet => "octet",
            TransferMode::Mail => "mail",
        }
    }

    /// Parses a mode name, case-insensitively per RFC 1350.
    pub fn from_name(name: &str) -> Result<Self, TftpError> {
        match name.to_ascii_lowercase().as_str() {
            "netascii" => Ok(TransferMode::Netascii),
            "octet" => Ok(TransferMode::Octet),
            "mail" => Ok(TransferMode::Mail),
            other => Err(TftpError::Protocol(format!("unknown transfer mode {other:?}"))),
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFC 1350 error codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    /// 0 — Not defined, see error message.
    NotDefined,
    /// 1 — File not found.
    FileNotFound,
    /// 2 — Access violation.
    AccessViolation,
    /// 3 — Disk full or allocation exceeded.
    DiskFull,
    /// 4 — Illegal TFTP operation.
    IllegalOperation,
    /// 5 — Unknown transfer ID.
    UnknownTid,
    /// 6 — File already exists.
    FileExists,
    /// 7 — No such user.
    NoSuchUser,
}

impl ErrorCode {
    /// The numeric wire value.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            ErrorCode::NotDefined => 0,
            ErrorCode::FileNotFound => 1,
            ErrorCode::AccessViolation => 2,
            ErrorCode::DiskFull => 3,
            ErrorCode::IllegalOperation => 4,
            ErrorCode::UnknownTid => 5,
            ErrorCode::FileExists => 6,
            ErrorCode::NoSuchUser => 7,
        }
    }

    /// Maps a wire value to a code; values outside 0..=7 collapse to
    /// [`ErrorCode::NotDefined`].
    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => ErrorCode::FileNotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTid,
            6 => ErrorCode::FileExists,
            7 => ErrorCode::NoSuchUser,
            _ => ErrorCode::NotDefined,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u16())
    }
}

/// A decoded TFTP packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TftpPacket {
    /// Read request: the client asks the server to send `filename`.
    ReadRequest {
        /// File the client wants to read.
        filename: String,
        /// Requested transfer mode.
        mode: TransferMode,
    },
    /// Write request: the client asks to store `filename` on the server.
    WriteRequest {
        /// File the client wants to create.
        filename: String,
        /// Requested transfer mode.
        mode: TransferMode,
    },
    /// One block of file data. A payload shorter than [`SEGMENT_SIZE`]
    /// signals the end of the transfer.
    Data {
        /// Block number, wrapping modulo 65536.
        block: u16,
        /// Up to 512 bytes of payload.
        payload: Bytes,
    },
    /// Acknowledgement of a data block (or of a write request, block 0).
    Ack {
        /// Block number being acknowledged.
        block: u16,
    },
    /// An error report; terminates the transfer.
    Error {
        /// RFC 1350 error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

impl TftpPacket {
    /// Encodes the packet into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            TftpPacket::ReadRequest { filename, mode } => {
                dst.reserve(2 + filename.len() + 1 + mode.as_str().len() + 1);
                dst.put_u16(opcode::RRQ);
                dst.put_slice(filename.as_bytes());
                dst.put_u8(0);
                dst.put_slice(mode.as_str().as_bytes());
                dst.put_u8(0);
            }
            TftpPacket::WriteRequest { filename, mode } => {
                dst.reserve(2 + filename.len() + 1 + mode.as_str().len() + 1);
                dst.put_u16(opcode::WRQ);
                dst.put_slice(filename.as_bytes());
                dst.put_u8(0);
                dst.put_slice(mode.as_str().as_bytes());
                dst.put_u8(0);
            }
            TftpPacket::Data { block, payload } => {
                dst.reserve(4 + payload.len());
                dst.put_u16(opcode::DATA);
                dst.put_u16(*block);
                dst.put_slice(payload);
            }
            TftpPacket::Ack { block } => {
                dst.reserve(4);
                dst.put_u16(opcode::ACK);
                dst.put_u16(*block);
            }
            TftpPacket::Error { code, message } => {
                dst.reserve(4 + message.len() + 1);
                dst.put_u16(opcode::ERROR);
                dst.put_u16(code.to_u16());
                dst.put_slice(message.as_bytes());
                dst.put_u8(0);
            }
        }
    }

    /// Encodes the packet into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.freeze()
    }

    /// Decodes a received datagram.
    pub fn decode(datagram: &[u8]) -> Result<Self, TftpError> {
        let mut buf = datagram;
        if buf.remaining() < 2 {
            return Err(TftpError::Protocol(format!(
                "datagram too short for an opcode: {} bytes",
                datagram.len()
            )));
        }
        match buf.get_u16() {
            opcode::RRQ => {
                let (filename, mode) = decode_request(buf)?;
                Ok(TftpPacket::ReadRequest { filename, mode })
            }
            opcode::WRQ => {
                let (filename, mode) = decode_request(buf)?;
                Ok(TftpPacket::WriteRequest { filename, mode })
            }
            opcode::DATA => {
                if buf.remaining() < 2 {
                    return Err(TftpError::Protocol("DATA packet missing block number".into()));
                }
                let block = buf.get_u16();
                if buf.remaining() > SEGMENT_SIZE {
                    return Err(TftpError::Protocol(format!(
                        "DATA payload of {} bytes exceeds the {SEGMENT_SIZE} byte segment",
                        buf.remaining()
                    )));
                }
                Ok(TftpPacket::Data {
                    block,
                    payload: Bytes::copy_from_slice(buf),
                })
            }
            opcode::ACK => {
                if buf.remaining() < 2 {
                    return Err(TftpError::Protocol("ACK packet missing block number".into()));
                }
                Ok(TftpPacket::Ack {
                    block: buf.get_u16(),
                })
            }
            opcode::ERROR => {
                if buf.remaining() < 2 {
                    return Err(TftpError::Protocol("ERROR packet missing error code".into()));
                }
                let code = ErrorCode::from_u16(buf.get_u16());
                let message = read_cstring(&mut buf)?;
                Ok(TftpPacket::Error { code, message })
            }
            other => Err(TftpError::Protocol(format!("unknown opcode {other}"))),
        }
    }
}

/// Decodes the `filename \0 mode \0` tail of a request packet.
fn decode_request(mut buf: &[u8]) -> Result<(String, TransferMode), TftpError> {
    let filename = read_cstring(&mut buf)?;
    if filename.is_empty() {
        return Err(TftpError::Protocol("request with empty file name".into()));
    }
    let mode = TransferMode::from_name(&read_cstring(&mut buf)?)?;
    Ok((filename, mode))
}

/// Reads a NUL-terminated ASCII string, advancing `buf` past the NUL.
fn read_cstring(buf: &mut &[u8]) -> Result<String, TftpError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| TftpError::Protocol("unterminated string field".into()))?;
    let value = String::from_utf8_lossy(&buf[..end]).into_owned();
    *buf = &buf[end + 1..];
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(packet: &TftpPacket) -> TftpPacket {
        TftpPacket::decode(&packet.to_bytes()).expect("round trip decodes")
    }

    // ============================================================================
    // Requests
    // ============================================================================

    #[test]
    fn read_request_wire_format() {
        let packet = TftpPacket::ReadRequest {
            filename: "boot.img".to_string(),
            mode: TransferMode::Octet,
        };
        let bytes = packet.to_bytes();
        assert_eq!(&bytes[..2], &[0, 1]);
        assert_eq!(&bytes[2..10], b"boot.img");
        assert_eq!(bytes[10], 0);
        assert_eq!(&bytes[11..16], b"octet");
        assert_eq!(bytes[16], 0);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn write_request_round_trips() {
        let packet = TftpPacket::WriteRequest {
            filename: "upload/notes.txt".to_string(),
            mode: TransferMode::Netascii,
        };
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn mode_names_are_case_insensitive() {
        assert_eq!(
            TransferMode::from_name("NetAscii").expect("parses"),
            TransferMode::Netascii
        );
        assert_eq!(
            TransferMode::from_name("OCTET").expect("parses"),
            TransferMode::Octet
        );
        assert!(TransferMode::from_name("binary").is_err());
    }

    // ============================================================================
    // Data / Ack / Error
    // ============================================================================

    #[test]
    fn data_packet_round_trips() {
        let packet = TftpPacket::Data {
            block: 0xBEEF,
            payload: Bytes::from(vec![7u8; SEGMENT_SIZE]),
        };
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn empty_data_packet_is_valid() {
        let packet = TftpPacket::Data {
            block: 1,
            payload: Bytes::new(),
        };
        assert_eq!(packet.to_bytes().len(), 4);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn oversized_data_payload_is_rejected() {
        let mut raw = BytesMut::new();
        raw.put_u16(3);
        raw.put_u16(1);
        raw.put_slice(&[0u8; SEGMENT_SIZE + 1]);
        assert!(matches!(
            TftpPacket::decode(&raw),
            Err(TftpError::Protocol(_))
        ));
    }

    #[test]
    fn ack_wire_format() {
        let packet = TftpPacket::Ack { block: 65535 };
        assert_eq!(&packet.to_bytes()[..], &[0, 4, 0xFF, 0xFF]);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn error_packet_round_trips() {
        let packet = TftpPacket::Error {
            code: ErrorCode::AccessViolation,
            message: "Access violation".to_string(),
        };
        let bytes = packet.to_bytes();
        assert_eq!(&bytes[..4], &[0, 5, 0, 2]);
        assert_eq!(bytes[bytes.len() - 1], 0);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn out_of_range_error_code_collapses_to_not_defined() {
        assert_eq!(ErrorCode::from_u16(42), ErrorCode::NotDefined);
    }

    // ============================================================================
    // Malformed Input
    // ============================================================================

    #[test]
    fn truncated_datagrams_are_rejected() {
        assert!(TftpPacket::decode(&[]).is_err());
        assert!(TftpPacket::decode(&[0]).is_err());
        assert!(TftpPacket::decode(&[0, 4]).is_err()); // ACK without block
        assert!(TftpPacket::decode(&[0, 1, b'f']).is_err()); // unterminated RRQ
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(matches!(
            TftpPacket::decode(&[0, 9, 0, 0]),
            Err(TftpError::Protocol(_))
        ));
    }

    #[test]
    fn request_with_empty_filename_is_rejected() {
        assert!(TftpPacket::decode(&[0, 1, 0, b'o', b'c', b't', b'e', b't', 0]).is_err());
    }
}
