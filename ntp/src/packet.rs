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

//! The fixed 48-byte NTPv3 message header.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |LI | VN  |Mode |    Stratum    |     Poll      |   Precision   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          Root Delay                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Root Dispersion                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Reference Identifier                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Reference Timestamp (64)                    |
//! |                   Originate Timestamp (64)                    |
//! |                    Receive Timestamp (64)                     |
//! |                    Transmit Timestamp (64)                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All multi-byte fields are big-endian.

use crate::error::NtpError;
use crate::timestamp::NtpTimestamp;
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io;

/// The well-known NTP UDP port.
pub const NTP_PORT: u16 = 123;

/// Size of an NTPv3 message with no authenticator, in bytes.
pub const NTP_PACKET_SIZE: usize = 48;

/// Protocol version carried in outgoing packets.
pub const NTP_VERSION: u8 = 3;

/// The leap indicator, warning of an impending leap second.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum LeapIndicator {
    /// No warning.
    #[default]
    NoWarning,
    /// Last minute of the day has 61 seconds.
    LastMinute61,
    /// Last minute of the day has 59 seconds.
    LastMinute59,
    /// Clock unsynchronized.
    Alarm,
}

impl LeapIndicator {
    const fn to_bits(self) -> u8 {
        match self {
            LeapIndicator::NoWarning => 0,
            LeapIndicator::LastMinute61 => 1,
            LeapIndicator::LastMinute59 => 2,
            LeapIndicator::Alarm => 3,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::LastMinute61,
            2 => LeapIndicator::LastMinute59,
            _ => LeapIndicator::Alarm,
        }
    }
}

/// Protocol association mode.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Reserved.
    #[default]
    Reserved,
    /// Symmetric active.
    SymmetricActive,
    /// Symmetric passive.
    SymmetricPassive,
    /// Client request.
    Client,
    /// Server reply.
    Server,
    /// Broadcast.
    Broadcast,
    /// NTP control message.
    ControlMessage,
    /// Reserved for private use.
    Private,
}

impl Mode {
    const fn to_bits(self) -> u8 {
        match self {
            Mode::Reserved => 0,
            Mode::SymmetricActive => 1,
            Mode::SymmetricPassive => 2,
            Mode::Client => 3,
            Mode::Server => 4,
            Mode::Broadcast => 5,
            Mode::ControlMessage => 6,
            Mode::Private => 7,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::ControlMessage,
            7 => Mode::Private,
            _ => Mode::Reserved,
        }
    }
}

/// A decoded NTPv3 message.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NtpMessage {
    /// Leap second warning.
    pub leap: LeapIndicator,
    /// Protocol version (3 for NTPv3).
    pub version: u8,
    /// Association mode.
    pub mode: Mode,
    /// Stratum level of the server clock (0 = unspecified, 1 = primary).
    pub stratum: u8,
    /// Poll interval as a signed log₂ seconds exponent.
    pub poll: i8,
    /// Clock precision as a signed log₂ seconds exponent.
    pub precision: i8,
    /// Total round-trip delay to the reference clock, signed 16.16 seconds.
    pub root_delay: i32,
    /// Maximum error relative to the reference clock, unsigned 16.16 seconds.
    pub root_dispersion: u32,
    /// Reference clock identifier.
    pub reference_id: u32,
    /// Time the system clock was last set or corrected.
    pub reference_timestamp: NtpTimestamp,
    /// T1 — time the request departed the client.
    pub originate_timestamp: NtpTimestamp,
    /// T2 — time the request arrived at the server.
    pub receive_timestamp: NtpTimestamp,
    /// T3 — time the reply departed the server.
    pub transmit_timestamp: NtpTimestamp,
}

impl NtpMessage {
    /// Builds a version 3 client request carrying the given transmit time.
    #[must_use]
    pub fn client_request(transmit: NtpTimestamp) -> Self {
        NtpMessage {
            version: NTP_VERSION,
            mode: Mode::Client,
            transmit_timestamp: transmit,
            ..NtpMessage::default()
        }
    }

    /// Writes the 48-byte header in network byte order.
    pub fn write_to<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        let flags =
            self.leap.to_bits() << 6 | (self.version & 0x7) << 3 | self.mode.to_bits();
        writer.write_u8(flags)?;
        writer.write_u8(self.stratum)?;
        writer.write_i8(self.poll)?;
        writer.write_i8(self.precision)?;
        writer.write_i32::<BE>(self.root_delay)?;
        writer.write_u32::<BE>(self.root_dispersion)?;
        writer.write_u32::<BE>(self.reference_id)?;
        writer.write_u64::<BE>(self.reference_timestamp.bits())?;
        writer.write_u64::<BE>(self.originate_timestamp.bits())?;
        writer.write_u64::<BE>(self.receive_timestamp.bits())?;
        writer.write_u64::<BE>(self.transmit_timestamp.bits())?;
        Ok(())
    }

    /// Reads a 48-byte header in network byte order.
    pub fn read_from<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let flags = reader.read_u8()?;
        Ok(NtpMessage {
            leap: LeapIndicator::from_bits(flags >> 6),
            version: flags >> 3 & 0x7,
            mode: Mode::from_bits(flags),
            stratum: reader.read_u8()?,
            poll: reader.read_i8()?,
            precision: reader.read_i8()?,
            root_delay: reader.read_i32::<BE>()?,
            root_dispersion: reader.read_u32::<BE>()?,
            reference_id: reader.read_u32::<BE>()?,
            reference_timestamp: NtpTimestamp::from_bits(reader.read_u64::<BE>()?),
            originate_timestamp: NtpTimestamp::from_bits(reader.read_u64::<BE>()?),
            receive_timestamp: NtpTimestamp::from_bits(reader.read_u64::<BE>()?),
            transmit_timestamp: NtpTimestamp::from_bits(reader.read_u64::<BE>()?),
        })
    }

    /// Encodes the message into a fresh 48-byte buffer.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; NTP_PACKET_SIZE] {
        let mut buf = [0u8; NTP_PACKET_SIZE];
        self.write_to(&mut buf[..])
            .expect("writing a fixed-size header to a fixed-size buffer cannot fail");
        buf
    }

    /// Decodes a received datagram.
    ///
    /// Datagrams shorter than [`NTP_PACKET_SIZE`] are a protocol error;
    /// trailing authenticator bytes are ignored.
    pub fn from_datagram(datagram: &[u8]) -> Result<Self, NtpError> {
        if datagram.len() < NTP_PACKET_SIZE {
            return Err(NtpError::Protocol(format!(
                "datagram too short for an NTP header: {} bytes",
                datagram.len()
            )));
        }
        Ok(Self::read_from(datagram)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn client_request_sets_version_and_mode() {
        let request = NtpMessage::client_request(NtpTimestamp::from_parts(1, 2));
        let bytes = request.to_bytes();
        // LI=0, VN=3, Mode=3 -> 0b00_011_011
        assert_eq!(bytes[0], 0x1B);
        assert_eq!(bytes.len(), NTP_PACKET_SIZE);
    }

    #[test]
    fn header_round_trips() {
        let message = NtpMessage {
            leap: LeapIndicator::LastMinute59,
            version: 3,
            mode: Mode::Server,
            stratum: 2,
            poll: 6,
            precision: -20,
            root_delay: -0x0001_8000, // -1.5 s
            root_dispersion: 0x0000_4000,
            reference_id: u32::from_be_bytes(*b"GPS\0"),
            reference_timestamp: NtpTimestamp::from_parts(0xDCC0_0000, 0),
            originate_timestamp: NtpTimestamp::from_parts(0xDCC0_0001, 0x8000_0000),
            receive_timestamp: NtpTimestamp::from_parts(0xDCC0_0002, 0x4000_0000),
            transmit_timestamp: NtpTimestamp::from_parts(0xDCC0_0003, 0x2000_0000),
        };
        let decoded = NtpMessage::from_datagram(&message.to_bytes()).expect("decodes");
        assert_eq!(decoded, message);
    }

    #[test]
    fn short_datagram_is_a_protocol_error() {
        let err = NtpMessage::from_datagram(&[0u8; 20]).expect_err("short datagram rejected");
        assert!(matches!(err, NtpError::Protocol(_)));
    }

    #[test]
    fn trailing_authenticator_bytes_are_ignored() {
        let message = NtpMessage::client_request(NtpTimestamp::ZERO);
        let mut datagram = message.to_bytes().to_vec();
        datagram.extend_from_slice(&[0u8; 20]); // key id + digest
        assert!(NtpMessage::from_datagram(&datagram).is_ok());
    }

    proptest! {
        #[test]
        fn timestamps_survive_the_wire(t1 in any::<u64>(), t2 in any::<u64>(), t3 in any::<u64>()) {
            let message = NtpMessage {
                originate_timestamp: NtpTimestamp::from_bits(t1),
                receive_timestamp: NtpTimestamp::from_bits(t2),
                transmit_timestamp: NtpTimestamp::from_bits(t3),
                ..NtpMessage::client_request(NtpTimestamp::ZERO)
            };
            let decoded = NtpMessage::from_datagram(&message.to_bytes()).unwrap();
            prop_assert_eq!(decoded.originate_timestamp.bits(), t1);
            prop_assert_eq!(decoded.receive_timestamp.bits(), t2);
            prop_assert_eq!(decoded.transmit_timestamp.bits(), t3);
        }
    }
}
