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

//! The 64-bit fixed-point NTP timestamp.

use std::fmt;

/// Unix milliseconds of 2036-02-07 06:28:16 UTC, the base of the second NTP
/// era (timestamp seconds with the most significant bit clear).
const MSB0_BASE_TIME_MILLIS: i64 = 2_085_978_496_000;

/// Unix milliseconds of 1900-01-01 00:00:00 UTC, the prime epoch (timestamp
/// seconds with the most significant bit set).
const MSB1_BASE_TIME_MILLIS: i64 = -2_208_988_800_000;

/// A 64-bit fixed-point NTP timestamp.
///
/// The upper 32 bits count seconds since the prime epoch, 1900-01-01 UTC;
/// the lower 32 bits are a binary fraction of a second (units of 2⁻³² s).
/// The all-zero value is the protocol's "unknown" sentinel.
///
/// Seconds wrap in 2036. Following the usual era convention, the most
/// significant seconds bit selects the base when converting to wall-clock
/// time: set means the 1900 era, clear means the 2036 era. Conversions are
/// two's-complement throughout so any unsigned 32-bit seconds value
/// round-trips.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NtpTimestamp(u64);

impl NtpTimestamp {
    /// The zero timestamp, used on the wire to mean "not set".
    pub const ZERO: NtpTimestamp = NtpTimestamp(0);

    /// Builds a timestamp from its raw 64-bit wire representation.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        NtpTimestamp(bits)
    }

    /// Builds a timestamp from a seconds count and a second fraction.
    #[must_use]
    pub const fn from_parts(seconds: u32, fraction: u32) -> Self {
        NtpTimestamp((seconds as u64) << 32 | fraction as u64)
    }

    /// Builds a timestamp from Unix milliseconds.
    #[must_use]
    pub fn from_unix_millis(millis: i64) -> Self {
        // Times before the era rollover use the 1900 base with the seconds
        // MSB set; later times use the 2036 base with the MSB clear.
        let use_prime_epoch = millis < MSB0_BASE_TIME_MILLIS;
        let base_millis = if use_prime_epoch {
            millis - MSB1_BASE_TIME_MILLIS
        } else {
            millis - MSB0_BASE_TIME_MILLIS
        };
        let mut seconds = (base_millis / 1000) as u64;
        let fraction = ((base_millis % 1000) as u64 * (1 << 32)) / 1000;
        if use_prime_epoch {
            seconds |= 0x8000_0000;
        }
        NtpTimestamp(seconds << 32 | fraction)
    }

    /// The raw 64-bit wire representation.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// The seconds field (upper 32 bits).
    #[must_use]
    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The fraction field (lower 32 bits, units of 2⁻³² s).
    #[must_use]
    pub const fn fraction(self) -> u32 {
        self.0 as u32
    }

    /// Whether this is the "not set" sentinel.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Converts to Unix milliseconds, rounding the fraction to the nearest
    /// millisecond and selecting the era base from the seconds MSB.
    #[must_use]
    pub fn as_unix_millis(self) -> i64 {
        let seconds = i64::from(self.seconds());
        // round-to-nearest: (fraction * 1000 + 2^31) / 2^32
        let fraction_millis = ((u64::from(self.fraction()) * 1000 + (1 << 31)) >> 32) as i64;
        let base = if self.seconds() & 0x8000_0000 == 0 {
            MSB0_BASE_TIME_MILLIS
        } else {
            MSB1_BASE_TIME_MILLIS
        };
        base + seconds * 1000 + fraction_millis
    }
}

impl fmt::Debug for NtpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NtpTimestamp({:08x}.{:08x})", self.seconds(), self.fraction())
    }
}

impl fmt::Display for NtpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}.{:08x}", self.seconds(), self.fraction())
    }
}

impl From<u64> for NtpTimestamp {
    fn from(bits: u64) -> Self {
        NtpTimestamp::from_bits(bits)
    }
}

impl From<NtpTimestamp> for u64 {
    fn from(timestamp: NtpTimestamp) -> Self {
        timestamp.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_the_sentinel() {
        assert!(NtpTimestamp::ZERO.is_zero());
        assert!(!NtpTimestamp::from_parts(1, 0).is_zero());
    }

    #[test]
    fn parts_round_trip() {
        let ts = NtpTimestamp::from_parts(0xDCC0_0000, 0x8000_0000);
        assert_eq!(ts.seconds(), 0xDCC0_0000);
        assert_eq!(ts.fraction(), 0x8000_0000);
    }

    #[test]
    fn unix_epoch_lands_in_the_prime_era() {
        let ts = NtpTimestamp::from_unix_millis(0);
        // 1970-01-01 is 2 208 988 800 s after the 1900 epoch, MSB set.
        assert_eq!(ts.seconds(), 2_208_988_800);
        assert_eq!(ts.fraction(), 0);
        assert_eq!(ts.as_unix_millis(), 0);
    }

    #[test]
    fn half_second_fraction_rounds_to_500_millis() {
        let ts = NtpTimestamp::from_parts(2_208_988_800, 0x8000_0000);
        assert_eq!(ts.as_unix_millis(), 500);
    }

    #[test]
    fn times_past_2036_round_trip() {
        // 2040-01-01 00:00:00 UTC
        let millis = 2_208_988_800_000;
        let ts = NtpTimestamp::from_unix_millis(millis);
        assert_eq!(ts.seconds() & 0x8000_0000, 0, "second era has MSB clear");
        assert_eq!(ts.as_unix_millis(), millis);
    }

    proptest! {
        #[test]
        fn wire_bits_round_trip(bits in any::<u64>()) {
            let ts = NtpTimestamp::from_bits(bits);
            prop_assert_eq!(ts.bits(), bits);
            prop_assert_eq!(NtpTimestamp::from_parts(ts.seconds(), ts.fraction()).bits(), bits);
        }

        #[test]
        fn millis_round_trip_within_both_eras(
            millis in MSB1_BASE_TIME_MILLIS..MSB0_BASE_TIME_MILLIS + 100_000_000_000i64
        ) {
            let ts = NtpTimestamp::from_unix_millis(millis);
            // conversion rounds the fraction; allow a millisecond of slack
            prop_assert!((ts.as_unix_millis() - millis).abs() <= 1);
        }
    }
}
