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

//! Round-trip delay and clock offset computation.

use crate::packet::NtpMessage;
use std::net::SocketAddr;

/// A received NTP message together with the local destination time, and the
/// timing details derived from the two.
///
/// With the four message times
///
/// - T1 — originate (request left the client),
/// - T2 — receive (request reached the server),
/// - T3 — transmit (reply left the server),
/// - T4 — destination (reply reached the client),
///
/// the round-trip delay is `(T4 − T1) − (T3 − T2)` and the clock offset is
/// `((T2 − T1) + (T3 − T4)) / 2`. Zero timestamps mark fields the server
/// never filled in; every degraded input is recorded in an ordered comment
/// log rather than raised as an error, and the affected result is simply
/// absent.
#[derive(Clone, Debug)]
pub struct TimeInfo {
    message: NtpMessage,
    address: Option<SocketAddr>,
    return_time_millis: i64,
    delay_millis: Option<i64>,
    offset_millis: Option<i64>,
    comments: Vec<String>,
    details_computed: bool,
}

impl TimeInfo {
    /// Wraps a received message with the destination time T4 in Unix
    /// milliseconds. Details are not computed until
    /// [`compute_details`](Self::compute_details) is called.
    #[must_use]
    pub fn new(message: NtpMessage, return_time_millis: i64) -> Self {
        TimeInfo {
            message,
            address: None,
            return_time_millis,
            delay_millis: None,
            offset_millis: None,
            comments: Vec::new(),
            details_computed: false,
        }
    }

    /// Wraps a received message and computes details immediately.
    #[must_use]
    pub fn with_details(message: NtpMessage, return_time_millis: i64) -> Self {
        let mut info = Self::new(message, return_time_millis);
        info.compute_details();
        info
    }

    pub(crate) fn set_address(&mut self, address: SocketAddr) {
        self.address = Some(address);
    }

    /// Computes delay and offset from the four message times.
    ///
    /// Idempotent: the second and later calls are no-ops, so the comment
    /// log never accumulates duplicates.
    pub fn compute_details(&mut self) {
        if self.details_computed {
            return;
        }
        self.details_computed = true;

        let orig_ntp = self.message.originate_timestamp;
        let rcv_ntp = self.message.receive_timestamp;
        let xmit_ntp = self.message.transmit_timestamp;
        let orig_time = orig_ntp.as_unix_millis();
        let rcv_time = rcv_ntp.as_unix_millis();
        let xmit_time = xmit_ntp.as_unix_millis();
        let return_time = self.return_time_millis;

        if orig_ntp.is_zero() {
            // Without T1 no round trip can be measured. A non-zero T3 still
            // allows a broadcast-style offset estimate.
            if xmit_ntp.is_zero() {
                self.comments
                    .push("Error: zero orig time -- cannot compute delay/offset".to_string());
            } else {
                self.offset_millis = Some(xmit_time - return_time);
                self.comments
                    .push("Error: zero orig time -- cannot compute delay".to_string());
            }
            return;
        }

        if rcv_ntp.is_zero() || xmit_ntp.is_zero() {
            self.comments
                .push("Warning: zero rcvNtpTime or xmitNtpTime".to_string());
            if orig_time > return_time {
                self.comments
                    .push("Error: OrigTime > DestRcvTime".to_string());
            } else {
                self.delay_millis = Some(return_time - orig_time);
            }
            if !rcv_ntp.is_zero() {
                self.offset_millis = Some(rcv_time - orig_time);
            } else if !xmit_ntp.is_zero() {
                self.offset_millis = Some(xmit_time - return_time);
            }
            return;
        }

        let mut delay = return_time - orig_time;
        if xmit_time < rcv_time {
            self.comments.push("Error: xmitTime < rcvTime".to_string());
        } else {
            // Subtract the server's processing time from the round trip.
            let delta = xmit_time - rcv_time;
            if delta <= delay {
                delay -= delta;
            } else if delta - delay == 1 {
                // The local clock saw no tick change but the server clock
                // did; treat the 1 ms discrepancy as quantization.
                if delay != 0 {
                    self.comments.push(
                        "Info: processing time > total network time by 1 ms -> assume zero delay"
                            .to_string(),
                    );
                    delay = 0;
                }
            } else {
                self.comments
                    .push("Warning: processing time > total network time".to_string());
            }
        }
        self.delay_millis = Some(delay);

        if orig_time > return_time {
            self.comments
                .push("Error: OrigTime > DestRcvTime".to_string());
        }
        self.offset_millis = Some((rcv_time - orig_time + xmit_time - return_time) / 2);
    }

    /// Appends a comment to the processing log.
    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    /// The received NTP message.
    #[must_use]
    pub fn message(&self) -> &NtpMessage {
        &self.message
    }

    /// The server address the reply came from, when known.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Round-trip network delay in milliseconds, absent when it could not
    /// be computed.
    #[must_use]
    pub fn delay(&self) -> Option<i64> {
        self.delay_millis
    }

    /// Clock offset in milliseconds needed to adjust the local clock to
    /// match the server's, absent when it could not be computed.
    #[must_use]
    pub fn offset(&self) -> Option<i64> {
        self.offset_millis
    }

    /// The local destination time T4 in Unix milliseconds.
    #[must_use]
    pub fn return_time(&self) -> i64 {
        self.return_time_millis
    }

    /// Warnings and errors recorded while computing details, in order.
    #[must_use]
    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::NtpTimestamp;

    fn message(t1: i64, t2: i64, t3: i64) -> NtpMessage {
        let stamp = |millis: i64| {
            if millis == 0 {
                NtpTimestamp::ZERO
            } else {
                NtpTimestamp::from_unix_millis(millis)
            }
        };
        NtpMessage {
            originate_timestamp: stamp(t1),
            receive_timestamp: stamp(t2),
            transmit_timestamp: stamp(t3),
            ..NtpMessage::default()
        }
    }

    // ============================================================================
    // Normal Computation
    // ============================================================================

    #[test]
    fn normal_delay_and_offset() {
        // T1=1000 T2=1500 T3=1600 T4=1100
        let mut info = TimeInfo::new(message(1000, 1500, 1600), 1100);
        info.compute_details();
        assert_eq!(info.delay(), Some(0)); // (1100-1000) - (1600-1500)
        assert_eq!(info.offset(), Some(500)); // ((1500-1000)+(1600-1100))/2
        assert!(info.comments().is_empty());
    }

    #[test]
    fn symmetric_times_give_zero_offset_and_delay() {
        let mut info = TimeInfo::new(message(2000, 2500, 2500), 2000);
        info.compute_details();
        assert_eq!(info.offset(), Some(500));

        let mut info = TimeInfo::new(message(2000, 2000, 2000), 2000);
        info.compute_details();
        assert_eq!(info.offset(), Some(0));
        assert_eq!(info.delay(), Some(0));
    }

    #[test]
    fn compute_details_is_idempotent() {
        let mut info = TimeInfo::new(message(0, 0, 2000), 2100);
        info.compute_details();
        info.compute_details();
        info.compute_details();
        assert_eq!(info.comments().len(), 1);
        assert_eq!(info.offset(), Some(-100));
    }

    // ============================================================================
    // Degraded Inputs
    // ============================================================================

    #[test]
    fn zero_origin_with_transmit_gives_broadcast_offset() {
        // T1=0, T3=2000, T4=2100
        let mut info = TimeInfo::new(message(0, 0, 2000), 2100);
        info.compute_details();
        assert_eq!(info.offset(), Some(-100));
        assert_eq!(info.delay(), None);
        assert_eq!(info.comments().len(), 1);
    }

    #[test]
    fn all_zero_times_give_nothing() {
        let mut info = TimeInfo::new(message(0, 0, 0), 2100);
        info.compute_details();
        assert_eq!(info.offset(), None);
        assert_eq!(info.delay(), None);
        assert_eq!(
            info.comments(),
            &["Error: zero orig time -- cannot compute delay/offset".to_string()]
        );
    }

    #[test]
    fn zero_transmit_uses_receive_for_offset() {
        let mut info = TimeInfo::new(message(1000, 1400, 0), 1100);
        info.compute_details();
        assert_eq!(info.delay(), Some(100));
        assert_eq!(info.offset(), Some(400)); // T2 - T1
        assert!(info.comments()[0].contains("zero rcvNtpTime or xmitNtpTime"));
    }

    #[test]
    fn zero_receive_uses_transmit_for_offset() {
        let mut info = TimeInfo::new(message(1000, 0, 1400), 1100);
        info.compute_details();
        assert_eq!(info.delay(), Some(100));
        assert_eq!(info.offset(), Some(300)); // T3 - T4
    }

    #[test]
    fn origin_after_destination_suppresses_delay() {
        let mut info = TimeInfo::new(message(1200, 1400, 0), 1100);
        info.compute_details();
        assert_eq!(info.delay(), None);
        assert!(info
            .comments()
            .iter()
            .any(|c| c.contains("OrigTime > DestRcvTime")));
    }

    #[test]
    fn processing_time_exceeding_network_time_is_flagged() {
        // round trip 100 ms, server processing 200 ms
        let mut info = TimeInfo::new(message(1000, 1400, 1600), 1100);
        info.compute_details();
        assert_eq!(info.delay(), Some(100)); // kept as computed
        assert!(info
            .comments()
            .iter()
            .any(|c| c.contains("processing time > total network time")));
    }

    #[test]
    fn one_millisecond_quantization_clamps_delay_to_zero() {
        // round trip 1 ms, server processing 2 ms
        let mut info = TimeInfo::new(message(1000, 1400, 1402), 1001);
        info.compute_details();
        assert_eq!(info.delay(), Some(0));
        assert!(info.comments().iter().any(|c| c.contains("assume zero delay")));
    }

    #[test]
    fn server_clock_running_backwards_is_flagged() {
        let mut info = TimeInfo::new(message(1000, 1600, 1500), 1100);
        info.compute_details();
        assert!(info.comments().iter().any(|c| c.contains("xmitTime < rcvTime")));
        assert_eq!(info.delay(), Some(100)); // processing time not subtracted
    }
}
