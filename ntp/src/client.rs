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

//! A one-shot SNTP query client.

use crate::error::{NtpError, Result};
use crate::packet::{NtpMessage, NTP_PACKET_SIZE};
use crate::time_info::TimeInfo;
use crate::timestamp::NtpTimestamp;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tracing::debug;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A simple SNTP client: one request, one reply, one [`TimeInfo`].
///
/// # Example
///
/// ```no_run
/// use retronet_ntp::SntpClient;
/// use std::time::Duration;
///
/// # async fn example() -> retronet_ntp::Result<()> {
/// let client = SntpClient::new().with_timeout(Duration::from_secs(3));
/// let info = client.query("129.6.15.28:123".parse().unwrap()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SntpClient {
    timeout: Duration,
}

impl Default for SntpClient {
    fn default() -> Self {
        SntpClient {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SntpClient {
    /// Creates a client with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        SntpClient::default()
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends a client-mode request to `server` and wraps the reply in a
    /// [`TimeInfo`] stamped with the local destination time.
    ///
    /// Details are not computed; call [`TimeInfo::compute_details`] when
    /// sub-millisecond construction cost no longer matters.
    pub async fn query(&self, server: SocketAddr) -> Result<TimeInfo> {
        let bind_addr: SocketAddr = if server.is_ipv4() {
            "0.0.0.0:0".parse().map_err(|_| {
                NtpError::InvalidArgument("cannot parse wildcard bind address".to_string())
            })?
        } else {
            "[::]:0".parse().map_err(|_| {
                NtpError::InvalidArgument("cannot parse wildcard bind address".to_string())
            })?
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;

        let request = NtpMessage::client_request(NtpTimestamp::from_unix_millis(now_millis()));
        socket.send(&request.to_bytes()).await?;
        debug!("sent NTPv3 request to {server}");

        let mut buf = [0u8; NTP_PACKET_SIZE + 20];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| NtpError::Timeout)??;
        let return_time = now_millis();
        debug!("received {len} byte reply from {server}");

        let message = NtpMessage::from_datagram(&buf[..len])?;
        let mut info = TimeInfo::new(message, return_time);
        info.set_address(server);
        Ok(info)
    }
}

fn now_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        // Clock set before 1970; fold the error into a negative offset.
        Err(err) => -(err.duration().as_millis() as i64),
    }
}
