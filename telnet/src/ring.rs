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

//! The bounded byte ring coupling the reader task to the caller.
//!
//! Exactly two parties touch the ring: the reader task appends decoded
//! data bytes, the caller drains them. One mutex guards the ring storage,
//! the count, the closed flag and the stored I/O error; two notifiers wake
//! whichever side is waiting. Close wakes both sides, and readers drain
//! whatever is buffered before seeing end of file.

use std::io;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Ring capacity in bytes.
pub const RING_CAPACITY: usize = 2048;

struct RingState {
    buffer: Box<[u8; RING_CAPACITY]>,
    /// Read position.
    head: usize,
    /// Bytes currently buffered.
    count: usize,
    closed: bool,
    error: Option<io::Error>,
}

impl RingState {
    fn write_pos(&self) -> usize {
        (self.head + self.count) % RING_CAPACITY
    }
}

/// A bounded FIFO byte queue for one producer and one consumer.
pub struct RingBuffer {
    state: Mutex<RingState>,
    readable: Notify,
    writable: Notify,
}

impl RingBuffer {
    /// Creates an empty ring.
    #[must_use]
    pub fn new() -> Self {
        RingBuffer {
            state: Mutex::new(RingState {
                buffer: Box::new([0u8; RING_CAPACITY]),
                head: 0,
                count: 0,
                closed: false,
                error: None,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Bytes available to read right now. Never performs I/O.
    #[must_use]
    pub fn available(&self) -> usize {
        self.state.lock().expect("ring mutex poisoned").count
    }

    /// Appends all of `bytes`, waiting whenever the ring is full.
    ///
    /// Fails with [`io::ErrorKind::BrokenPipe`] once the ring is closed;
    /// bytes accepted before the close remain readable.
    pub async fn write_all(&self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            // Arm the notification before inspecting state so a wakeup
            // between unlock and await cannot be lost.
            let notified = self.writable.notified();
            {
                let mut state = self.state.lock().expect("ring mutex poisoned");
                if state.closed {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "ring buffer closed",
                    ));
                }
                let free = RING_CAPACITY - state.count;
                if free > 0 {
                    let take = free.min(bytes.len());
                    for &byte in &bytes[..take] {
                        let pos = state.write_pos();
                        state.buffer[pos] = byte;
                        state.count += 1;
                    }
                    bytes = &bytes[take..];
                    self.readable.notify_one();
                    continue;
                }
            }
            notified.await;
        }
        Ok(())
    }

    /// Reads up to `out.len()` bytes, waiting while the ring is empty.
    ///
    /// After a close, buffered bytes are drained first; then a stored I/O
    /// error is surfaced once, and end of file (`Ok(0)`) thereafter.
    pub async fn read(&self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            let notified = self.readable.notified();
            {
                let mut state = self.state.lock().expect("ring mutex poisoned");
                if state.count > 0 {
                    let take = state.count.min(out.len());
                    for slot in out.iter_mut().take(take) {
                        *slot = state.buffer[state.head];
                        state.head = (state.head + 1) % RING_CAPACITY;
                        state.count -= 1;
                    }
                    self.writable.notify_one();
                    return Ok(take);
                }
                if state.closed {
                    return match state.error.take() {
                        Some(error) => Err(error),
                        None => Ok(0),
                    };
                }
            }
            notified.await;
        }
    }

    /// Stores an I/O error to surface to the reader after the buffer
    /// drains. Implies a close.
    pub fn fail(&self, error: io::Error) {
        {
            let mut state = self.state.lock().expect("ring mutex poisoned");
            state.error.get_or_insert(error);
            state.closed = true;
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Closes the ring, waking both sides. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state.lock().expect("ring mutex poisoned");
            state.closed = true;
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Whether the ring has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("ring mutex poisoned").closed
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        RingBuffer::new()
    }
}
