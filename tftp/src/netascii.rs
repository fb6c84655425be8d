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

//! Net-ASCII line-ending translation.
//!
//! On the wire, netascii uses CRLF line endings and encodes a bare carriage
//! return as CR NUL. Locally we use LF. The decoder is stateful because a
//! CR may be the last byte of one 512-byte segment with its partner in the
//! next.

/// Translates local bytes to netascii: LF becomes CRLF and a bare CR
/// becomes CR NUL.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetasciiEncoder;

impl NetasciiEncoder {
    /// Creates an encoder.
    #[must_use]
    pub fn new() -> Self {
        NetasciiEncoder
    }

    /// Appends the translation of `input` to `out`.
    pub fn encode(&self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len());
        for &byte in input {
            match byte {
                b'\n' => out.extend_from_slice(b"\r\n"),
                b'\r' => out.extend_from_slice(b"\r\0"),
                other => out.push(other),
            }
        }
    }
}

/// Translates netascii bytes back to local form: CRLF becomes LF and
/// CR NUL becomes CR.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetasciiDecoder {
    pending_cr: bool,
}

impl NetasciiDecoder {
    /// Creates a decoder.
    #[must_use]
    pub fn new() -> Self {
        NetasciiDecoder::default()
    }

    /// Appends the translation of `input` to `out`, carrying a trailing CR
    /// across calls.
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len());
        for &byte in input {
            if self.pending_cr {
                self.pending_cr = false;
                match byte {
                    b'\n' => out.push(b'\n'),
                    0 => out.push(b'\r'),
                    b'\r' => {
                        // CR not part of a pair; emit it and keep waiting.
                        out.push(b'\r');
                        self.pending_cr = true;
                    }
                    other => {
                        out.push(b'\r');
                        out.push(other);
                    }
                }
            } else if byte == b'\r' {
                self.pending_cr = true;
            } else {
                out.push(byte);
            }
        }
    }

    /// Flushes a trailing CR at end of stream.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending_cr {
            self.pending_cr = false;
            out.push(b'\r');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        NetasciiEncoder::new().encode(input, &mut out);
        out
    }

    fn decode_whole(input: &[u8]) -> Vec<u8> {
        let mut decoder = NetasciiDecoder::new();
        let mut out = Vec::new();
        decoder.decode(input, &mut out);
        decoder.finish(&mut out);
        out
    }

    #[test]
    fn lf_becomes_crlf() {
        assert_eq!(encode(b"one\ntwo\n"), b"one\r\ntwo\r\n");
    }

    #[test]
    fn bare_cr_becomes_cr_nul() {
        assert_eq!(encode(b"a\rb"), b"a\r\0b");
    }

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(decode_whole(b"one\r\ntwo\r\n"), b"one\ntwo\n");
    }

    #[test]
    fn cr_nul_becomes_cr() {
        assert_eq!(decode_whole(b"a\r\0b"), b"a\rb");
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let input: Vec<u8> = b"line one\nline two\r\nmixed\rbare\n".to_vec();
        assert_eq!(decode_whole(&encode(&input)), input);
    }

    #[test]
    fn cr_split_across_chunks_is_carried() {
        let mut decoder = NetasciiDecoder::new();
        let mut out = Vec::new();
        decoder.decode(b"one\r", &mut out);
        assert_eq!(out, b"one");
        decoder.decode(b"\ntwo", &mut out);
        decoder.finish(&mut out);
        assert_eq!(out, b"one\ntwo");
    }

    #[test]
    fn trailing_cr_is_flushed_at_end_of_stream() {
        assert_eq!(decode_whole(b"abc\r"), b"abc\r");
    }

    #[test]
    fn run_of_crs_decodes() {
        assert_eq!(decode_whole(b"\r\r\n"), b"\r\n");
    }
}
