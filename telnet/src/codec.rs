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

//! The inline Telnet byte state machine as a tokio codec.

use crate::consts;
use crate::error::TelnetError;
use crate::event::TelnetEvent;
use crate::frame::TelnetFrame;
use crate::handlers::HandlerRegistry;
use crate::options::{OptionTable, ReplyVerb, TelnetOption, TelnetSide, Transition};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Subnegotiation payloads beyond this many bytes are truncated; the
/// overflow is dropped without aborting the sequence.
pub const SUBNEGOTIATION_BUFFER_MAX: usize = 512;

/// A stateful Telnet codec.
///
/// The decoder consumes the inbound byte stream one byte at a time,
/// separating application data from IAC command, negotiation and
/// subnegotiation sequences. Negotiation runs through the RFC 1143
/// Q-method with per-option policy supplied by a [`HandlerRegistry`];
/// replies the state machine generates are queued on the codec and must be
/// drained with [`TelnetCodec::take_pending`] and written to the peer by
/// the transport layer.
///
/// The encoder writes [`TelnetFrame`]s, escaping IAC in data and doubling
/// IAC inside subnegotiation payloads.
pub struct TelnetCodec {
    decoder_state: DecoderState,
    subnegotiation_buffer: BytesMut,
    subnegotiation_overflow: usize,
    options: OptionTable,
    handlers: HandlerRegistry,
    pending: Vec<TelnetFrame>,
}

impl TelnetCodec {
    /// Creates a codec with the default handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handlers(HandlerRegistry::default())
    }

    /// Creates a codec with a caller-supplied handler registry.
    #[must_use]
    pub fn with_handlers(handlers: HandlerRegistry) -> Self {
        TelnetCodec {
            decoder_state: DecoderState::Data,
            subnegotiation_buffer: BytesMut::new(),
            subnegotiation_overflow: 0,
            options: OptionTable::default(),
            handlers,
            pending: Vec::new(),
        }
    }

    /// Queues the initial WILL/DO requests the handler registry asks for.
    /// Call once, right after the connection is established.
    pub fn start_negotiation(&mut self) {
        for (option, local, remote) in self.handlers.initial_desires() {
            if local {
                if let Some(verb) = self.options.request_enable_local(option) {
                    self.push_reply(verb, option);
                }
            }
            if remote {
                if let Some(verb) = self.options.request_enable_remote(option) {
                    self.push_reply(verb, option);
                }
            }
        }
    }

    /// Whether `option` is enabled on our side.
    #[must_use]
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.options.local_enabled(option)
    }

    /// Whether `option` is enabled on the peer's side.
    #[must_use]
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.options.remote_enabled(option)
    }

    /// Requests enabling `option` locally (we send WILL).
    ///
    /// Refused with [`TelnetError::Negotiation`] when no registered
    /// handler accepts performing `option` on our side; offering WILL for
    /// an option we would not operate invites a pointless exchange.
    pub fn request_enable_local(&mut self, option: TelnetOption) -> Result<(), TelnetError> {
        if !self.handlers.accepts_local(option) {
            return Err(TelnetError::Negotiation(format!(
                "option {option} is not supported locally"
            )));
        }
        if let Some(verb) = self.options.request_enable_local(option) {
            self.push_reply(verb, option);
        }
        Ok(())
    }

    /// Requests disabling `option` locally (we send WONT).
    pub fn request_disable_local(&mut self, option: TelnetOption) {
        if let Some(verb) = self.options.request_disable_local(option) {
            self.push_reply(verb, option);
        }
    }

    /// Requests that the peer enable `option` (we send DO).
    ///
    /// Refused with [`TelnetError::Negotiation`] when no registered
    /// handler accepts the peer performing `option`.
    pub fn request_enable_remote(&mut self, option: TelnetOption) -> Result<(), TelnetError> {
        if !self.handlers.accepts_remote(option) {
            return Err(TelnetError::Negotiation(format!(
                "option {option} is not supported remotely"
            )));
        }
        if let Some(verb) = self.options.request_enable_remote(option) {
            self.push_reply(verb, option);
        }
        Ok(())
    }

    /// Requests that the peer disable `option` (we send DONT).
    pub fn request_disable_remote(&mut self, option: TelnetOption) {
        if let Some(verb) = self.options.request_disable_remote(option) {
            self.push_reply(verb, option);
        }
    }

    /// Starts a locally initiated subnegotiation for `option`, if its
    /// handler has one to offer.
    pub fn start_subnegotiation(&mut self, option: TelnetOption) {
        if let Some(payload) = self.handlers.start_subnegotiation_local(option) {
            self.pending
                .push(TelnetFrame::Subnegotiate(option, Bytes::from(payload)));
        }
    }

    /// Takes the queued outbound frames. The transport layer must write
    /// them to the peer, serialized against application writes.
    pub fn take_pending(&mut self) -> Vec<TelnetFrame> {
        std::mem::take(&mut self.pending)
    }

    /// Whether outbound frames are waiting in the queue.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn push_reply(&mut self, verb: ReplyVerb, option: TelnetOption) {
        self.pending.push(match verb {
            ReplyVerb::Will => TelnetFrame::Will(option),
            ReplyVerb::Wont => TelnetFrame::Wont(option),
            ReplyVerb::Do => TelnetFrame::Do(option),
            ReplyVerb::Dont => TelnetFrame::Dont(option),
        });
    }

    fn apply_transition(
        &mut self,
        transition: Transition,
        option: TelnetOption,
        side: TelnetSide,
    ) -> Option<TelnetEvent> {
        if let Some(verb) = transition.reply {
            self.push_reply(verb, option);
        }
        if transition.status_changed {
            let enabled = match side {
                TelnetSide::Local => self.options.local_enabled(option),
                TelnetSide::Remote => self.options.remote_enabled(option),
            };
            Some(TelnetEvent::OptionStatus(option, side, enabled))
        } else {
            None
        }
    }

    /// Completes a subnegotiation: hands the buffer to the option handler
    /// and queues its reply, then emits the event for the caller.
    fn finish_subnegotiation(&mut self, option_code: u8) -> TelnetEvent {
        let option = TelnetOption::from_u8(option_code);
        let payload = self.subnegotiation_buffer.split().freeze();
        if self.subnegotiation_overflow > 0 {
            warn!(
                "subnegotiation for {option} overflowed; dropped {} bytes",
                self.subnegotiation_overflow
            );
            self.subnegotiation_overflow = 0;
        }

        // Handlers see the buffer the way it sits in memory on the wire
        // side: option code first, then the arguments.
        let mut handler_view = Vec::with_capacity(1 + payload.len());
        handler_view.push(option_code);
        handler_view.extend_from_slice(&payload);
        if let Some(reply) = self.handlers.answer_subnegotiation(option, &handler_view) {
            self.pending
                .push(TelnetFrame::Subnegotiate(option, Bytes::from(reply)));
        }

        TelnetEvent::Subnegotiation(option, payload)
    }

    /// Whether inbound CR needs netascii treatment: only while the peer is
    /// not transmitting binary.
    fn cr_processing_active(&self) -> bool {
        !self.options.remote_enabled(TelnetOption::TransmitBinary)
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec::new()
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = TelnetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        while src.remaining() > 0 {
            let byte = src.get_u8();
            match (self.decoder_state, byte) {
                // #### Data ##################################################
                (DecoderState::Data, consts::IAC) => {
                    self.decoder_state = DecoderState::Command;
                }
                (DecoderState::Data, consts::CR) if self.cr_processing_active() => {
                    self.decoder_state = DecoderState::Cr;
                    return Ok(Some(TelnetEvent::Data(consts::CR)));
                }
                (DecoderState::Data, _) => {
                    return Ok(Some(TelnetEvent::Data(byte)));
                }

                // #### After CR, outside binary mode #########################
                (DecoderState::Cr, consts::NUL) => {
                    // CR NUL is the netascii encoding of a bare CR, which
                    // was already delivered.
                    self.decoder_state = DecoderState::Data;
                }
                (DecoderState::Cr, consts::IAC) => {
                    self.decoder_state = DecoderState::Command;
                }
                (DecoderState::Cr, _) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::Data(byte)));
                }

                // #### After IAC #############################################
                (DecoderState::Command, consts::IAC) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::Data(consts::IAC)));
                }
                (DecoderState::Command, consts::WILL) => {
                    self.decoder_state = DecoderState::NegotiateWill;
                }
                (DecoderState::Command, consts::WONT) => {
                    self.decoder_state = DecoderState::NegotiateWont;
                }
                (DecoderState::Command, consts::DO) => {
                    self.decoder_state = DecoderState::NegotiateDo;
                }
                (DecoderState::Command, consts::DONT) => {
                    self.decoder_state = DecoderState::NegotiateDont;
                }
                (DecoderState::Command, consts::SB) => {
                    self.subnegotiation_buffer.clear();
                    self.subnegotiation_overflow = 0;
                    self.decoder_state = DecoderState::SubnegotiateOption;
                }
                (DecoderState::Command, consts::SE) => {
                    // Stray SE outside a subnegotiation.
                    self.decoder_state = DecoderState::Data;
                }
                (DecoderState::Command, consts::NOP) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::NoOperation));
                }
                (DecoderState::Command, consts::DM) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::DataMark));
                }
                (DecoderState::Command, consts::BRK) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::Break));
                }
                (DecoderState::Command, consts::IP) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::InterruptProcess));
                }
                (DecoderState::Command, consts::AO) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::AbortOutput));
                }
                (DecoderState::Command, consts::AYT) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::AreYouThere));
                }
                (DecoderState::Command, consts::EC) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::EraseCharacter));
                }
                (DecoderState::Command, consts::EL) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::EraseLine));
                }
                (DecoderState::Command, consts::GA) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::GoAhead));
                }
                (DecoderState::Command, _) => {
                    warn!("received unknown command 0x{byte:02X}");
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(TelnetEvent::NoOperation));
                }

                // #### Negotiation ###########################################
                (DecoderState::NegotiateWill, _) => {
                    self.decoder_state = DecoderState::Data;
                    let option = TelnetOption::from_u8(byte);
                    let accept = self.handlers.accepts_remote(option);
                    let transition = self.options.receive_will(option, accept);
                    if let Some(event) =
                        self.apply_transition(transition, option, TelnetSide::Remote)
                    {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateWont, _) => {
                    self.decoder_state = DecoderState::Data;
                    let option = TelnetOption::from_u8(byte);
                    let transition = self.options.receive_wont(option);
                    if let Some(event) =
                        self.apply_transition(transition, option, TelnetSide::Remote)
                    {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateDo, _) => {
                    self.decoder_state = DecoderState::Data;
                    let option = TelnetOption::from_u8(byte);
                    let accept = self.handlers.accepts_local(option);
                    let transition = self.options.receive_do(option, accept);
                    if let Some(event) =
                        self.apply_transition(transition, option, TelnetSide::Local)
                    {
                        return Ok(Some(event));
                    }
                }
                (DecoderState::NegotiateDont, _) => {
                    self.decoder_state = DecoderState::Data;
                    let option = TelnetOption::from_u8(byte);
                    let transition = self.options.receive_dont(option);
                    if let Some(event) =
                        self.apply_transition(transition, option, TelnetSide::Local)
                    {
                        return Ok(Some(event));
                    }
                }

                // #### Subnegotiation ########################################
                (DecoderState::SubnegotiateOption, consts::IAC) => {
                    // IAC immediately after SB: no option byte yet. Treat
                    // as a command to keep the stream aligned.
                    self.decoder_state = DecoderState::Command;
                }
                (DecoderState::SubnegotiateOption, _) => {
                    self.decoder_state = DecoderState::Subnegotiate(byte);
                }
                (DecoderState::Subnegotiate(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateIac(option);
                }
                (DecoderState::Subnegotiate(option), _) => {
                    if self.subnegotiation_buffer.len() < SUBNEGOTIATION_BUFFER_MAX {
                        self.subnegotiation_buffer.put_u8(byte);
                    } else {
                        self.subnegotiation_overflow += 1;
                    }
                    self.decoder_state = DecoderState::Subnegotiate(option);
                }
                (DecoderState::SubnegotiateIac(option), consts::SE) => {
                    self.decoder_state = DecoderState::Data;
                    return Ok(Some(self.finish_subnegotiation(option)));
                }
                (DecoderState::SubnegotiateIac(option), consts::IAC) => {
                    // Doubled IAC inside the payload.
                    if self.subnegotiation_buffer.len() < SUBNEGOTIATION_BUFFER_MAX {
                        self.subnegotiation_buffer.put_u8(consts::IAC);
                    } else {
                        self.subnegotiation_overflow += 1;
                    }
                    self.decoder_state = DecoderState::Subnegotiate(option);
                }
                (DecoderState::SubnegotiateIac(option), _) => {
                    // Malformed: IAC followed by something other than SE or
                    // IAC inside a subnegotiation. Stay in the payload and
                    // keep collecting.
                    warn!("unexpected 0x{byte:02X} after IAC inside subnegotiation");
                    self.decoder_state = DecoderState::Subnegotiate(option);
                }
            }
        }
        Ok(None)
    }
}

/// Encodes one frame into `dst`.
pub(crate) fn encode_frame(frame: &TelnetFrame, dst: &mut BytesMut) {
    match frame {
        TelnetFrame::Data(byte) => {
            dst.reserve(2);
            if *byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(*byte);
        }
        TelnetFrame::NoOperation => put_command(dst, consts::NOP),
        TelnetFrame::DataMark => put_command(dst, consts::DM),
        TelnetFrame::Break => put_command(dst, consts::BRK),
        TelnetFrame::InterruptProcess => put_command(dst, consts::IP),
        TelnetFrame::AbortOutput => put_command(dst, consts::AO),
        TelnetFrame::AreYouThere => put_command(dst, consts::AYT),
        TelnetFrame::EraseCharacter => put_command(dst, consts::EC),
        TelnetFrame::EraseLine => put_command(dst, consts::EL),
        TelnetFrame::GoAhead => put_command(dst, consts::GA),
        TelnetFrame::Do(option) => put_negotiation(dst, consts::DO, *option),
        TelnetFrame::Dont(option) => put_negotiation(dst, consts::DONT, *option),
        TelnetFrame::Will(option) => put_negotiation(dst, consts::WILL, *option),
        TelnetFrame::Wont(option) => put_negotiation(dst, consts::WONT, *option),
        TelnetFrame::Subnegotiate(option, payload) => {
            dst.reserve(5 + payload.len() * 2);
            dst.put_u8(consts::IAC);
            dst.put_u8(consts::SB);
            dst.put_u8(option.to_u8());
            for &byte in payload.iter() {
                // An IAC in the payload must be doubled on the wire.
                if byte == consts::IAC {
                    dst.put_u8(consts::IAC);
                }
                dst.put_u8(byte);
            }
            dst.put_u8(consts::IAC);
            dst.put_u8(consts::SE);
        }
    }
}

fn put_command(dst: &mut BytesMut, command: u8) {
    dst.reserve(2);
    dst.put_u8(consts::IAC);
    dst.put_u8(command);
}

fn put_negotiation(dst: &mut BytesMut, verb: u8, option: TelnetOption) {
    dst.reserve(3);
    dst.put_u8(consts::IAC);
    dst.put_u8(verb);
    dst.put_u8(option.to_u8());
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = TelnetError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}

impl Encoder<&[u8]> for TelnetCodec {
    type Error = TelnetError;

    /// Encodes raw application bytes, escaping IAC.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 2);
        for &byte in item {
            if byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(byte);
        }
        Ok(())
    }
}

/// A stateless frame encoder for the write half of a split connection.
///
/// Encoding needs no negotiation state, so the reader task can own the
/// full [`TelnetCodec`] while writers share this one behind a lock.
#[derive(Clone, Copy, Debug, Default)]
pub struct TelnetEncoder;

impl Encoder<TelnetFrame> for TelnetEncoder {
    type Error = TelnetError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}

/// Decoder positions between bytes of an IAC sequence.
#[derive(Clone, Copy, Debug)]
enum DecoderState {
    /// Plain data.
    Data,
    /// A CR was just delivered outside binary mode; a following NUL is
    /// padding to swallow.
    Cr,
    /// An IAC was seen; the next byte is a command.
    Command,
    /// `IAC WILL`; the next byte names the option.
    NegotiateWill,
    /// `IAC WONT`; the next byte names the option.
    NegotiateWont,
    /// `IAC DO`; the next byte names the option.
    NegotiateDo,
    /// `IAC DONT`; the next byte names the option.
    NegotiateDont,
    /// `IAC SB`; the next byte names the option being subnegotiated.
    SubnegotiateOption,
    /// Collecting subnegotiation payload for the option.
    Subnegotiate(u8),
    /// An IAC inside a subnegotiation payload; SE ends it, a doubled IAC
    /// is payload.
    SubnegotiateIac(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut TelnetCodec, bytes: &[u8]) -> Vec<TelnetEvent> {
        let mut src = BytesMut::from(bytes);
        let mut events = Vec::new();
        while let Some(event) = codec.decode(&mut src).expect("decode never errors") {
            events.push(event);
        }
        events
    }

    fn data_bytes(events: &[TelnetEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|event| match event {
                TelnetEvent::Data(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }

    // ============================================================================
    // Byte Transparency
    // ============================================================================

    #[test]
    fn plain_data_passes_through_verbatim() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, b"hello, world");
        assert_eq!(data_bytes(&events), b"hello, world");
        assert!(!codec.has_pending());
    }

    #[test]
    fn doubled_iac_delivers_a_single_0xff() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[b'a', consts::IAC, consts::IAC, b'b']);
        assert_eq!(data_bytes(&events), &[b'a', 0xFF, b'b']);
    }

    #[test]
    fn iac_commands_are_never_delivered_as_data() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[b'x', consts::IAC, consts::AYT, b'y', consts::IAC, consts::NOP, b'z'],
        );
        assert_eq!(data_bytes(&events), b"xyz");
        assert!(events.contains(&TelnetEvent::AreYouThere));
        assert!(events.contains(&TelnetEvent::NoOperation));
    }

    #[test]
    fn high_bytes_pass_outside_commands() {
        let mut codec = TelnetCodec::new();
        let input: Vec<u8> = (0u8..=254).collect(); // no IAC
        let events = decode_all(&mut codec, &input);
        // CR NUL collapses to CR outside binary mode; everything else is
        // verbatim.
        let mut expected = input.clone();
        let cr_pos = expected
            .iter()
            .position(|&b| b == consts::CR)
            .expect("CR in range");
        // 13 is followed by 14 in 0..=254 order, so nothing is swallowed.
        assert_eq!(expected[cr_pos + 1], 14);
        assert_eq!(data_bytes(&events), expected);
    }

    #[test]
    fn split_sequences_decode_across_feeds() {
        let mut codec = TelnetCodec::new();
        let mut src = BytesMut::from(&[consts::IAC][..]);
        assert!(codec.decode(&mut src).expect("ok").is_none());
        let mut src = BytesMut::from(&[consts::AYT][..]);
        assert_eq!(
            codec.decode(&mut src).expect("ok"),
            Some(TelnetEvent::AreYouThere)
        );
    }

    // ============================================================================
    // CR Handling
    // ============================================================================

    #[test]
    fn cr_nul_collapses_to_cr() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[b'a', consts::CR, consts::NUL, b'b']);
        assert_eq!(data_bytes(&events), &[b'a', consts::CR, b'b']);
    }

    #[test]
    fn cr_lf_passes_through() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[consts::CR, consts::LF]);
        assert_eq!(data_bytes(&events), &[consts::CR, consts::LF]);
    }

    #[test]
    fn cr_nul_passes_verbatim_in_binary_mode() {
        let mut codec = TelnetCodec::new();
        // Peer announces binary transmission; we accept.
        decode_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::BINARY]);
        codec.take_pending();
        let events = decode_all(&mut codec, &[consts::CR, consts::NUL]);
        assert_eq!(data_bytes(&events), &[consts::CR, consts::NUL]);
    }

    // ============================================================================
    // Negotiation
    // ============================================================================

    #[test]
    fn will_for_accepted_option_answers_do() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[consts::IAC, consts::WILL, consts::option::SGA],
        );
        assert_eq!(
            events,
            vec![TelnetEvent::OptionStatus(
                TelnetOption::SuppressGoAhead,
                TelnetSide::Remote,
                true
            )]
        );
        assert_eq!(
            codec.take_pending(),
            vec![TelnetFrame::Do(TelnetOption::SuppressGoAhead)]
        );
        assert!(codec.is_enabled_remote(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn will_for_refused_option_answers_dont() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[consts::IAC, consts::WILL, consts::option::LINEMODE],
        );
        assert!(events.is_empty());
        assert_eq!(
            codec.take_pending(),
            vec![TelnetFrame::Dont(TelnetOption::Linemode)]
        );
    }

    #[test]
    fn do_for_accepted_option_answers_will() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, &[consts::IAC, consts::DO, consts::option::SGA]);
        assert_eq!(
            events,
            vec![TelnetEvent::OptionStatus(
                TelnetOption::SuppressGoAhead,
                TelnetSide::Local,
                true
            )]
        );
        assert_eq!(
            codec.take_pending(),
            vec![TelnetFrame::Will(TelnetOption::SuppressGoAhead)]
        );
    }

    #[test]
    fn do_for_refused_option_answers_wont() {
        let mut codec = TelnetCodec::new();
        decode_all(&mut codec, &[consts::IAC, consts::DO, consts::option::ECHO]);
        // The default registry lets the peer echo but will not echo
        // itself.
        assert_eq!(
            codec.take_pending(),
            vec![TelnetFrame::Wont(TelnetOption::Echo)]
        );
    }

    #[test]
    fn steady_state_confirmations_are_silent() {
        let mut codec = TelnetCodec::new();
        decode_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::SGA]);
        codec.take_pending();
        for _ in 0..3 {
            let events =
                decode_all(&mut codec, &[consts::IAC, consts::WILL, consts::option::SGA]);
            assert!(events.is_empty());
            assert!(!codec.has_pending(), "no reply to a repeated WILL");
        }
    }

    #[test]
    fn negotiation_bytes_are_not_data() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[b'a', consts::IAC, consts::DO, consts::option::SGA, b'b'],
        );
        assert_eq!(data_bytes(&events), b"ab");
    }

    // ============================================================================
    // Subnegotiation
    // ============================================================================

    #[test]
    fn terminal_type_send_triggers_is_reply() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[
                consts::IAC,
                consts::SB,
                consts::option::TTYPE,
                consts::ttype::SEND,
                consts::IAC,
                consts::SE,
            ],
        );
        // No data reaches the caller.
        assert!(data_bytes(&events).is_empty());
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation(
                TelnetOption::TerminalType,
                Bytes::from_static(&[consts::ttype::SEND])
            )]
        );
        let pending = codec.take_pending();
        assert_eq!(pending.len(), 1);
        match &pending[0] {
            TelnetFrame::Subnegotiate(TelnetOption::TerminalType, payload) => {
                assert_eq!(payload[0], consts::ttype::IS);
                assert_eq!(&payload[1..], b"xterm-256color");
            }
            other => panic!("expected a terminal-type reply, got {other}"),
        }
    }

    #[test]
    fn subnegotiation_with_escaped_iac_in_payload() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                0x01,
                consts::IAC,
                consts::IAC,
                0x03,
                consts::IAC,
                consts::SE,
            ],
        );
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation(
                TelnetOption::Status,
                Bytes::from_static(&[0x01, consts::IAC, 0x03])
            )]
        );
    }

    #[test]
    fn oversized_subnegotiation_is_truncated_not_fatal() {
        let mut codec = TelnetCodec::new();
        let mut input = vec![consts::IAC, consts::SB, consts::option::STATUS];
        input.extend(std::iter::repeat(7u8).take(SUBNEGOTIATION_BUFFER_MAX + 100));
        input.extend_from_slice(&[consts::IAC, consts::SE, b'k']);
        let events = decode_all(&mut codec, &input);
        match &events[0] {
            TelnetEvent::Subnegotiation(TelnetOption::Status, payload) => {
                assert_eq!(payload.len(), SUBNEGOTIATION_BUFFER_MAX);
            }
            other => panic!("expected subnegotiation, got {other:?}"),
        }
        // The stream stays aligned after the overflow.
        assert_eq!(data_bytes(&events), b"k");
    }

    // ============================================================================
    // Encoding
    // ============================================================================

    #[test]
    fn encode_data_escapes_iac() {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(&[b'a', consts::IAC, b'b'][..], &mut dst)
            .expect("encode ok");
        assert_eq!(&dst[..], &[b'a', consts::IAC, consts::IAC, b'b']);
    }

    #[test]
    fn encode_negotiation_frames() {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(TelnetFrame::Will(TelnetOption::Echo), &mut dst)
            .expect("encode ok");
        assert_eq!(&dst[..], &[consts::IAC, consts::WILL, consts::option::ECHO]);
    }

    #[test]
    fn encode_subnegotiation_doubles_payload_iac() {
        let mut encoder = TelnetEncoder;
        let mut dst = BytesMut::new();
        encoder
            .encode(
                TelnetFrame::Subnegotiate(
                    TelnetOption::Status,
                    Bytes::from_static(&[0x01, consts::IAC]),
                ),
                &mut dst,
            )
            .expect("encode ok");
        assert_eq!(
            &dst[..],
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                0x01,
                consts::IAC,
                consts::IAC,
                consts::IAC,
                consts::SE,
            ]
        );
    }

    #[test]
    fn encoded_frames_decode_back() {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(TelnetFrame::Data(consts::IAC), &mut dst)
            .expect("encode ok");
        codec
            .encode(TelnetFrame::AreYouThere, &mut dst)
            .expect("encode ok");
        let events = decode_all(&mut codec, &dst);
        assert_eq!(
            events,
            vec![TelnetEvent::Data(consts::IAC), TelnetEvent::AreYouThere]
        );
    }

    #[test]
    fn enable_request_for_unsupported_option_is_refused() {
        let mut codec = TelnetCodec::new();
        // No handler in the default set touches Linemode.
        let err = codec
            .request_enable_local(TelnetOption::Linemode)
            .expect_err("unsupported option must be refused");
        assert!(matches!(err, TelnetError::Negotiation(_)));
        assert!(!codec.has_pending(), "a refused request sends nothing");

        codec
            .request_enable_local(TelnetOption::SuppressGoAhead)
            .expect("supported option negotiates");
        assert_eq!(
            codec.take_pending(),
            vec![TelnetFrame::Will(TelnetOption::SuppressGoAhead)]
        );
    }

    #[test]
    fn remote_enable_request_checks_remote_support() {
        let mut codec = TelnetCodec::new();
        // The default set lets the peer echo but never echoes itself, so
        // DO Echo is fine while WILL Echo is refused.
        codec
            .request_enable_remote(TelnetOption::Echo)
            .expect("peer echo is supported");
        assert_eq!(
            codec.take_pending(),
            vec![TelnetFrame::Do(TelnetOption::Echo)]
        );
        let err = codec
            .request_enable_local(TelnetOption::Echo)
            .expect_err("local echo is not supported");
        assert!(matches!(err, TelnetError::Negotiation(_)));
    }

    // ============================================================================
    // Initial Negotiation
    // ============================================================================

    #[test]
    fn start_negotiation_queues_initial_desires() {
        let registry = HandlerRegistry::empty().with(
            crate::handlers::suppress_go_ahead()
                .with_initial_local(true)
                .with_initial_remote(true),
        );
        let mut codec = TelnetCodec::with_handlers(registry);
        codec.start_negotiation();
        assert_eq!(
            codec.take_pending(),
            vec![
                TelnetFrame::Will(TelnetOption::SuppressGoAhead),
                TelnetFrame::Do(TelnetOption::SuppressGoAhead),
            ]
        );
    }

    // ============================================================================
    // Two Codecs In Conversation
    // ============================================================================

    /// Feed every pending frame of one codec into the other until both are
    /// silent, with a hard cap proving no negotiation loop.
    #[test]
    fn paired_codecs_reach_quiescence() {
        let mut alice = TelnetCodec::new();
        let mut bob = TelnetCodec::new();
        alice.start_negotiation();
        bob.start_negotiation();

        let mut rounds = 0;
        loop {
            let from_alice = alice.take_pending();
            let from_bob = bob.take_pending();
            if from_alice.is_empty() && from_bob.is_empty() {
                break;
            }
            rounds += 1;
            assert!(rounds < 16, "negotiation did not converge");

            let mut wire = BytesMut::new();
            for frame in from_alice {
                encode_frame(&frame, &mut wire);
            }
            while bob.decode(&mut wire).expect("decode ok").is_some() {}

            let mut wire = BytesMut::new();
            for frame in from_bob {
                encode_frame(&frame, &mut wire);
            }
            while alice.decode(&mut wire).expect("decode ok").is_some() {}
        }
    }
}
