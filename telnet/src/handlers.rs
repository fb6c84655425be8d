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

//! Per-option behavior as plain capability records.
//!
//! An [`OptionHandler`] is a small record of flags and closures: what the
//! option wants at connection start, whether peer offers are accepted, and
//! how subnegotiations are answered. The codec consults the
//! [`HandlerRegistry`] by option code; options without a handler are
//! refused in negotiation and their subnegotiations dropped.

use crate::consts;
use crate::options::TelnetOption;
use std::collections::HashMap;
use tracing::debug;

/// Answers a subnegotiation. Receives the raw subnegotiation buffer with
/// the option code at index 0; returns the payload of the reply (without
/// the option code), or `None` for no reply.
pub type SubnegotiationFn = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

/// Produces the payload of a locally initiated subnegotiation, or `None`
/// when the option has nothing to say unprompted.
pub type StartSubnegotiationFn = Box<dyn FnMut() -> Option<Vec<u8>> + Send>;

/// How one option behaves on this endpoint.
pub struct OptionHandler {
    option: TelnetOption,
    /// Offer WILL for this option as soon as the connection starts.
    pub initial_local: bool,
    /// Ask the peer with DO as soon as the connection starts.
    pub initial_remote: bool,
    /// Answer a peer DO with WILL (we agree to perform the option).
    pub accept_local: bool,
    /// Answer a peer WILL with DO (we agree the peer performs it).
    pub accept_remote: bool,
    /// Callback answering peer subnegotiations.
    pub answer_subnegotiation: Option<SubnegotiationFn>,
    /// Callback producing a locally initiated subnegotiation.
    pub start_subnegotiation_local: Option<StartSubnegotiationFn>,
}

impl OptionHandler {
    /// Creates a handler that refuses everything; tune it with the
    /// builder methods.
    #[must_use]
    pub fn new(option: TelnetOption) -> Self {
        OptionHandler {
            option,
            initial_local: false,
            initial_remote: false,
            accept_local: false,
            accept_remote: false,
            answer_subnegotiation: None,
            start_subnegotiation_local: None,
        }
    }

    /// The option this handler manages.
    #[must_use]
    pub fn option(&self) -> TelnetOption {
        self.option
    }

    /// Offer WILL at connection start.
    #[must_use]
    pub fn with_initial_local(mut self, initial: bool) -> Self {
        self.initial_local = initial;
        self
    }

    /// Send DO at connection start.
    #[must_use]
    pub fn with_initial_remote(mut self, initial: bool) -> Self {
        self.initial_remote = initial;
        self
    }

    /// Accept a peer DO (we will perform the option).
    #[must_use]
    pub fn with_accept_local(mut self, accept: bool) -> Self {
        self.accept_local = accept;
        self
    }

    /// Accept a peer WILL (the peer may perform the option).
    #[must_use]
    pub fn with_accept_remote(mut self, accept: bool) -> Self {
        self.accept_remote = accept;
        self
    }

    /// Installs the subnegotiation answer callback.
    #[must_use]
    pub fn with_subnegotiation_responder(
        mut self,
        responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    ) -> Self {
        self.answer_subnegotiation = Some(Box::new(responder));
        self
    }

    /// Installs the local subnegotiation starter callback.
    #[must_use]
    pub fn with_subnegotiation_starter(
        mut self,
        starter: impl FnMut() -> Option<Vec<u8>> + Send + 'static,
    ) -> Self {
        self.start_subnegotiation_local = Some(Box::new(starter));
        self
    }
}

/// The terminal-type option (RFC 1091): answers a SEND subnegotiation with
/// `IS <name>`.
#[must_use]
pub fn terminal_type(name: impl Into<String>) -> OptionHandler {
    let name = name.into();
    OptionHandler::new(TelnetOption::TerminalType)
        .with_accept_local(true)
        .with_subnegotiation_responder(move |buffer| {
            // buffer[0] is the option code; buffer[1] the TTYPE command.
            if buffer.len() >= 2 && buffer[1] == consts::ttype::SEND {
                let mut reply = Vec::with_capacity(1 + name.len());
                reply.push(consts::ttype::IS);
                reply.extend_from_slice(name.as_bytes());
                Some(reply)
            } else {
                debug!("ignoring terminal-type subnegotiation {buffer:?}");
                None
            }
        })
}

/// The echo option (RFC 857): we let the peer echo, we do not echo
/// ourselves.
#[must_use]
pub fn echo() -> OptionHandler {
    OptionHandler::new(TelnetOption::Echo).with_accept_remote(true)
}

/// The suppress-go-ahead option (RFC 858), accepted in both directions as
/// every modern endpoint does.
#[must_use]
pub fn suppress_go_ahead() -> OptionHandler {
    OptionHandler::new(TelnetOption::SuppressGoAhead)
        .with_accept_local(true)
        .with_accept_remote(true)
}

/// The binary transmission option (RFC 856), accepted in both directions.
#[must_use]
pub fn transmit_binary() -> OptionHandler {
    OptionHandler::new(TelnetOption::TransmitBinary)
        .with_accept_local(true)
        .with_accept_remote(true)
}

/// The set of option handlers active on a connection.
pub struct HandlerRegistry {
    handlers: HashMap<u8, OptionHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry. Every option is refused until a handler
    /// is registered for it.
    #[must_use]
    pub fn empty() -> Self {
        HandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler, replacing any previous handler for the same
    /// option code.
    pub fn register(&mut self, handler: OptionHandler) {
        self.handlers.insert(handler.option().to_u8(), handler);
    }

    /// Registers a handler, builder style.
    #[must_use]
    pub fn with(mut self, handler: OptionHandler) -> Self {
        self.register(handler);
        self
    }

    /// Whether a peer DO for `option` is accepted.
    #[must_use]
    pub fn accepts_local(&self, option: TelnetOption) -> bool {
        self.handlers
            .get(&option.to_u8())
            .is_some_and(|h| h.accept_local)
    }

    /// Whether a peer WILL for `option` is accepted.
    #[must_use]
    pub fn accepts_remote(&self, option: TelnetOption) -> bool {
        self.handlers
            .get(&option.to_u8())
            .is_some_and(|h| h.accept_remote)
    }

    /// Options that want negotiation at connection start, as
    /// `(option, local, remote)` desire tuples.
    pub(crate) fn initial_desires(&self) -> Vec<(TelnetOption, bool, bool)> {
        let mut desires: Vec<(TelnetOption, bool, bool)> = self
            .handlers
            .values()
            .filter(|h| h.initial_local || h.initial_remote)
            .map(|h| (h.option(), h.initial_local, h.initial_remote))
            .collect();
        // Registry iteration order is arbitrary; keep the wire order
        // stable.
        desires.sort_by_key(|(option, _, _)| option.to_u8());
        desires
    }

    /// Runs the subnegotiation responder for `option`. `buffer` carries
    /// the option code at index 0.
    pub(crate) fn answer_subnegotiation(
        &mut self,
        option: TelnetOption,
        buffer: &[u8],
    ) -> Option<Vec<u8>> {
        let handler = self.handlers.get_mut(&option.to_u8())?;
        let responder = handler.answer_subnegotiation.as_mut()?;
        responder(buffer)
    }

    /// Runs the local subnegotiation starter for `option`.
    pub(crate) fn start_subnegotiation_local(&mut self, option: TelnetOption) -> Option<Vec<u8>> {
        let handler = self.handlers.get_mut(&option.to_u8())?;
        let starter = handler.start_subnegotiation_local.as_mut()?;
        starter()
    }
}

impl Default for HandlerRegistry {
    /// The built-in handler set: terminal type (reported as
    /// `xterm-256color`), echo, suppress-go-ahead and binary transmission.
    fn default() -> Self {
        HandlerRegistry::empty()
            .with(terminal_type("xterm-256color"))
            .with(echo())
            .with(suppress_go_ahead())
            .with(transmit_binary())
    }
}
