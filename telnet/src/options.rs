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

//! Option identities and the RFC 1143 ("Q-method") negotiation state
//! machine.
//!
//! Every option is negotiated independently per side. The local side is
//! what *we* perform (announced with WILL/WONT, requested by the peer with
//! DO/DONT); the remote side is what the *peer* performs. Each side holds
//! one of six states: the four of RFC 1143 plus the two `*Opposite` states
//! that encode the "queue bit" for a reversed request issued while the
//! first is still in flight. The tables below answer a request exactly
//! once and never confirm a steady state, which is what makes negotiation
//! loops impossible.

use crate::consts;
use std::fmt;

/// A Telnet option code.
///
/// Only options this crate has some use for are named; everything else is
/// carried as [`TelnetOption::Unknown`] and refused in negotiation by
/// default.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// Binary Transmission (RFC 856).
    TransmitBinary,
    /// Echo (RFC 857).
    Echo,
    /// Suppress Go Ahead (RFC 858).
    SuppressGoAhead,
    /// Status (RFC 859).
    Status,
    /// Timing Mark (RFC 860).
    TimingMark,
    /// Terminal Type (RFC 1091).
    TerminalType,
    /// End of Record (RFC 885).
    EndOfRecord,
    /// Negotiate About Window Size (RFC 1073).
    WindowSize,
    /// Terminal Speed (RFC 1079).
    TerminalSpeed,
    /// Remote Flow Control (RFC 1372).
    FlowControl,
    /// Linemode (RFC 1184).
    Linemode,
    /// X Display Location (RFC 1096).
    DisplayLocation,
    /// New Environment (RFC 1572).
    NewEnvironment,
    /// Any other option code.
    Unknown(u8),
}

impl TelnetOption {
    /// The option's wire code.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TerminalType => consts::option::TTYPE,
            TelnetOption::EndOfRecord => consts::option::EOR,
            TelnetOption::WindowSize => consts::option::NAWS,
            TelnetOption::TerminalSpeed => consts::option::TSPEED,
            TelnetOption::FlowControl => consts::option::LFLOW,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::DisplayLocation => consts::option::XDISPLOC,
            TelnetOption::NewEnvironment => consts::option::NEW_ENVIRONMENT,
            TelnetOption::Unknown(code) => code,
        }
    }

    /// Maps a wire code to an option.
    #[must_use]
    pub fn from_u8(code: u8) -> Self {
        match code {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TerminalType,
            consts::option::EOR => TelnetOption::EndOfRecord,
            consts::option::NAWS => TelnetOption::WindowSize,
            consts::option::TSPEED => TelnetOption::TerminalSpeed,
            consts::option::LFLOW => TelnetOption::FlowControl,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::XDISPLOC => TelnetOption::DisplayLocation,
            consts::option::NEW_ENVIRONMENT => TelnetOption::NewEnvironment,
            code => TelnetOption::Unknown(code),
        }
    }
}

impl fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Status => write!(f, "Status"),
            TelnetOption::TimingMark => write!(f, "TimingMark"),
            TelnetOption::TerminalType => write!(f, "TerminalType"),
            TelnetOption::EndOfRecord => write!(f, "EndOfRecord"),
            TelnetOption::WindowSize => write!(f, "WindowSize"),
            TelnetOption::TerminalSpeed => write!(f, "TerminalSpeed"),
            TelnetOption::FlowControl => write!(f, "FlowControl"),
            TelnetOption::Linemode => write!(f, "Linemode"),
            TelnetOption::DisplayLocation => write!(f, "DisplayLocation"),
            TelnetOption::NewEnvironment => write!(f, "NewEnvironment"),
            TelnetOption::Unknown(code) => write!(f, "Unknown({code})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(code: u8) -> Self {
        TelnetOption::from_u8(code)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// Which side of the connection an option state belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetSide {
    /// What we perform (WILL/WONT from us, DO/DONT from the peer).
    Local,
    /// What the peer performs (DO/DONT from us, WILL/WONT from the peer).
    Remote,
}

impl fmt::Display for TelnetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelnetSide::Local => write!(f, "Local"),
            TelnetSide::Remote => write!(f, "Remote"),
        }
    }
}

/// One side's negotiation state for one option.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum QState {
    /// Disabled.
    #[default]
    No,
    /// Disable requested while enabled; awaiting the peer's confirmation.
    WantNo,
    /// As `WantNo`, with a queued request to re-enable afterwards.
    WantNoOpposite,
    /// Enabled.
    Yes,
    /// Enable requested while disabled; awaiting the peer's confirmation.
    WantYes,
    /// As `WantYes`, with a queued request to re-disable afterwards.
    WantYesOpposite,
}

impl QState {
    /// Whether this state counts as enabled for the purpose of stream
    /// processing (an enable that is merely being torn down still counts).
    pub(crate) fn enabled(self) -> bool {
        matches!(self, QState::Yes | QState::WantNo | QState::WantNoOpposite)
    }
}

/// A reply the state machine wants sent, plus whether the side's effective
/// enabled/disabled status flipped.
#[derive(Debug, Default)]
pub(crate) struct Transition {
    pub reply: Option<ReplyVerb>,
    pub status_changed: bool,
}

/// The verb of a queued negotiation reply; the codec pairs it back up with
/// the option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ReplyVerb {
    Will,
    Wont,
    Do,
    Dont,
}

/// Per-option negotiation state for both sides, indexed by option code.
pub(crate) struct OptionTable {
    local: [QState; 256],
    remote: [QState; 256],
}

impl Default for OptionTable {
    fn default() -> Self {
        OptionTable {
            local: [QState::No; 256],
            remote: [QState::No; 256],
        }
    }
}

impl OptionTable {
    pub(crate) fn local_state(&self, option: TelnetOption) -> QState {
        self.local[option.to_u8() as usize]
    }

    pub(crate) fn remote_state(&self, option: TelnetOption) -> QState {
        self.remote[option.to_u8() as usize]
    }

    pub(crate) fn local_enabled(&self, option: TelnetOption) -> bool {
        self.local_state(option).enabled()
    }

    pub(crate) fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.remote_state(option).enabled()
    }

    // #### Requests we initiate ##############################################

    /// We want to start performing `option` (leads to WILL).
    pub(crate) fn request_enable_local(&mut self, option: TelnetOption) -> Option<ReplyVerb> {
        let state = &mut self.local[option.to_u8() as usize];
        match *state {
            QState::No => {
                *state = QState::WantYes;
                Some(ReplyVerb::Will)
            }
            QState::WantNo => {
                // Queue the reversal; it is sent once the disable settles.
                *state = QState::WantNoOpposite;
                None
            }
            QState::WantYesOpposite => {
                *state = QState::WantYes;
                None
            }
            QState::Yes | QState::WantYes | QState::WantNoOpposite => None,
        }
    }

    /// We want to stop performing `option` (leads to WONT).
    pub(crate) fn request_disable_local(&mut self, option: TelnetOption) -> Option<ReplyVerb> {
        let state = &mut self.local[option.to_u8() as usize];
        match *state {
            QState::Yes => {
                *state = QState::WantNo;
                Some(ReplyVerb::Wont)
            }
            QState::WantYes => {
                *state = QState::WantYesOpposite;
                None
            }
            QState::WantNoOpposite => {
                *state = QState::WantNo;
                None
            }
            QState::No | QState::WantNo | QState::WantYesOpposite => None,
        }
    }

    /// We want the peer to start performing `option` (leads to DO).
    pub(crate) fn request_enable_remote(&mut self, option: TelnetOption) -> Option<ReplyVerb> {
        let state = &mut self.remote[option.to_u8() as usize];
        match *state {
            QState::No => {
                *state = QState::WantYes;
                Some(ReplyVerb::Do)
            }
            QState::WantNo => {
                *state = QState::WantNoOpposite;
                None
            }
            QState::WantYesOpposite => {
                *state = QState::WantYes;
                None
            }
            QState::Yes | QState::WantYes | QState::WantNoOpposite => None,
        }
    }

    /// We want the peer to stop performing `option` (leads to DONT).
    pub(crate) fn request_disable_remote(&mut self, option: TelnetOption) -> Option<ReplyVerb> {
        let state = &mut self.remote[option.to_u8() as usize];
        match *state {
            QState::Yes => {
                *state = QState::WantNo;
                Some(ReplyVerb::Dont)
            }
            QState::WantYes => {
                *state = QState::WantYesOpposite;
                None
            }
            QState::WantNoOpposite => {
                *state = QState::WantNo;
                None
            }
            QState::No | QState::WantNo | QState::WantYesOpposite => None,
        }
    }

    // #### Commands the peer sent ############################################

    /// The peer announced WILL: it wants to (or agrees to) perform
    /// `option`. `accept` is our policy when the offer is unsolicited.
    pub(crate) fn receive_will(&mut self, option: TelnetOption, accept: bool) -> Transition {
        let state = &mut self.remote[option.to_u8() as usize];
        let before = state.enabled();
        let reply = match *state {
            QState::No => {
                if accept {
                    *state = QState::Yes;
                    Some(ReplyVerb::Do)
                } else {
                    Some(ReplyVerb::Dont)
                }
            }
            QState::Yes => None,
            QState::WantYes => {
                *state = QState::Yes;
                None
            }
            QState::WantYesOpposite => {
                // Our queued disable goes out now that the enable settled.
                *state = QState::WantNo;
                Some(ReplyVerb::Dont)
            }
            QState::WantNo => {
                // WILL in answer to our DONT; treat the option as off.
                *state = QState::No;
                None
            }
            QState::WantNoOpposite => {
                *state = QState::WantYes;
                None
            }
        };
        Transition {
            reply,
            status_changed: state.enabled() != before,
        }
    }

    /// The peer announced WONT: it refuses (or stops) performing `option`.
    pub(crate) fn receive_wont(&mut self, option: TelnetOption) -> Transition {
        let state = &mut self.remote[option.to_u8() as usize];
        let before = state.enabled();
        let reply = match *state {
            QState::No => None,
            QState::Yes => {
                *state = QState::No;
                Some(ReplyVerb::Dont)
            }
            QState::WantNo => {
                *state = QState::No;
                None
            }
            QState::WantNoOpposite => {
                *state = QState::WantYes;
                Some(ReplyVerb::Do)
            }
            QState::WantYes | QState::WantYesOpposite => {
                *state = QState::No;
                None
            }
        };
        Transition {
            reply,
            status_changed: state.enabled() != before,
        }
    }

    /// The peer sent DO: it asks us to perform `option`.
    pub(crate) fn receive_do(&mut self, option: TelnetOption, accept: bool) -> Transition {
        let state = &mut self.local[option.to_u8() as usize];
        let before = state.enabled();
        let reply = match *state {
            QState::No => {
                if accept {
                    *state = QState::Yes;
                    Some(ReplyVerb::Will)
                } else {
                    Some(ReplyVerb::Wont)
                }
            }
            QState::Yes => None,
            QState::WantYes => {
                *state = QState::Yes;
                None
            }
            QState::WantYesOpposite => {
                *state = QState::WantNo;
                Some(ReplyVerb::Wont)
            }
            QState::WantNo => {
                *state = QState::No;
                None
            }
            QState::WantNoOpposite => {
                *state = QState::WantYes;
                None
            }
        };
        Transition {
            reply,
            status_changed: state.enabled() != before,
        }
    }

    /// The peer sent DONT: it asks us to stop performing `option`.
    pub(crate) fn receive_dont(&mut self, option: TelnetOption) -> Transition {
        let state = &mut self.local[option.to_u8() as usize];
        let before = state.enabled();
        let reply = match *state {
            QState::No => None,
            QState::Yes => {
                *state = QState::No;
                Some(ReplyVerb::Wont)
            }
            QState::WantNo => {
                *state = QState::No;
                None
            }
            QState::WantNoOpposite => {
                *state = QState::WantYes;
                Some(ReplyVerb::Will)
            }
            QState::WantYes | QState::WantYesOpposite => {
                *state = QState::No;
                None
            }
        };
        Transition {
            reply,
            status_changed: state.enabled() != before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPT: TelnetOption = TelnetOption::SuppressGoAhead;

    // ============================================================================
    // Requests We Initiate
    // ============================================================================

    #[test]
    fn enable_local_from_no_sends_will_once() {
        let mut table = OptionTable::default();
        assert_eq!(table.request_enable_local(OPT), Some(ReplyVerb::Will));
        assert_eq!(table.local_state(OPT), QState::WantYes);
        // Asking again while the request is in flight sends nothing.
        assert_eq!(table.request_enable_local(OPT), None);
    }

    #[test]
    fn enable_local_confirmed_by_do() {
        let mut table = OptionTable::default();
        table.request_enable_local(OPT);
        let transition = table.receive_do(OPT, true);
        assert_eq!(transition.reply, None, "a confirmation is never answered");
        assert!(transition.status_changed);
        assert!(table.local_enabled(OPT));
    }

    #[test]
    fn enable_local_refused_by_dont() {
        let mut table = OptionTable::default();
        table.request_enable_local(OPT);
        let transition = table.receive_dont(OPT);
        assert_eq!(transition.reply, None);
        assert!(!transition.status_changed);
        assert_eq!(table.local_state(OPT), QState::No);
    }

    #[test]
    fn disable_local_from_yes_sends_wont() {
        let mut table = OptionTable::default();
        table.receive_do(OPT, true); // peer enables us
        assert_eq!(table.request_disable_local(OPT), Some(ReplyVerb::Wont));
        assert_eq!(table.local_state(OPT), QState::WantNo);
        let transition = table.receive_dont(OPT);
        assert_eq!(transition.reply, None);
        assert_eq!(table.local_state(OPT), QState::No);
    }

    #[test]
    fn reversing_a_pending_enable_queues_the_disable() {
        let mut table = OptionTable::default();
        table.request_enable_local(OPT); // WantYes
        assert_eq!(table.request_disable_local(OPT), None);
        assert_eq!(table.local_state(OPT), QState::WantYesOpposite);
        // Peer confirms the enable; the queued disable goes out now.
        let transition = table.receive_do(OPT, true);
        assert_eq!(transition.reply, Some(ReplyVerb::Wont));
        assert_eq!(table.local_state(OPT), QState::WantNo);
    }

    // ============================================================================
    // Unsolicited Peer Commands
    // ============================================================================

    #[test]
    fn unsolicited_will_accepted() {
        let mut table = OptionTable::default();
        let transition = table.receive_will(OPT, true);
        assert_eq!(transition.reply, Some(ReplyVerb::Do));
        assert!(transition.status_changed);
        assert!(table.remote_enabled(OPT));
    }

    #[test]
    fn unsolicited_will_refused() {
        let mut table = OptionTable::default();
        let transition = table.receive_will(OPT, false);
        assert_eq!(transition.reply, Some(ReplyVerb::Dont));
        assert!(!transition.status_changed);
        assert!(!table.remote_enabled(OPT));
    }

    #[test]
    fn unsolicited_do_refused() {
        let mut table = OptionTable::default();
        let transition = table.receive_do(OPT, false);
        assert_eq!(transition.reply, Some(ReplyVerb::Wont));
        assert_eq!(table.local_state(OPT), QState::No);
    }

    #[test]
    fn wont_at_yes_is_acknowledged() {
        let mut table = OptionTable::default();
        table.receive_will(OPT, true);
        let transition = table.receive_wont(OPT);
        assert_eq!(transition.reply, Some(ReplyVerb::Dont));
        assert!(transition.status_changed);
        assert!(!table.remote_enabled(OPT));
    }

    // ============================================================================
    // Loop Freedom
    // ============================================================================

    #[test]
    fn repeated_will_never_answers_twice() {
        let mut table = OptionTable::default();
        assert!(table.receive_will(OPT, true).reply.is_some());
        for _ in 0..4 {
            let transition = table.receive_will(OPT, true);
            assert_eq!(transition.reply, None, "steady state must be silent");
            assert!(!transition.status_changed);
        }
    }

    #[test]
    fn repeated_wont_never_answers_twice() {
        let mut table = OptionTable::default();
        // WONT while already off is a steady-state confirmation.
        for _ in 0..4 {
            let transition = table.receive_wont(OPT);
            assert_eq!(transition.reply, None);
        }
    }

    #[test]
    fn every_state_reaches_quiescence_under_repeated_commands() {
        // From any reachable state, feeding the same peer verb repeatedly
        // must stop producing replies after the first two rounds.
        for verb in 0..4u8 {
            let mut table = OptionTable::default();
            table.request_enable_local(OPT);
            table.request_enable_remote(OPT);
            let mut replies = 0;
            for _ in 0..8 {
                let transition = match verb {
                    0 => table.receive_will(OPT, true),
                    1 => table.receive_wont(OPT),
                    2 => table.receive_do(OPT, true),
                    _ => table.receive_dont(OPT),
                };
                if transition.reply.is_some() {
                    replies += 1;
                }
            }
            assert!(replies <= 2, "verb {verb} produced {replies} replies");
        }
    }
}
