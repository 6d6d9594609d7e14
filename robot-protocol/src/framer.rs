//! ## FRAMER
//!
//! Reads one frame at a time off a [`Transport`](crate::transport::Transport),
//! byte by byte, up to the terminator `\a\b` (0x07 0x08). Each
//! [`crate::session::State`] has its own maximum frame length; the framer is
//! also where a message that overruns its state's budget but looks like the
//! start of a recharge announcement gets a second chance, per the mid-read
//! recharge detection rule.

use std::io::{self, Read};

use crate::error::SessionError;
use crate::session::State;

const TERMINATOR: [u8; 2] = [0x07, 0x08];

/// Total frame length, terminator included, a state will accept before
/// giving up.
pub fn length_budget(state: State) -> usize {
    match state {
        State::ClientUsername => 20,
        State::ClientKeyId => 5,
        State::ClientConfirmation => 7,
        State::InitialMove
        | State::DefineLocation
        | State::DefineDirection
        | State::ClientOk
        | State::Rotation
        | State::Evade
        | State::ClientRecharging
        | State::ClientFullPower => 12,
        State::ClientMessage | State::Logout => 100,
        State::TerminateConnection => 0,
    }
}

/// The prefixes that, seen at the point a state's budget would otherwise be
/// exhausted, buy the frame a second chance under the recharge budget.
const RECHARGE_PREFIXES: [&[u8]; 2] = [b"RECHA", b"FULL "];

/// Outcome of a single [`read_frame`] call.
pub struct FrameOutcome {
    /// Payload bytes, terminator excluded.
    pub payload: Vec<u8>,
    /// Set when the budget was about to be exhausted mid-read and a
    /// recharge prefix rescued the frame; the session must stash its current
    /// state and switch to `ClientRecharging` before dispatch.
    pub entered_mid_read_recharge: bool,
}

/// Reads a single terminated frame for `state`, enforcing its length budget.
///
/// Reads one byte at a time so the two-byte terminator can be recognized as
/// soon as it completes, and so the recharge-prefix check can run exactly at
/// the point the budget would otherwise be exceeded.
pub fn read_frame<R: Read>(transport: &mut R, state: State) -> Result<FrameOutcome, SessionError> {
    let mut budget = length_budget(state);
    let mut buf: Vec<u8> = Vec::new();
    let mut entered_mid_read_recharge = false;

    loop {
        let mut byte = [0u8; 1];
        match transport.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if is_timeout(&e) => return Err(SessionError::Timeout),
            Err(e) => return Err(SessionError::Io(e)),
        }
        buf.push(byte[0]);

        if buf.len() >= 2 && buf[buf.len() - 2..] == TERMINATOR {
            buf.truncate(buf.len() - 2);
            return Ok(FrameOutcome { payload: buf, entered_mid_read_recharge });
        }

        if buf.len() >= budget {
            if !entered_mid_read_recharge && state != State::ClientRecharging && matches_recharge_prefix(&buf) {
                entered_mid_read_recharge = true;
                budget = length_budget(State::ClientRecharging);
                continue;
            }
            return Err(SessionError::Syntax(format!(
                "frame exceeded {}-byte budget for {:?}",
                length_budget(state),
                state
            )));
        }
    }
}

fn matches_recharge_prefix(buf: &[u8]) -> bool {
    RECHARGE_PREFIXES.iter().any(|prefix| buf.starts_with(prefix))
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
