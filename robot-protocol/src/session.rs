//! ## SESSION STATE MACHINE
//!
//! Owns the per-connection state for one robot: where it is in the
//! authentication/navigation/teardown lifecycle, and the [`Robot`]
//! navigation state it drives. [`Session::ingest`] is the single entry
//! point: given one framed payload (and whether the framer rescued it
//! mid-read into a recharge announcement), it returns the ordered list of
//! [`ServerReply`] frames to send, or a [`SessionError`] for the driver to
//! turn into an error frame before closing the connection.

use tracing::debug;

use crate::error::SessionError;
use crate::keytable;
use crate::robot::{Position, Robot};

/// Every state the session can be in. `InitialMove` and `ClientMessage` are
/// real states in the sense that the protocol table names them, but the
/// handlers for the states that lead into them resolve through to the next
/// state in the same call, so a client frame is never dispatched while
/// `self.state` is actually sitting at either of them; `Rotation` and
/// `ClientFullPower` are likewise named by the protocol but never assigned
/// at runtime (turning is folded into the states that request it, and
/// `FULL POWER` is handled as an event inside `ClientRecharging` rather than
/// as a state of its own).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    ClientUsername,
    ClientKeyId,
    ClientConfirmation,
    InitialMove,
    DefineLocation,
    DefineDirection,
    ClientOk,
    Rotation,
    Evade,
    ClientMessage,
    Logout,
    TerminateConnection,
    ClientRecharging,
    ClientFullPower,
}

/// One of the literal server command frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerReply {
    Move,
    TurnLeft,
    TurnRight,
    PickUp,
    Logout,
    KeyRequest,
    Ok,
    Confirmation(u16),
}

impl ServerReply {
    /// The literal frame, terminator included.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            ServerReply::Move => b"102 MOVE\a\b".to_vec(),
            ServerReply::TurnLeft => b"103 TURN LEFT\a\b".to_vec(),
            ServerReply::TurnRight => b"104 TURN RIGHT\a\b".to_vec(),
            ServerReply::PickUp => b"105 GET MESSAGE\a\b".to_vec(),
            ServerReply::Logout => b"106 LOGOUT\a\b".to_vec(),
            ServerReply::KeyRequest => b"107 KEY REQUEST\a\b".to_vec(),
            ServerReply::Ok => b"200 OK\a\b".to_vec(),
            ServerReply::Confirmation(hash) => format!("{}\a\b", hash).into_bytes(),
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, ServerReply::Move)
    }

    pub fn is_turn_right(&self) -> bool {
        matches!(self, ServerReply::TurnRight)
    }
}

/// The per-connection state machine.
pub struct Session {
    state: State,
    previous_state: State,
    robot: Robot,
    username: Vec<u8>,
    expected_client_hash: String,
    last_reply: Option<ServerReply>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            state: State::ClientUsername,
            previous_state: State::ClientUsername,
            robot: Robot::new(),
            username: Vec::new(),
            expected_client_hash: String::new(),
            last_reply: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == State::TerminateConnection
    }

    /// Processes one framed payload and returns the ordered frames to send.
    ///
    /// `entered_mid_read_recharge` is set by the framer when it rescued an
    /// overlong frame by recognizing a recharge prefix partway through
    /// reading it; the session must treat this frame as the start of a
    /// recharge episode rather than dispatching it normally.
    pub fn ingest(
        &mut self,
        payload: &[u8],
        entered_mid_read_recharge: bool,
    ) -> Result<Vec<ServerReply>, SessionError> {
        let text = String::from_utf8_lossy(payload).into_owned();
        debug!(state = ?self.state, payload = %text, "ingesting frame");

        if entered_mid_read_recharge {
            if self.state != State::ClientRecharging {
                self.previous_state = self.state;
                self.state = State::ClientRecharging;
            }
        } else {
            if text.contains("FULL POWER") && self.state != State::ClientRecharging {
                return Err(SessionError::Logic(
                    "FULL POWER received outside a recharge episode".into(),
                ));
            }
            if text.contains("RECHARGING") && self.state != State::ClientRecharging {
                self.previous_state = self.state;
                self.state = State::ClientRecharging;
                return Ok(Vec::new());
            }
        }

        if self.state == State::ClientRecharging {
            return self.handle_recharging(&text);
        }

        let replies = self.dispatch(&text)?;
        for reply in &replies {
            self.last_reply = Some(*reply);
        }
        Ok(replies)
    }

    fn dispatch(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        match self.state {
            State::ClientUsername => self.handle_username(text),
            State::ClientKeyId => self.handle_key_id(text),
            State::ClientConfirmation => self.handle_confirmation(text),
            State::DefineLocation => self.handle_define_location(text),
            State::DefineDirection => self.handle_define_direction(text),
            State::ClientOk => self.handle_client_ok(text),
            State::Evade => self.handle_evade(text),
            State::Logout => self.handle_logout(text),
            State::InitialMove
            | State::ClientMessage
            | State::Rotation
            | State::ClientFullPower
            | State::ClientRecharging
            | State::TerminateConnection => Err(SessionError::Logic(format!(
                "no client frame is ever dispatched while in {:?}",
                self.state
            ))),
        }
    }

    fn handle_username(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        self.username = text.as_bytes().to_vec();
        self.state = State::ClientKeyId;
        Ok(vec![ServerReply::KeyRequest])
    }

    fn handle_key_id(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        let key_id: i64 = text
            .parse()
            .map_err(|_| SessionError::Syntax(format!("key id {:?} is not an integer", text)))?;
        let entry = keytable::lookup(key_id).ok_or(SessionError::KeyOutOfRange(key_id))?;

        let server_hash = keytable::hash(&self.username, entry.server_key);
        let client_hash = keytable::hash(&self.username, entry.client_key);
        self.expected_client_hash = client_hash.to_string();

        self.state = State::ClientConfirmation;
        Ok(vec![ServerReply::Confirmation(server_hash)])
    }

    fn handle_confirmation(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        if !text.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
            return Err(SessionError::Syntax(format!(
                "confirmation hash {:?} contains non-digit characters",
                text
            )));
        }

        if text != self.expected_client_hash {
            self.state = State::TerminateConnection;
            return Err(SessionError::LoginFailed);
        }

        // Login succeeded: the protocol sends SERVER_OK immediately followed
        // by SERVER_MOVE, without reading another client frame in between.
        // InitialMove's own handler (a no-op transition to DefineLocation)
        // runs here inline rather than ever being dispatched on its own.
        self.state = State::DefineLocation;
        Ok(vec![ServerReply::Ok, ServerReply::Move])
    }

    fn handle_define_location(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        self.check_numeric_syntax(text)?;
        let pos = parse_position(text)?;
        self.robot.set_location(pos);

        if self.robot.is_at_origin() {
            return Ok(self.pick_up());
        }
        self.state = State::DefineDirection;
        Ok(vec![ServerReply::Move])
    }

    fn handle_define_direction(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        self.check_numeric_syntax(text)?;
        let pos = parse_position(text)?;
        self.robot.set_location(pos);

        if !self.robot.position_changed() {
            self.state = State::Evade;
            return Ok(vec![ServerReply::TurnRight]);
        }
        self.robot.infer_direction_from_motion();

        if self.robot.is_at_origin() {
            return Ok(self.pick_up());
        }

        self.state = State::ClientOk;
        self.robot.calculate_needed_direction();
        if self.robot.is_facing_needed_direction() {
            Ok(vec![ServerReply::Move])
        } else {
            self.robot.rotate_right();
            Ok(vec![ServerReply::TurnRight])
        }
    }

    fn handle_client_ok(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        self.check_numeric_syntax(text)?;
        let pos = parse_position(text)?;
        self.robot.set_location(pos);

        if self.robot.is_at_origin() {
            return Ok(self.pick_up());
        }

        let came_from_move = self.last_reply.map(|r| r.is_move()).unwrap_or(false);
        if !self.robot.position_changed() && came_from_move {
            debug!("obstacle encountered, toggling inverse navigation");
            self.robot.toggle_inverse_navigation();
            self.robot.rotate_right();
            self.state = State::Evade;
            return Ok(vec![ServerReply::TurnRight]);
        }

        self.robot.calculate_needed_direction();
        if self.robot.is_facing_needed_direction() {
            Ok(vec![ServerReply::Move])
        } else {
            self.robot.rotate_right();
            Ok(vec![ServerReply::TurnRight])
        }
    }

    fn handle_evade(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        self.check_numeric_syntax(text)?;
        let pos = parse_position(text)?;
        self.robot.set_location(pos);
        self.state = State::DefineDirection;
        Ok(vec![ServerReply::Move])
    }

    fn handle_logout(&mut self, _text: &str) -> Result<Vec<ServerReply>, SessionError> {
        self.state = State::TerminateConnection;
        Ok(vec![ServerReply::Logout])
    }

    /// Arriving at the origin always resolves straight through `ClientMessage`
    /// into `Logout`, in one step.
    fn pick_up(&mut self) -> Vec<ServerReply> {
        self.state = State::Logout;
        vec![ServerReply::PickUp]
    }

    fn handle_recharging(&mut self, text: &str) -> Result<Vec<ServerReply>, SessionError> {
        if text != "FULL POWER" {
            return Err(SessionError::Logic(format!(
                "expected FULL POWER during recharge, got {:?}",
                text
            )));
        }
        self.state = self.previous_state;
        Ok(Vec::new())
    }

    /// §4.4's conditional syntax rule: a fractional number or more than two
    /// spaces is only a violation when the previous reply was MOVE or
    /// TURN RIGHT (the same reply kinds that ask the robot to report a new
    /// position).
    fn check_numeric_syntax(&self, text: &str) -> Result<(), SessionError> {
        let guarded = self
            .last_reply
            .map(|r| r.is_move() || r.is_turn_right())
            .unwrap_or(false);
        if !guarded {
            return Ok(());
        }
        if contains_digit_dot_digit(text) {
            return Err(SessionError::Syntax(format!(
                "fractional coordinate in {:?}",
                text
            )));
        }
        if text.matches(' ').count() > 2 {
            return Err(SessionError::Syntax(format!(
                "too many spaces in {:?}",
                text
            )));
        }
        Ok(())
    }
}

fn contains_digit_dot_digit(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes
        .windows(3)
        .any(|w| w[0].is_ascii_digit() && w[1] == b'.' && w[2].is_ascii_digit())
}

/// Extracts all signed-integer substrings from `text` and takes the first
/// two, in order, as `(x, y)`.
fn parse_position(text: &str) -> Result<Position, SessionError> {
    let mut numbers = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i] == b'-' {
            i += 1;
        }
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i > digits_start {
            if let Ok(n) = text[start..i].parse::<i32>() {
                numbers.push(n);
                if numbers.len() == 2 {
                    break;
                }
            }
        } else {
            i = start + 1;
        }
    }
    if numbers.len() < 2 {
        return Err(SessionError::Syntax(format!(
            "expected two coordinates in {:?}",
            text
        )));
    }
    Ok(Position::new(numbers[0], numbers[1]))
}
