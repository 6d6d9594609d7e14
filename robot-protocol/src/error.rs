//! ## ERROR TAXONOMY
//!
//! Every fallible step of a session boils down to one of these variants.
//! Four of them have a literal reply frame defined by the protocol; the
//! other two (`Timeout`, `Io`) end the connection without one.

use std::io;

use thiserror::Error;

/// The set of ways ingesting a client message, or servicing a connection,
/// can fail.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The frame violated the message's expected grammar (wrong field count,
    /// non-numeric coordinate, stray decimal point, and so on).
    #[error("syntax error: {0}")]
    Syntax(String),

    /// `ClientKeyId` named an index outside `0..=4`.
    #[error("key id {0} out of range")]
    KeyOutOfRange(i64),

    /// The client's confirmation hash didn't match the one computed from the
    /// username and the server's key.
    #[error("login failed")]
    LoginFailed,

    /// A message arrived that made no sense in the current state (e.g.
    /// `FULL POWER` while not recharging).
    #[error("logic error: {0}")]
    Logic(String),

    /// No frame arrived before the per-state read deadline elapsed.
    #[error("timed out waiting for client")]
    Timeout,

    /// The underlying transport failed outright.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// The literal frame the protocol defines for this error, if any.
    /// `Timeout` and `Io` have none: both simply end the connection.
    pub fn reply_frame(&self) -> Option<&'static [u8]> {
        match self {
            SessionError::LoginFailed => Some(b"300 LOGIN FAILED\a\b"),
            SessionError::Logic(_) => Some(b"302 LOGIC ERROR\a\b"),
            SessionError::Syntax(_) => Some(b"301 SYNTAX ERROR\a\b"),
            SessionError::KeyOutOfRange(_) => Some(b"303 KEY OUT OF RANGE\a\b"),
            SessionError::Timeout | SessionError::Io(_) => None,
        }
    }
}
