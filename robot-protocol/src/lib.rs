//! Core protocol library for the robot navigation server: frame parsing,
//! the authentication handshake, the per-connection session state machine,
//! and the navigation algorithm that walks a robot to the origin.
//!
//! The binary crate (`robot-server`) is a thin driver over
//! [`driver::drive_session`]: it owns the listening socket and the
//! thread-per-connection worker pool, and leaves everything protocol-shaped
//! to this crate.

pub mod driver;
pub mod error;
pub mod framer;
pub mod keytable;
pub mod robot;
pub mod session;
pub mod transport;

pub use driver::{drive_session, SessionConfig};
pub use error::SessionError;
pub use session::{Session, ServerReply, State};
pub use transport::Transport;
