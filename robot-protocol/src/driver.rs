//! ## CONNECTION DRIVER
//!
//! The outer loop that sequences Framer -> Session -> transport write for
//! one connection, switches the read timeout in and out of the recharge
//! window, and closes the socket on every terminal path.

use std::io::Write as _;
use std::time::Duration;

use tracing::{info, warn};

use crate::framer;
use crate::session::{Session, State};
use crate::transport::Transport;

/// The two read timeouts the driver switches between.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub default_timeout: Duration,
    pub recharge_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_timeout: Duration::from_secs(1),
            recharge_timeout: Duration::from_secs(5),
        }
    }
}

/// Drives one session to completion: authenticates, navigates, collects the
/// payload, and logs out, or closes early on any protocol error or timeout.
///
/// Every exit path (normal logout, a framed error, an unframed timeout or
/// I/O failure) falls through to the same `shutdown` call at the end, so
/// the socket is always released regardless of how the loop ends.
pub fn drive_session<T: Transport>(transport: &mut T, config: SessionConfig) {
    let mut session = Session::new();
    let mut current_timeout = config.default_timeout;
    let _ = transport.set_read_timeout(Some(current_timeout));

    loop {
        let outcome = match framer::read_frame(transport, session.state()) {
            Ok(outcome) => outcome,
            Err(err) => {
                report_and_close(transport, &err);
                return;
            }
        };

        let result = session.ingest(&outcome.payload, outcome.entered_mid_read_recharge);
        match result {
            Ok(replies) => {
                for reply in &replies {
                    if transport.write_all(&reply.as_bytes()).is_err() {
                        warn!("failed writing reply, closing connection");
                        let _ = transport.shutdown();
                        return;
                    }
                }
            }
            Err(err) => {
                report_and_close(transport, &err);
                return;
            }
        }

        if session.is_terminated() {
            info!("session ended normally");
            let _ = transport.shutdown();
            return;
        }

        let wanted_timeout = if session.state() == State::ClientRecharging {
            config.recharge_timeout
        } else {
            config.default_timeout
        };
        if wanted_timeout != current_timeout {
            let _ = transport.set_read_timeout(Some(wanted_timeout));
            current_timeout = wanted_timeout;
        }
    }
}

fn report_and_close<T: Transport>(transport: &mut T, err: &crate::error::SessionError) {
    match err.reply_frame() {
        Some(frame) => {
            warn!(error = %err, "closing connection after protocol error");
            let _ = transport.write_all(frame);
        }
        None => {
            info!(error = %err, "closing connection");
        }
    }
    let _ = transport.shutdown();
}
