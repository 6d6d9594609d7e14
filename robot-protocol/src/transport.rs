//! ## TRANSPORT
//!
//! Abstracts over a connected, byte-oriented duplex stream with a settable
//! read timeout, so [`crate::driver::drive_session`] can be exercised
//! against an in-memory double in tests as well as a real `TcpStream`.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// A connected stream the driver can read frames from and write replies to.
pub trait Transport: Read + Write {
    /// Sets (or clears, with `None`) the timeout applied to subsequent
    /// reads. Used to switch between the default and recharge timeouts.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Closes both halves of the connection. Errors are not actionable by
    /// the caller at this point and are ignored by `drive_session`.
    fn shutdown(&mut self) -> std::io::Result<()>;
}

impl Transport for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// An in-memory [`Transport`] double: reads drain `inbound` byte by
    /// byte, writes append to `outbound`. Read timeouts are simulated by
    /// returning `WouldBlock` once `inbound` runs dry.
    pub struct MockTransport {
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
        pub last_timeout: Option<Duration>,
    }

    impl MockTransport {
        pub fn with_script(bytes: &[u8]) -> Self {
            MockTransport {
                inbound: bytes.iter().copied().collect(),
                outbound: Vec::new(),
                last_timeout: None,
            }
        }
    }

    impl Read for MockTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            match self.inbound.pop_front() {
                Some(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                None => Err(io::Error::new(io::ErrorKind::WouldBlock, "no more bytes scripted")),
            }
        }
    }

    impl Write for MockTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MockTransport {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.last_timeout = timeout;
            Ok(())
        }

        fn shutdown(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
