//! Service emulation layer.
//!
//! Each handler is a pure function over the session's accumulated inbound
//! buffer: it may produce reply bytes, at most one [`AttackRecord`], a
//! close request, and the number of buffer bytes it consumed. Handlers
//! never perform I/O and never retain references to session memory.

pub mod ftp;
pub mod http;
pub mod mqtt;
pub mod telnet;

use crate::config::{FTP_BANNER, TELNET_BANNER, TELNET_LOGIN_PROMPT};
use crate::types::{AttackRecord, Protocol};

/// Read-only session facts handlers need for record construction.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub peer_ip: String,
    pub port: u16,
}

/// Result of one handler invocation.
#[derive(Debug, Default)]
pub struct HandlerOutput {
    /// Bytes to queue for the peer.
    pub reply: Vec<u8>,
    /// Captured attempt, if one completed.
    pub record: Option<AttackRecord>,
    /// Close the session once the reply has drained.
    pub close: bool,
    /// Inbound buffer bytes processed; the session drains them.
    pub consumed: usize,
}

impl HandlerOutput {
    /// Nothing yet: wait for more bytes.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Close without a reply or record (malformed traffic).
    pub fn close_silent(consumed: usize) -> Self {
        Self {
            close: true,
            consumed,
            ..Self::default()
        }
    }
}

/// Per-protocol handler state held by a session.
#[derive(Debug)]
pub enum HandlerState {
    Http(http::HttpState),
    Telnet(telnet::TelnetState),
    Ftp(ftp::FtpState),
    Mqtt(mqtt::MqttState),
}

impl HandlerState {
    pub fn new(proto: Protocol) -> Self {
        match proto {
            Protocol::Http => HandlerState::Http(http::HttpState::default()),
            Protocol::Telnet => HandlerState::Telnet(telnet::TelnetState::default()),
            Protocol::Ftp => HandlerState::Ftp(ftp::FtpState::default()),
            Protocol::Mqtt => HandlerState::Mqtt(mqtt::MqttState::default()),
        }
    }
}

/// Bytes sent to the peer immediately after accept.
pub fn greeting(proto: Protocol) -> Vec<u8> {
    match proto {
        Protocol::Http | Protocol::Mqtt => Vec::new(),
        Protocol::Telnet => {
            let mut banner = TELNET_BANNER.as_bytes().to_vec();
            banner.extend_from_slice(TELNET_LOGIN_PROMPT.as_bytes());
            banner
        }
        Protocol::Ftp => FTP_BANNER.as_bytes().to_vec(),
    }
}

/// Drive the protocol state machine over the accumulated buffer.
///
/// `buffer_full` tells line/frame parsers that no further inbound bytes
/// will be accepted, so waiting for more data is pointless.
pub fn on_data(
    state: &mut HandlerState,
    ctx: &SessionContext,
    buf: &[u8],
    buffer_full: bool,
) -> HandlerOutput {
    match state {
        HandlerState::Http(s) => http::on_data(s, ctx, buf, buffer_full),
        HandlerState::Telnet(s) => telnet::on_data(s, ctx, buf),
        HandlerState::Ftp(s) => ftp::on_data(s, ctx, buf),
        HandlerState::Mqtt(s) => mqtt::on_data(s, ctx, buf, buffer_full),
    }
}

/// Split the next line (terminated by `\n`, optional `\r`) off `buf`.
/// Returns the trimmed line and the index one past the terminator.
pub(crate) fn next_line(buf: &[u8]) -> Option<(String, usize)> {
    let nl = buf.iter().position(|&b| b == b'\n')?;
    let line = String::from_utf8_lossy(&buf[..nl]);
    Some((line.trim().to_string(), nl + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greetings() {
        assert!(greeting(Protocol::Http).is_empty());
        assert!(greeting(Protocol::Mqtt).is_empty());
        assert_eq!(
            greeting(Protocol::Telnet),
            b"\r\nWelcome to Device Login\r\n\r\nlogin: ".to_vec()
        );
        assert_eq!(greeting(Protocol::Ftp), b"220 FTP Server Ready\r\n".to_vec());
    }

    #[test]
    fn test_next_line_trims_crlf() {
        let (line, used) = next_line(b"root\r\nrest").unwrap();
        assert_eq!(line, "root");
        assert_eq!(used, 6);
        assert!(next_line(b"no terminator").is_none());
    }
}
