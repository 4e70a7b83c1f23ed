//! FTP control-channel emulation.
//!
//! Commands are CRLF-terminated `CMD [ARG]` pairs. USER stashes the
//! username, PASS rejects the login and captures the pair, QUIT says
//! goodbye (capturing a record if a username was seen), everything else
//! is not implemented.

use super::{next_line, HandlerOutput, SessionContext};
use crate::types::{bounded, payload_hash, AttackRecord, Protocol, MAX_CRED_LEN};

#[derive(Debug, Default)]
pub struct FtpState {
    username: Option<String>,
}

pub fn on_data(state: &mut FtpState, ctx: &SessionContext, buf: &[u8]) -> HandlerOutput {
    let mut reply = Vec::new();
    let mut consumed = 0;

    while let Some((line, used)) = next_line(&buf[consumed..]) {
        consumed += used;
        let (cmd, arg) = split_command(&line);

        match cmd.as_str() {
            "USER" => {
                let user = bounded(&arg, MAX_CRED_LEN);
                reply.extend_from_slice(format!("331 Password required for {}\r\n", user).as_bytes());
                state.username = Some(user);
            }
            "PASS" => {
                reply.extend_from_slice(b"530 Login incorrect\r\n");
                let record = AttackRecord::new(&ctx.peer_ip, ctx.port, Protocol::Ftp)
                    .with_username(state.username.as_deref().unwrap_or(""))
                    .with_password(&arg)
                    .with_payload_hash(payload_hash(buf));
                return HandlerOutput {
                    reply,
                    record: Some(record),
                    close: true,
                    consumed,
                };
            }
            "QUIT" => {
                reply.extend_from_slice(b"221 Goodbye\r\n");
                let record = state.username.take().map(|user| {
                    AttackRecord::new(&ctx.peer_ip, ctx.port, Protocol::Ftp)
                        .with_username(&user)
                        .with_payload_hash(payload_hash(buf))
                });
                return HandlerOutput {
                    reply,
                    record,
                    close: true,
                    consumed,
                };
            }
            _ => {
                reply.extend_from_slice(b"502 Command not implemented\r\n");
            }
        }
    }

    HandlerOutput {
        reply,
        record: None,
        close: false,
        consumed,
    }
}

/// Uppercase verb plus trimmed argument remainder.
fn split_command(line: &str) -> (String, String) {
    match line.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_ascii_uppercase(), arg.trim().to_string()),
        None => (line.to_ascii_uppercase(), String::new()),
    }
}
