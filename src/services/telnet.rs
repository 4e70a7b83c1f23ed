//! Telnet login emulation.
//!
//! The greeting and `login: ` prompt are queued at accept time. Input is
//! line-oriented: the first line is taken as the username, the second as
//! the password, after which the login is rejected and the session closes
//! with one captured record.

use super::{next_line, HandlerOutput, SessionContext};
use crate::config::TELNET_PASSWORD_PROMPT;
use crate::types::{payload_hash, AttackRecord, Protocol};

const LOGIN_INCORRECT: &str = "Login incorrect\r\n";

#[derive(Debug, Default)]
pub struct TelnetState {
    phase: Phase,
    username: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    AwaitUser,
    AwaitPass,
}

pub fn on_data(state: &mut TelnetState, ctx: &SessionContext, buf: &[u8]) -> HandlerOutput {
    let mut reply = Vec::new();
    let mut consumed = 0;

    while let Some((line, used)) = next_line(&buf[consumed..]) {
        consumed += used;
        match state.phase {
            Phase::AwaitUser => {
                state.username = line;
                state.phase = Phase::AwaitPass;
                reply.extend_from_slice(TELNET_PASSWORD_PROMPT.as_bytes());
            }
            Phase::AwaitPass => {
                reply.extend_from_slice(LOGIN_INCORRECT.as_bytes());
                let record = AttackRecord::new(&ctx.peer_ip, ctx.port, Protocol::Telnet)
                    .with_username(&state.username)
                    .with_password(&line)
                    .with_payload_hash(payload_hash(buf));
                return HandlerOutput {
                    reply,
                    record: Some(record),
                    close: true,
                    consumed,
                };
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
