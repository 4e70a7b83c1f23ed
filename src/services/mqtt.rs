//! MQTT broker emulation.
//!
//! Parses the fixed header (packet type + varint remaining length) and,
//! for CONNECT, the variable header and payload fields in wire order:
//! ClientID, optional Will topic/message, optional username, optional
//! password. The reply is always a CONNACK with return code 0x05 (Not
//! Authorized). Malformed framing closes the session without a reply or
//! record, so scanners get no amplification signal.

use super::{HandlerOutput, SessionContext};
use crate::config::{MAX_PAYLOAD_SIZE, MQTT_CONNACK};
use crate::types::{payload_hash, AttackRecord, Protocol};
use tracing::debug;

/// CONNECT packet type in the fixed-header high nibble.
const PACKET_TYPE_CONNECT: u8 = 1;

// Connect flag bits.
const FLAG_USERNAME: u8 = 0x80;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_WILL: u8 = 0x04;

#[derive(Debug, Default)]
pub struct MqttState;

pub fn on_data(
    _state: &mut MqttState,
    ctx: &SessionContext,
    buf: &[u8],
    buffer_full: bool,
) -> HandlerOutput {
    let frame_len = match frame_length(buf) {
        Framing::Complete(len) => len,
        Framing::Partial => {
            if buffer_full {
                debug!("MQTT frame from {} exceeds byte budget", ctx.peer_ip);
                return HandlerOutput::close_silent(buf.len());
            }
            return HandlerOutput::pending();
        }
        Framing::Malformed => {
            debug!("Malformed MQTT framing from {}", ctx.peer_ip);
            return HandlerOutput::close_silent(buf.len());
        }
    };

    let packet_type = buf[0] >> 4;
    if packet_type != PACKET_TYPE_CONNECT {
        debug!(
            "Unexpected MQTT packet type {} from {}",
            packet_type, ctx.peer_ip
        );
        return HandlerOutput::close_silent(buf.len());
    }

    let Some(connect) = parse_connect(&buf[..frame_len]) else {
        debug!("Malformed MQTT CONNECT from {}", ctx.peer_ip);
        return HandlerOutput::close_silent(buf.len());
    };

    let record = AttackRecord::new(&ctx.peer_ip, ctx.port, Protocol::Mqtt)
        .with_username(&connect.username)
        .with_password(&connect.password)
        .with_payload_hash(payload_hash(buf))
        .with_metadata(&format!("ClientID: {}", connect.client_id));

    HandlerOutput {
        reply: MQTT_CONNACK.to_vec(),
        record: Some(record),
        close: true,
        consumed: frame_len,
    }
}

enum Framing {
    Complete(usize),
    Partial,
    Malformed,
}

/// Total frame length from the fixed header, or Partial while the varint
/// or body is still in flight. A remaining length that can never fit the
/// session byte budget is malformed: it cannot complete.
fn frame_length(buf: &[u8]) -> Framing {
    if buf.len() < 2 {
        return Framing::Partial;
    }

    let mut remaining: usize = 0;
    let mut shift = 0;
    let mut used = 0;
    for (i, &byte) in buf[1..].iter().take(4).enumerate() {
        remaining |= ((byte & 0x7F) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            used = i + 1;
            break;
        }
        if i == 3 {
            return Framing::Malformed; // continuation bit on the 4th byte
        }
    }
    if used == 0 {
        return Framing::Partial; // varint incomplete
    }

    let total = 1 + used + remaining;
    if total > MAX_PAYLOAD_SIZE {
        return Framing::Malformed;
    }
    if buf.len() < total {
        return Framing::Partial;
    }
    Framing::Complete(total)
}

struct ConnectFields {
    client_id: String,
    username: String,
    password: String,
}

/// Walk the variable header and payload; any out-of-bounds read means a
/// malformed packet.
fn parse_connect(frame: &[u8]) -> Option<ConnectFields> {
    // Skip the fixed header.
    let mut pos = 1;
    while frame.get(pos)? & 0x80 != 0 {
        pos += 1;
    }
    pos += 1;
    let mut cursor = Cursor {
        buf: frame,
        pos,
    };

    let _protocol_name = cursor.take_lp_bytes()?;
    let _protocol_level = cursor.take_u8()?;
    let flags = cursor.take_u8()?;
    let _keepalive = cursor.take_u16()?;

    let client_id = cursor.take_lp_string()?;
    if flags & FLAG_WILL != 0 {
        let _will_topic = cursor.take_lp_bytes()?;
        let _will_message = cursor.take_lp_bytes()?;
    }
    let username = if flags & FLAG_USERNAME != 0 {
        cursor.take_lp_string()?
    } else {
        String::new()
    };
    let password = if flags & FLAG_PASSWORD != 0 {
        cursor.take_lp_string()?
    } else {
        String::new()
    };

    Some(ConnectFields {
        client_id,
        username,
        password,
    })
}

/// Bounds-checked reader over one frame.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take_u8(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take_u16(&mut self) -> Option<u16> {
        let hi = self.take_u8()?;
        let lo = self.take_u8()?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    fn take_lp_bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.take_u16()? as usize;
        let end = self.pos.checked_add(len)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn take_lp_string(&mut self) -> Option<String> {
        let bytes = self.take_lp_bytes()?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}
