//! Per-connection session state.

use crate::config::MAX_PAYLOAD_SIZE;
use crate::services::{self, HandlerState, SessionContext};
use crate::types::Protocol;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Session lifecycle.
///
/// ```text
/// accept ──► Active ──handler/timeout/error──► Closing ──reply drained──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Greeting queued, traffic flowing.
    Active,
    /// Teardown requested; pending reply drains best-effort.
    Closing,
    /// Socket released; the entry is removed.
    Closed,
}

pub struct Session {
    pub id: u64,
    pub stream: TcpStream,
    pub port: u16,
    pub proto: Protocol,
    pub peer_ip: IpAddr,
    pub opened_at: Instant,
    pub last_active: Instant,
    /// Total inbound bytes accepted, capped at `MAX_PAYLOAD_SIZE`.
    pub bytes_in: usize,
    pub state: SessionState,
    pub handler: HandlerState,
    /// Accumulated inbound bytes awaiting the handler.
    pub buffer: Vec<u8>,
    /// Outbound bytes not yet written.
    pub reply_buffer: Vec<u8>,
}

impl Session {
    pub fn new(id: u64, stream: TcpStream, port: u16, proto: Protocol, peer_ip: IpAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            stream,
            port,
            proto,
            peer_ip,
            opened_at: now,
            last_active: now,
            bytes_in: 0,
            state: SessionState::Active,
            handler: HandlerState::new(proto),
            buffer: Vec::new(),
            reply_buffer: services::greeting(proto),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_active)
    }

    /// Accept inbound bytes up to the session byte budget; the overflow
    /// is discarded. Returns the number of bytes accepted.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> usize {
        let room = MAX_PAYLOAD_SIZE.saturating_sub(self.bytes_in);
        let accept = chunk.len().min(room);
        self.buffer.extend_from_slice(&chunk[..accept]);
        self.bytes_in += accept;
        accept
    }

    /// No more inbound bytes will be accepted.
    pub fn budget_exhausted(&self) -> bool {
        self.bytes_in >= MAX_PAYLOAD_SIZE
    }

    pub fn has_pending_reply(&self) -> bool {
        !self.reply_buffer.is_empty()
    }

    pub fn queue_reply(&mut self, bytes: &[u8]) {
        self.reply_buffer.extend_from_slice(bytes);
    }

    /// Drop `n` processed bytes from the front of the inbound buffer.
    pub fn consume(&mut self, n: usize) {
        self.buffer.drain(..n.min(self.buffer.len()));
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            peer_ip: self.peer_ip.to_string(),
            port: self.port,
        }
    }
}
