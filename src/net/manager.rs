//! Listener and session tables.
//!
//! One listener per configured port, sessions keyed by a monotonically
//! increasing id with a hard cap. The manager owns the sockets; the
//! reactor drives readiness and teardown.

use crate::error::HoneypotError;
use crate::net::session::{Session, SessionState};
use crate::types::Protocol;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

pub struct SocketManager {
    listeners: HashMap<u16, TcpListener>,
    sessions: HashMap<u64, Session>,
    next_id: u64,
    max_sessions: usize,
}

impl SocketManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            sessions: HashMap::new(),
            next_id: 0,
            max_sessions,
        }
    }

    /// Bind a listener on `0.0.0.0:port`. The port must map to a known
    /// protocol and must not already be bound.
    pub async fn bind(&mut self, port: u16) -> Result<(), HoneypotError> {
        if self.listeners.contains_key(&port) {
            return Err(HoneypotError::InvalidArg("port already bound"));
        }
        let proto =
            Protocol::classify(port).ok_or(HoneypotError::InvalidArg("port has no protocol"))?;
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        info!("Listening on 0.0.0.0:{} ({})", port, proto);
        self.listeners.insert(port, listener);
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listeners(&self) -> impl Iterator<Item = (&u16, &TcpListener)> {
        self.listeners.iter()
    }

    pub fn can_accept(&self) -> bool {
        self.sessions.len() < self.max_sessions
    }

    /// Adjust the session cap. Existing sessions are unaffected; only
    /// admission of new arrivals changes.
    pub fn set_max_sessions(&mut self, max: usize) {
        self.max_sessions = max;
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> impl Iterator<Item = (&u64, &Session)> {
        self.sessions.iter()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = (&u64, &mut Session)> {
        self.sessions.iter_mut()
    }

    /// Register an accepted connection. Fails with `Capacity` at the cap;
    /// the stream is dropped (closed) in that case.
    pub fn add_session(
        &mut self,
        stream: TcpStream,
        port: u16,
        peer_ip: IpAddr,
    ) -> Result<u64, HoneypotError> {
        if !self.can_accept() {
            return Err(HoneypotError::Capacity("session table full"));
        }
        let proto =
            Protocol::classify(port).ok_or(HoneypotError::InvalidArg("port has no protocol"))?;
        let id = self.next_id;
        self.next_id += 1;
        self.sessions
            .insert(id, Session::new(id, stream, port, proto, peer_ip));
        Ok(id)
    }

    /// Close and drop a session. Dropping the `TcpStream` releases the
    /// socket.
    pub fn remove_session(&mut self, id: u64) {
        if let Some(mut session) = self.sessions.remove(&id) {
            session.state = SessionState::Closed;
            debug!(
                "Session {} closed ({}:{} from {})",
                id, session.proto, session.port, session.peer_ip
            );
        }
    }

    /// Close sessions idle for at least `timeout`. Returns the number
    /// closed.
    pub fn sweep_idle(&mut self, timeout: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<u64> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.idle_for(now) >= timeout)
            .map(|(&id, _)| id)
            .collect();
        for id in &stale {
            self.remove_session(*id);
        }
        stale.len()
    }

    pub fn close_all(&mut self) {
        let sessions = self.sessions.len();
        self.sessions.clear();
        self.listeners.clear();
        if sessions > 0 {
            info!("Closed {} sessions and all listeners", sessions);
        }
    }
}
