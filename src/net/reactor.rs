//! The honeypot supervisor: a single task multiplexing every listener and
//! session.
//!
//! Each loop iteration waits (with a 1 s ceiling) for any listener or
//! session readiness, handles at most one arrival, drains every session
//! with non-blocking reads, drives the protocol handlers, flushes queued
//! replies, and runs the idle sweep on its own cadence. Shutdown is the
//! loop observing `running == false` on its next pass.
//!
//! Session-scoped errors never escape the loop; they close the offending
//! session only.

use crate::config::{HoneypotConfig, CLEANUP_INTERVAL_MS, READ_CHUNK_SIZE};
use crate::error::HoneypotError;
use crate::logger::{AttackLogger, LoggerStats};
use crate::net::manager::SocketManager;
use crate::net::session::{Session, SessionState};
use crate::rate_limit::RateLimiter;
use crate::services;
use crate::stats::{HoneypotStats, StatsSnapshot};
use crate::types::AttackRecord;
use futures::future::select_all;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Multiplex wait ceiling; keeps the sweep and shutdown checks live even
/// on a silent network.
const WAIT_CEILING: Duration = Duration::from_secs(1);

/// Tail yield per iteration.
const TAIL_YIELD: Duration = Duration::from_millis(10);

enum Wake {
    /// A listener produced (or failed to produce) a connection.
    Incoming(u16, io::Result<(TcpStream, SocketAddr)>),
    /// Some session became readable or writable.
    Session,
    /// Ceiling elapsed with nothing ready.
    Tick,
}

/// Cheap clone handed to the monitor task and the shutdown path.
#[derive(Clone)]
pub struct HoneypotHandle {
    running: Arc<AtomicBool>,
    stats: Arc<HoneypotStats>,
}

impl HoneypotHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

pub struct Honeypot {
    config: HoneypotConfig,
    manager: SocketManager,
    limiter: RateLimiter,
    logger: AttackLogger,
    stats: Arc<HoneypotStats>,
    running: Arc<AtomicBool>,
}

impl Honeypot {
    /// Validate the configuration and open the log store. A storage
    /// failure here is persistent: the honeypot refuses to start.
    pub fn new(config: HoneypotConfig) -> Result<Self, HoneypotError> {
        config.validate()?;
        let logger = AttackLogger::open(&config.data_dir)?;
        let manager = SocketManager::new(config.max_connections);
        info!(
            "Honeypot initialized ({} records carried over)",
            logger.count()
        );
        Ok(Self {
            manager,
            limiter: RateLimiter::new(),
            logger,
            stats: Arc::new(HoneypotStats::new()),
            running: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn handle(&self) -> HoneypotHandle {
        HoneypotHandle {
            running: self.running.clone(),
            stats: self.stats.clone(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        info!("Resetting statistics");
        self.stats.reset();
    }

    pub fn config(&self) -> &HoneypotConfig {
        &self.config
    }

    /// Replace the configuration. Refused while the reactor runs.
    pub fn set_config(&mut self, config: HoneypotConfig) -> Result<(), HoneypotError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(HoneypotError::Busy);
        }
        config.validate()?;
        self.manager.set_max_sessions(config.max_connections);
        self.config = config;
        info!("Configuration updated");
        Ok(())
    }

    /// Newest-first view of captured records.
    pub fn recent(&self, n: usize) -> Vec<AttackRecord> {
        self.logger.recent(n)
    }

    pub fn log_count(&self) -> usize {
        self.logger.count()
    }

    pub fn logger_stats(&self) -> LoggerStats {
        self.logger.stats()
    }

    pub fn clear_logs(&mut self) -> Result<(), HoneypotError> {
        self.logger.clear()
    }

    /// Bring up the listeners and run the event loop until stopped.
    pub async fn run(&mut self) -> Result<(), HoneypotError> {
        let ports = self.config.ports.clone();
        for port in ports {
            if let Err(e) = self.manager.bind(port).await {
                error!("Failed to create listener for port {}: {}", port, e);
            }
        }
        if self.manager.listener_count() == 0 {
            return Err(HoneypotError::Capacity("no listeners could be bound"));
        }

        self.running.store(true, Ordering::SeqCst);
        info!(
            "Honeypot running on {} of {} configured ports",
            self.manager.listener_count(),
            self.config.ports.len()
        );

        let sweep_interval = Duration::from_millis(CLEANUP_INTERVAL_MS);
        let idle_timeout = Duration::from_millis(self.config.connection_timeout_ms);
        let mut last_sweep = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            if let Wake::Incoming(port, result) = self.wait_ready().await {
                self.on_incoming(port, result);
            }

            self.pump_sessions();

            if last_sweep.elapsed() >= sweep_interval {
                let closed = self.manager.sweep_idle(idle_timeout);
                if closed > 0 {
                    info!("Cleaned up {} stale sessions", closed);
                }
                last_sweep = Instant::now();
            }

            tokio::time::sleep(TAIL_YIELD).await;
        }

        self.manager.close_all();
        info!("Honeypot stopped");
        Ok(())
    }

    /// Wait for any readiness with a 1 s ceiling. Accept futures and
    /// readiness probes only borrow the sockets, so the losers of the
    /// race are dropped without losing state.
    async fn wait_ready(&self) -> Wake {
        let mut waits: Vec<Pin<Box<dyn Future<Output = Wake> + Send + '_>>> = Vec::new();

        for (&port, listener) in self.manager.listeners() {
            waits.push(Box::pin(async move {
                Wake::Incoming(port, listener.accept().await)
            }));
        }
        for (_, session) in self.manager.sessions() {
            let interest = if session.has_pending_reply() {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };
            waits.push(Box::pin(async move {
                let _ = session.stream.ready(interest).await;
                Wake::Session
            }));
        }

        if waits.is_empty() {
            tokio::time::sleep(WAIT_CEILING).await;
            return Wake::Tick;
        }
        match timeout(WAIT_CEILING, select_all(waits)).await {
            Ok((wake, _, _)) => wake,
            Err(_) => Wake::Tick,
        }
    }

    /// Admission control: rate limiter first, then capacity. A rejected
    /// arrival is closed before any byte is read.
    fn on_incoming(&mut self, port: u16, result: io::Result<(TcpStream, SocketAddr)>) {
        let (stream, peer) = match result {
            Ok(pair) => pair,
            Err(e) => {
                warn!("accept failed on port {}: {}", port, e);
                return;
            }
        };
        let ip = peer.ip();

        if !self.limiter.check(ip) {
            warn!("Rate limiting connection from {}", ip);
            self.stats.record_rate_limited();
            return;
        }
        if !self.manager.can_accept() {
            warn!("Max connections reached, rejecting {}", ip);
            return;
        }
        match self.manager.add_session(stream, port, ip) {
            Ok(_) => {
                self.stats.record_connection();
                info!("New connection from {} on port {}", ip, port);
            }
            Err(e) => warn!("Failed to add connection from {}: {}", ip, e),
        }
    }

    /// Drain every session: flush queued replies, read what is available,
    /// drive the handler, and tear down finished sessions.
    fn pump_sessions(&mut self) {
        let mut finished: Vec<u64> = Vec::new();
        let mut captured: Vec<AttackRecord> = Vec::new();

        for (&id, session) in self.manager.sessions_mut() {
            if flush_reply(session).is_err() {
                finished.push(id);
                continue;
            }
            if session.state == SessionState::Closing {
                if !session.has_pending_reply() {
                    finished.push(id);
                }
                continue;
            }

            // One bounded chunk per pass; a flooding peer cannot starve
            // the other sessions.
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let mut got_bytes = false;
            match session.stream.try_read(&mut chunk) {
                Ok(0) => {
                    session.state = SessionState::Closing;
                }
                Ok(n) => {
                    session.touch();
                    if session.push_bytes(&chunk[..n]) > 0 {
                        got_bytes = true;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    debug!("Read error on session {}: {}", id, e);
                    finished.push(id);
                    continue;
                }
            }

            if got_bytes && session.state == SessionState::Active {
                let ctx = session.context();
                let buffer_full = session.budget_exhausted();
                let out =
                    services::on_data(&mut session.handler, &ctx, &session.buffer, buffer_full);
                session.consume(out.consumed);
                if !out.reply.is_empty() {
                    session.queue_reply(&out.reply);
                }
                if let Some(record) = out.record {
                    captured.push(record);
                }
                if out.close {
                    session.state = SessionState::Closing;
                }
            }

            if flush_reply(session).is_err() {
                finished.push(id);
                continue;
            }
            if session.state == SessionState::Closing && !session.has_pending_reply() {
                finished.push(id);
            }
        }

        for id in finished {
            self.manager.remove_session(id);
        }

        for record in captured {
            self.stats.record_attack(record.service);
            if self.config.enable_logging {
                self.logger.log(record);
            }
        }
    }
}

/// Write as much of the queued reply as the socket accepts right now.
fn flush_reply(session: &mut Session) -> io::Result<()> {
    while session.has_pending_reply() {
        match session.stream.try_write(&session.reply_buffer) {
            Ok(n) => {
                session.reply_buffer.drain(..n);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
