//! Attack log store: bounded in-memory ring plus durable mirror.
//!
//! The ring keeps the most recent `MAX_LOG_ENTRIES` records for fast
//! `recent()` queries; every record is also appended to the flash mirror.
//! A mirror append failure never fails `log()` — the in-memory record is
//! retained and the failure is counted.

use crate::config::MAX_LOG_ENTRIES;
use crate::error::HoneypotError;
use crate::flash::FlashStore;
use crate::types::{now, AttackRecord};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerStats {
    pub total_logged: u64,
    pub last_log_time: u64,
    pub flash_errors: u64,
    pub start_time: u64,
}

pub struct AttackLogger {
    ring: Vec<Option<AttackRecord>>,
    head: usize,
    count: usize,
    cap: usize,
    flash: FlashStore,
    total_logged: u64,
    last_log_time: u64,
    flash_errors: u64,
    start_time: u64,
}

impl AttackLogger {
    /// Open the store, loading prior records from the mirror best-effort.
    /// Mirror open failure is persistent and propagates.
    pub fn open(dir: &Path) -> Result<Self, HoneypotError> {
        Self::with_store(FlashStore::open(dir)?, MAX_LOG_ENTRIES)
    }

    pub(crate) fn with_store(flash: FlashStore, cap: usize) -> Result<Self, HoneypotError> {
        let mut loaded = flash.load(cap);
        loaded.reverse(); // oldest first, so ring order matches arrival order

        let mut ring = vec![None; cap];
        let count = loaded.len();
        for (slot, record) in ring.iter_mut().zip(loaded) {
            *slot = Some(record);
        }
        if count > 0 {
            info!("Loaded {} records from log mirror", count);
        }

        Ok(Self {
            ring,
            head: count % cap,
            count,
            cap,
            flash,
            total_logged: 0,
            last_log_time: 0,
            flash_errors: 0,
            start_time: now(),
        })
    }

    /// Append a record: ring first, then mirror, then console line.
    pub fn log(&mut self, record: AttackRecord) {
        if let Err(e) = self.flash.append(&record) {
            self.flash_errors += 1;
            warn!("Mirror append failed (record kept in memory): {}", e);
        }

        self.console_line(&record);

        self.ring[self.head] = Some(record);
        self.head = (self.head + 1) % self.cap;
        if self.count < self.cap {
            self.count += 1;
        }

        self.total_logged += 1;
        self.last_log_time = now();
    }

    /// Newest-first copy of the last `min(n, count)` records. Walking
    /// backward from `head` lands on the newest record first whether or
    /// not the ring has wrapped.
    pub fn recent(&self, n: usize) -> Vec<AttackRecord> {
        let take = self.count.min(n);
        let mut out = Vec::with_capacity(take);
        let mut idx = self.head;
        for _ in 0..take {
            idx = if idx == 0 { self.cap - 1 } else { idx - 1 };
            if let Some(record) = &self.ring[idx] {
                out.push(record.clone());
            }
        }
        out
    }

    /// Drop all records, in memory and mirrored. Preserves `start_time`.
    pub fn clear(&mut self) -> Result<(), HoneypotError> {
        info!("Clearing all attack logs");
        self.ring.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.count = 0;
        self.total_logged = 0;
        self.last_log_time = 0;
        self.flash.clear()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn stats(&self) -> LoggerStats {
        LoggerStats {
            total_logged: self.total_logged,
            last_log_time: self.last_log_time,
            flash_errors: self.flash_errors,
            start_time: self.start_time,
        }
    }

    fn console_line(&self, record: &AttackRecord) {
        let time = DateTime::<Utc>::from_timestamp(record.timestamp as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        info!(
            "Attack logged: [{}] {} -> {}:{} | User: {} | Pass: {} | Hash: {}",
            time,
            record.source_ip,
            record.service,
            record.target_port,
            record.username,
            record.password,
            record.payload_hash
        );
    }
}
