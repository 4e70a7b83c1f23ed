//! Durable mirror of the attack log.
//!
//! Append-only JSON-lines file capped at `FLASH_LOG_SIZE` bytes. On
//! overflow the file is rotated in place by dropping the oldest half of
//! its lines. Reload parses newest-first and skips lines that fail to
//! parse, so a torn tail write costs at most one record.

use crate::config::FLASH_LOG_SIZE;
use crate::error::HoneypotError;
use crate::types::AttackRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Mirror file name inside the data directory.
const MIRROR_FILE: &str = "attacks.jsonl";

/// Reject mirror files grossly over the cap before parsing. The file is
/// self-capped; anything larger was written by someone else.
const MAX_LOAD_SIZE: u64 = FLASH_LOG_SIZE * 4;

pub struct FlashStore {
    path: PathBuf,
    max_bytes: u64,
}

impl FlashStore {
    /// Open (creating if needed) the mirror in `dir`. Failure here is a
    /// persistent storage error and aborts honeypot startup.
    pub fn open(dir: &Path) -> Result<Self, HoneypotError> {
        fs::create_dir_all(dir)
            .map_err(|e| HoneypotError::Storage(format!("create {}: {}", dir.display(), e)))?;
        let path = dir.join(MIRROR_FILE);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HoneypotError::Storage(format!("open {}: {}", path.display(), e)))?;
        Ok(Self {
            path,
            max_bytes: FLASH_LOG_SIZE,
        })
    }

    #[cfg(test)]
    pub fn with_cap(dir: &Path, max_bytes: u64) -> Result<Self, HoneypotError> {
        let mut store = Self::open(dir)?;
        store.max_bytes = max_bytes;
        Ok(store)
    }

    /// Append one record. Rotates first when the line would push the file
    /// over the cap.
    pub fn append(&self, record: &AttackRecord) -> Result<(), HoneypotError> {
        let line = record.to_json()?;
        let current = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if current + line.len() as u64 + 1 > self.max_bytes {
            self.rotate()?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Best-effort load of up to `max` records, newest first.
    pub fn load(&self, max: usize) -> Vec<AttackRecord> {
        let size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if size > MAX_LOAD_SIZE {
            warn!(
                "Mirror {} is {} bytes (cap {}), refusing to load",
                self.path.display(),
                size,
                MAX_LOAD_SIZE
            );
            return Vec::new();
        }
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read mirror {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for line in contents.lines().rev() {
            if records.len() >= max {
                break;
            }
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AttackRecord>(line) {
                Ok(rec) => records.push(rec),
                Err(e) => debug!("Skipping unparseable mirror line: {}", e),
            }
        }
        records
    }

    /// Truncate the mirror.
    pub fn clear(&self) -> Result<(), HoneypotError> {
        fs::write(&self.path, b"")?;
        info!("Cleared log mirror {}", self.path.display());
        Ok(())
    }

    pub fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Drop the oldest half of the file's lines.
    fn rotate(&self) -> Result<(), HoneypotError> {
        let contents = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = contents.lines().collect();
        let keep_from = lines.len() / 2;
        let mut kept = String::new();
        for line in &lines[keep_from..] {
            kept.push_str(line);
            kept.push('\n');
        }
        fs::write(&self.path, kept.as_bytes())?;
        info!(
            "Rotated log mirror: dropped {} of {} lines",
            keep_from,
            lines.len()
        );
        Ok(())
    }
}
