//! Core types: protocol classification, attack records, time and hashing
//! helpers.

use crate::config::PAYLOAD_HASH_LIMIT;
use crate::error::HoneypotError;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

// =============================================================================
// FIELD CAPS
// =============================================================================
// Every string carried in an AttackRecord is bounded. Overflow is truncated
// silently at a char boundary; the JSON output therefore always fits the
// documented caps.

/// Dotted-quad IPv4 plus slack.
pub const MAX_IP_LEN: usize = 16;

/// Username and password cap.
pub const MAX_CRED_LEN: usize = 64;

/// User-Agent header cap.
pub const MAX_USER_AGENT_LEN: usize = 255;

/// Freeform metadata cap.
pub const MAX_METADATA_LEN: usize = 255;

/// Sentinel for credentials that were not extracted.
pub const CRED_NOT_AVAILABLE: &str = "N/A";

// =============================================================================
// PROTOCOL CLASSIFICATION
// =============================================================================

/// Emulated service family. The port set is closed: unknown ports are
/// never listened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Telnet,
    Ftp,
    Mqtt,
}

impl Protocol {
    /// Map a port to its protocol family.
    pub fn classify(port: u16) -> Option<Self> {
        match port {
            80 | 8080 => Some(Protocol::Http),
            23 | 2323 => Some(Protocol::Telnet),
            21 => Some(Protocol::Ftp),
            1883 => Some(Protocol::Mqtt),
            _ => None,
        }
    }

    /// Canonical uppercase name, as carried in records.
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Telnet => "TELNET",
            Protocol::Ftp => "FTP",
            Protocol::Mqtt => "MQTT",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TIME AND HASHING
// =============================================================================

/// Current wall-clock time, UTC seconds. Used only for record timestamps;
/// all timeouts run on monotonic time.
pub fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Hex MD5 of at most the first `PAYLOAD_HASH_LIMIT` bytes of `data`.
pub fn payload_hash(data: &[u8]) -> String {
    let take = data.len().min(PAYLOAD_HASH_LIMIT);
    let mut hasher = Md5::new();
    hasher.update(&data[..take]);
    hex::encode(hasher.finalize())
}

/// Truncate to `max` bytes on a char boundary.
pub(crate) fn bounded(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

// =============================================================================
// ATTACK RECORD
// =============================================================================

/// One captured attempt. Immutable once emitted; all fields bounded.
/// Field order matches the wire JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    /// UTC seconds; serialized as ISO-8601 with `Z` suffix.
    #[serde(with = "iso8601")]
    pub timestamp: u64,
    pub source_ip: String,
    pub target_port: u16,
    pub service: Protocol,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// 32 lowercase hex chars.
    pub payload_hash: String,
    pub metadata: String,
}

impl AttackRecord {
    pub fn new(source_ip: &str, target_port: u16, service: Protocol) -> Self {
        Self {
            timestamp: now(),
            source_ip: bounded(source_ip, MAX_IP_LEN),
            target_port,
            service,
            username: CRED_NOT_AVAILABLE.to_string(),
            password: CRED_NOT_AVAILABLE.to_string(),
            user_agent: String::new(),
            payload_hash: String::new(),
            metadata: String::new(),
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        if !username.is_empty() {
            self.username = bounded(username, MAX_CRED_LEN);
        }
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        if !password.is_empty() {
            self.password = bounded(password, MAX_CRED_LEN);
        }
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = bounded(user_agent, MAX_USER_AGENT_LEN);
        self
    }

    pub fn with_payload_hash(mut self, hash: String) -> Self {
        self.payload_hash = hash;
        self
    }

    pub fn with_metadata(mut self, metadata: &str) -> Self {
        self.metadata = bounded(metadata, MAX_METADATA_LEN);
        self
    }

    /// Compact JSON object, the remote-upload and mirror line format.
    pub fn to_json(&self) -> Result<String, HoneypotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the JSON form into a caller-provided buffer. Fails with
    /// `BufferTooSmall` when the line does not fit; the buffer is left
    /// untouched in that case.
    pub fn write_json(&self, buf: &mut [u8]) -> Result<usize, HoneypotError> {
        let line = self.to_json()?;
        if line.len() > buf.len() {
            return Err(HoneypotError::BufferTooSmall);
        }
        buf[..line.len()].copy_from_slice(line.as_bytes());
        Ok(line.len())
    }
}

/// ISO-8601 UTC (`%Y-%m-%dT%H:%M:%SZ`) <-> unix seconds.
mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(secs: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        let dt = DateTime::<Utc>::from_timestamp(*secs as i64, 0)
            .ok_or_else(|| serde::ser::Error::custom("timestamp out of range"))?;
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let dt = NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)?;
        Ok(dt.and_utc().timestamp().max(0) as u64)
    }
}
