//! Append-only audit trail for privacy-relevant store operations.
//!
//! Entries are JSON lines chained by SHA-256: each entry hashes its own
//! contents plus the previous entry's hash, so silent edits or deletions
//! anywhere in the file break the chain. Entries carry record ids and
//! counts, never PII.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const CHAIN_START: &str = "CHAIN_START";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub data: serde_json::Value,
    pub prev_hash: String,
    pub hash: String,
}

pub struct AuditLog {
    path: PathBuf,
    last_seq: u64,
    last_hash: String,
}

impl AuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (last_seq, last_hash) = Self::load_state(&path)?;
        Ok(Self {
            path,
            last_seq,
            last_hash,
        })
    }

    fn load_state(path: &Path) -> Result<(u64, String)> {
        if !path.exists() {
            return Ok((0, CHAIN_START.to_string()));
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut last_seq = 0;
        let mut last_hash = CHAIN_START.to_string();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)?;
            last_seq = entry.seq;
            last_hash = entry.hash;
        }
        Ok((last_seq, last_hash))
    }

    fn compute_hash(entry_without_hash: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(entry_without_hash.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn append(&mut self, action: &str, data: serde_json::Value) -> Result<AuditEntry> {
        let seq = self.last_seq + 1;
        let prev_hash = self.last_hash.clone();
        let mut entry_value = serde_json::json!({
            "seq": seq,
            "timestamp": Utc::now(),
            "action": action,
            "data": data,
            "prev_hash": prev_hash,
        });
        let hash = Self::compute_hash(&entry_value);
        entry_value["hash"] = serde_json::Value::String(hash.clone());

        let entry: AuditEntry = serde_json::from_value(entry_value)?;
        self.write_entry(&entry)?;
        self.last_seq = seq;
        self.last_hash = hash;
        debug!(seq, action, "audit entry appended");
        Ok(entry)
    }

    fn write_entry(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Read entries, most recent first, optionally capped at `limit`.
    pub fn read_recent(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str::<AuditEntry>(&line)?);
        }
        entries.reverse();
        if let Some(lim) = limit {
            entries.truncate(lim);
        }
        Ok(entries)
    }

    /// Walk the whole chain, recomputing every hash. Returns the number of
    /// verified entries, or an error at the first break.
    pub fn verify(&self) -> Result<u64> {
        if !self.path.exists() {
            return Ok(0);
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut prev_hash = CHAIN_START.to_string();
        let mut verified = 0u64;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)?;
            if entry.prev_hash != prev_hash {
                return Err(anyhow!("audit chain break at seq {}", entry.seq));
            }
            let entry_value = serde_json::json!({
                "seq": entry.seq,
                "timestamp": entry.timestamp,
                "action": entry.action,
                "data": entry.data,
                "prev_hash": entry.prev_hash,
            });
            if Self::compute_hash(&entry_value) != entry.hash {
                return Err(anyhow!("audit entry hash mismatch at seq {}", entry.seq));
            }
            prev_hash = entry.hash;
            verified += 1;
        }
        Ok(verified)
    }
}
