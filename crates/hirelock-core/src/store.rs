//! Consent-gated, at-rest encrypted candidate store.
//!
//! The full record set lives in memory and is rewritten to the backing
//! file on every mutation: serialize the whole id-to-record map, encrypt
//! as one blob, stage next to the target and rename so a reader never
//! observes a partially written file. Loading happens once at `open`.

use crate::cipher;
use crate::error::StoreError;
use crate::record::CandidateRecord;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

pub const DEFAULT_RETENTION_DAYS: u32 = 365;

/// Explicit store configuration. The key is caller-managed, held only in
/// memory and zeroized on drop; it is never written to the backing file.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub key: Zeroizing<Vec<u8>>,
    pub retention_days: u32,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>, key: &[u8]) -> Self {
        Self {
            path: path.into(),
            key: Zeroizing::new(key.to_vec()),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug)]
pub struct CandidateStore {
    config: StoreConfig,
    records: HashMap<String, CandidateRecord>,
}

impl CandidateStore {
    /// Open the store at the configured path, loading and decrypting the
    /// backing file if it exists. A missing file means first use and an
    /// empty record set; anything that fails to decode or parse is
    /// `CorruptData` and fatal to construction.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if config.key.is_empty() {
            return Err(StoreError::InvalidKey);
        }
        let records = if config.path.exists() {
            Self::load(&config.path, &config.key)?
        } else {
            debug!(path = %config.path.display(), "no backing file, starting empty");
            HashMap::new()
        };
        Ok(Self { config, records })
    }

    fn load(path: &Path, key: &[u8]) -> Result<HashMap<String, CandidateRecord>, StoreError> {
        let ciphertext = fs::read(path)?;
        let plaintext = cipher::decrypt(&ciphertext, key)
            .map_err(|e| StoreError::CorruptData(format!("transport decode: {e}")))?;
        let records: HashMap<String, CandidateRecord> = serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::CorruptData(format!("parse record set: {e}")))?;
        debug!(path = %path.display(), count = records.len(), "loaded record set");
        Ok(records)
    }

    /// Insert a record after verifying consent. The store stamps
    /// `created_at`; a duplicate id overwrites the previous record.
    pub fn add(&mut self, mut record: CandidateRecord) -> Result<(), StoreError> {
        if !record.consent {
            return Err(StoreError::ConsentRequired);
        }
        record.created_at = Some(Utc::now());
        debug!(id = %record.id, "adding record");
        self.records.insert(record.id.clone(), record);
        self.persist()
    }

    pub fn get(&self, id: &str) -> Option<&CandidateRecord> {
        self.records.get(id)
    }

    /// All records, ordered by id.
    pub fn list(&self) -> Vec<&CandidateRecord> {
        let mut records: Vec<&CandidateRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Null the identifying fields of a record in place. Absent ids are a
    /// no-op returning `false`. Irreversible.
    pub fn anonymize(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(record) = self.records.get_mut(id) else {
            return Ok(false);
        };
        record.anonymize();
        info!(id, "record anonymized");
        self.persist()?;
        Ok(true)
    }

    /// Remove a record entirely. Absent ids are a no-op returning `false`.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.records.remove(id).is_none() {
            return Ok(false);
        }
        info!(id, "record deleted");
        self.persist()?;
        Ok(true)
    }

    /// Remove every record whose creation time predates the configured
    /// retention window. Records without a creation timestamp are kept.
    /// The backing file is rewritten only if something was removed.
    pub fn purge_expired(&mut self) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.config.retention_days));
        let expired: Vec<String> = self
            .records
            .values()
            .filter(|r| r.is_expired(cutoff))
            .map(|r| r.id.clone())
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }
        for id in &expired {
            self.records.remove(id);
        }
        info!(count = expired.len(), "purged expired records");
        self.persist()?;
        Ok(expired.len())
    }

    /// Encrypted payload for one record, for transit between store
    /// instances sharing a key. Read-only; `None` for absent ids.
    pub fn export_encrypted(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(record) = self.records.get(id) else {
            return Ok(None);
        };
        let plaintext = serde_json::to_vec(record)?;
        Ok(Some(cipher::encrypt(&plaintext, &self.config.key)))
    }

    /// Insert a record from an encrypted payload. Consent is not
    /// re-checked: the record passed the gate when it was first stored.
    pub fn import_encrypted(&mut self, payload: &[u8]) -> Result<CandidateRecord, StoreError> {
        let plaintext = cipher::decrypt(payload, &self.config.key)
            .map_err(|e| StoreError::CorruptData(format!("transport decode: {e}")))?;
        let record: CandidateRecord = serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::CorruptData(format!("parse record: {e}")))?;
        debug!(id = %record.id, "importing record");
        self.records.insert(record.id.clone(), record.clone());
        self.persist()?;
        Ok(record)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(&self.records)?;
        let ciphertext = cipher::encrypt(&plaintext, &self.config.key);
        let staging = staging_path(&self.config.path);
        {
            let mut file = File::create(&staging)?;
            file.write_all(&ciphertext)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.config.path)?;
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fsync_dir(parent)?;
            }
        }
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "store".to_string());
    path.with_file_name(format!("{filename}.staging"))
}

fn fsync_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let dir = OpenOptions::new().read(true).open(path)?;
        dir.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(path: &Path) -> StoreConfig {
        StoreConfig::new(path, b"supersecret")
    }

    #[test]
    fn open_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.enc");
        let store = CandidateStore::open(config(&path)).unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn add_persists_and_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.enc");
        let mut store = CandidateStore::open(config(&path)).unwrap();
        let mut record = CandidateRecord::new("1", true);
        record.name = Some("Ana".to_string());
        store.add(record).unwrap();
        drop(store);

        let reopened = CandidateStore::open(config(&path)).unwrap();
        let loaded = reopened.get("1").unwrap();
        assert_eq!(loaded.name.as_deref(), Some("Ana"));
        assert!(loaded.created_at.is_some());
    }

    #[test]
    fn wrong_key_is_corrupt_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.enc");
        let mut store = CandidateStore::open(config(&path)).unwrap();
        store.add(CandidateRecord::new("1", true)).unwrap();
        drop(store);

        let err = CandidateStore::open(StoreConfig::new(&path, b"wrong-key")).unwrap_err();
        assert!(matches!(err, StoreError::CorruptData(_)));
    }

    #[test]
    fn empty_key_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.enc");
        let err = CandidateStore::open(StoreConfig::new(&path, b"")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey));
    }

    #[test]
    fn add_without_consent_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.enc");
        let mut store = CandidateStore::open(config(&path)).unwrap();
        let err = store.add(CandidateRecord::new("1", false)).unwrap_err();
        assert!(matches!(err, StoreError::ConsentRequired));
        assert!(store.get("1").is_none());
        // rejected before any write: still no backing file
        assert!(!path.exists());
    }
}
