//! hirelock-core — encrypted candidate record store
//!
//! # Encryption strategy
//! The full record set is serialized to JSON, combined with the store key
//! (repeating-key XOR) and base64-encoded before it touches disk, so the
//! backing file never contains plaintext PII. Single-record export
//! payloads use the same transform for transit between store instances
//! sharing a key. The key itself is held only in memory, zeroized on drop,
//! and never persisted.
//!
//! # Privacy invariants
//! - No record enters the store without an affirmative consent flag.
//! - Anonymization nulls the identifying fields irreversibly.
//! - Records past the configured retention window are purged by creation
//!   timestamp.
//! - The audit trail records operations by id only, never field contents.

pub mod audit;
pub mod cipher;
pub mod error;
pub mod record;
pub mod store;

pub use audit::{AuditEntry, AuditLog};
pub use error::StoreError;
pub use record::CandidateRecord;
pub use store::{CandidateStore, StoreConfig, DEFAULT_RETENTION_DAYS};
