use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One candidate's privacy-sensitive profile entry plus consent and
/// retention metadata. The id is caller-assigned; `created_at` is stamped
/// by the store at insertion and is the sole input to retention expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub document: Option<String>,
    pub consent: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub anonymized: bool,
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>, consent: bool) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            document: None,
            consent,
            created_at: None,
            anonymized: false,
        }
    }

    /// Null every identifying field. One-way: the flag is never reset.
    pub fn anonymize(&mut self) {
        self.name = None;
        self.email = None;
        self.document = None;
        self.anonymized = true;
    }

    /// Records without a creation timestamp never expire.
    pub fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        matches!(self.created_at, Some(created) if created < cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn anonymize_is_idempotent() {
        let mut record = CandidateRecord::new("7", true);
        record.name = Some("Ana".to_string());
        record.email = Some("ana@example.com".to_string());
        record.anonymize();
        let first = record.clone();
        record.anonymize();
        assert_eq!(record, first);
        assert!(record.anonymized);
        assert!(record.name.is_none() && record.email.is_none() && record.document.is_none());
    }

    #[test]
    fn expiry_requires_a_timestamp() {
        let cutoff = Utc::now();
        let mut record = CandidateRecord::new("7", true);
        assert!(!record.is_expired(cutoff));
        record.created_at = Some(cutoff - Duration::days(1));
        assert!(record.is_expired(cutoff));
        record.created_at = Some(cutoff + Duration::days(1));
        assert!(!record.is_expired(cutoff));
    }
}
