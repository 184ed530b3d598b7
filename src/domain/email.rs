use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Body used when a message has no plain or HTML part with text in it.
pub const NO_CONTENT_SENTINEL: &str = "[No text content found]";

pub const DEFAULT_SUBJECT: &str = "No Subject";
pub const DEFAULT_SENDER: &str = "Unknown Sender";

/// Hex SHA-256 of `subject|sender|date`.
pub type Fingerprint = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    Normal,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Normal => "normal",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted message. Transient: only its metadata is persisted.
#[derive(Debug, Clone)]
pub struct EmailRecord {
    pub body: String,
    pub subject: String,
    pub sender: String,
    /// RFC 3339.
    pub date: String,
    pub source_path: PathBuf,
    pub has_attachments: bool,
    pub attachment_count: usize,
    pub labels: BTreeSet<String>,
    pub priority: Priority,
    pub fingerprint: Fingerprint,
}

/// Metadata persisted in the processed index and sent to the service.
///
/// The enhanced fields are absent for the basic profile. Older index files
/// written with `source_file` or camelCase keys still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, alias = "source_file", alias = "sourcePath")]
    pub source_path: String,
    #[serde(default = "default_content_type", alias = "contentType")]
    pub content_type: String,
    #[serde(default, alias = "processedAt")]
    pub processed_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "emailId")]
    pub email_id: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "hasAttachments")]
    pub has_attachments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "attachmentCount")]
    pub attachment_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

fn default_content_type() -> String {
    "email".to_string()
}

/// How much metadata travels with each ingested message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetadataProfile {
    Basic,
    #[default]
    Enhanced,
}

impl MetadataProfile {
    pub fn entry_for(&self, record: &EmailRecord, processed_at: String) -> IndexEntry {
        let mut entry = IndexEntry {
            subject: record.subject.clone(),
            sender: record.sender.clone(),
            date: record.date.clone(),
            source_path: record.source_path.display().to_string(),
            content_type: default_content_type(),
            processed_at,
            email_id: None,
            has_attachments: None,
            attachment_count: None,
            labels: None,
            priority: None,
        };
        if *self == MetadataProfile::Enhanced {
            entry.email_id = Some(record.fingerprint.clone());
            entry.has_attachments = Some(record.has_attachments);
            entry.attachment_count = Some(record.attachment_count);
            entry.labels = Some(record.labels.iter().cloned().collect());
            entry.priority = Some(record.priority);
        }
        entry
    }
}

#[derive(Debug)]
pub enum Outcome {
    Processed,
    /// Fingerprint already in the index; the service was not contacted.
    Skipped,
    Failed(IngestError),
}

impl Outcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Outcome::Processed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_processed: usize,
    pub service_available: bool,
    pub index_file: String,
    pub last_processed: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EmailRecord {
        EmailRecord {
            body: "hi".into(),
            subject: "[Ops] Reminder".into(),
            sender: "ops@example.com".into(),
            date: "2024-01-15T10:30:00+00:00".into(),
            source_path: PathBuf::from("/tmp/a.eml"),
            has_attachments: true,
            attachment_count: 2,
            labels: ["Ops".to_string()].into_iter().collect(),
            priority: Priority::Medium,
            fingerprint: "abc".into(),
        }
    }

    #[test]
    fn basic_profile_omits_enhanced_fields() {
        let entry = MetadataProfile::Basic.entry_for(&record(), "now".into());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["content_type"], "email");
        assert_eq!(json["source_path"], "/tmp/a.eml");
        assert!(json.get("email_id").is_none());
        assert!(json.get("labels").is_none());
    }

    #[test]
    fn enhanced_profile_carries_fingerprint_and_labels() {
        let entry = MetadataProfile::Enhanced.entry_for(&record(), "now".into());
        assert_eq!(entry.email_id.as_deref(), Some("abc"));
        assert_eq!(entry.attachment_count, Some(2));
        assert_eq!(entry.labels, Some(vec!["Ops".to_string()]));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["priority"], "medium");
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let raw = r#"{"subject":"s","sender":"f","date":"d",
            "source_file":"/x.eml","content_type":"email","processed_at":"p"}"#;
        let entry: IndexEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.source_path, "/x.eml");
        assert_eq!(entry.processed_at, "p");
    }
}
