#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mail_ingest::domain::email::IndexEntry;
use mail_ingest::error::IngestError;
use mail_ingest::remote::{DocumentId, IngestTransport};

#[derive(Default)]
pub struct FakeState {
    pub down: bool,
    /// Health probes that fail before the service comes up.
    pub failing_probes: u32,
    pub reject_uploads: bool,
    pub fail_metadata: bool,
    /// Hand out document ids, like the multipart endpoint does.
    pub issue_ids: bool,
    pub health_calls: u32,
    pub uploads: Vec<(String, IndexEntry)>,
    pub metadata_updates: Vec<(String, IndexEntry)>,
}

/// Records every call; clones share state so tests can inspect it after
/// handing one to a pipeline.
#[derive(Clone, Default)]
pub struct FakeTransport {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn with_ids() -> Self {
        let t = Self::default();
        t.state.lock().unwrap().issue_ids = true;
        t
    }

    pub fn set(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    pub fn health_calls(&self) -> u32 {
        self.state.lock().unwrap().health_calls
    }
}

impl IngestTransport for FakeTransport {
    fn health_check(&self) -> Result<(), IngestError> {
        let mut s = self.state.lock().unwrap();
        s.health_calls += 1;
        if s.down {
            return Err(IngestError::RemoteUnavailable("connection refused".into()));
        }
        if s.failing_probes > 0 {
            s.failing_probes -= 1;
            return Err(IngestError::RemoteUnavailable("starting".into()));
        }
        Ok(())
    }

    fn upload(&self, content: &str, metadata: &IndexEntry) -> Result<Option<DocumentId>, IngestError> {
        let mut s = self.state.lock().unwrap();
        if s.reject_uploads {
            return Err(IngestError::RemoteRejected {
                status: 500,
                body: "internal error".into(),
            });
        }
        s.uploads.push((content.to_string(), metadata.clone()));
        Ok(s.issue_ids.then(|| format!("doc-{}", s.uploads.len())))
    }

    fn update_metadata(&self, id: &str, metadata: &IndexEntry) -> Result<(), IngestError> {
        let mut s = self.state.lock().unwrap();
        if s.fail_metadata {
            return Err(IngestError::RemoteRejected {
                status: 404,
                body: "unknown document".into(),
            });
        }
        s.metadata_updates.push((id.to_string(), metadata.clone()));
        Ok(())
    }
}

pub fn email(subject: &str, from: &str, date: &str, body: &str) -> String {
    format!(
        "From: {from}\r\nTo: user@example.com\r\nSubject: {subject}\r\nDate: {date}\r\n\
         MIME-Version: 1.0\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{body}\r\n"
    )
}

pub fn write_email(dir: &Path, name: &str, subject: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(
        &path,
        email(
            subject,
            "sender@example.com",
            "Mon, 15 Jan 2024 10:30:00 +0000",
            &format!("Body of {subject}"),
        ),
    )
    .unwrap();
    path
}
