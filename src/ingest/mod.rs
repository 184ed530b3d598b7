use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::domain::email::{EmailRecord, IndexEntry, MetadataProfile, Outcome, Stats};
use crate::error::IngestError;
use crate::mail::extract::extract;
use crate::mail::is_email_path;
use crate::remote::IngestTransport;
use crate::store::IndexStore;

/// Health probe retries. Only the probe is retried; an upload that fails is
/// left for the next scan or watch event.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay before the second attempt, doubled after each failure.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Extract, dedup, ingest. One instance per index file; calls are serial.
pub struct Pipeline<T, S> {
    transport: T,
    store: S,
    profile: MetadataProfile,
    retry: RetryPolicy,
}

impl<T: IngestTransport, S: IndexStore> Pipeline<T, S> {
    pub fn new(transport: T, store: S, profile: MetadataProfile) -> Self {
        Self {
            transport,
            store,
            profile,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn profile(&self) -> MetadataProfile {
        self.profile
    }

    pub fn process_file(&mut self, path: &Path) -> Outcome {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(source) => {
                let err = IngestError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                error!("{err}");
                return Outcome::Failed(err);
            }
        };

        let record = match extract(&raw, path) {
            Ok(record) => record,
            Err(err) => {
                error!("Failed to parse email: {err}");
                return Outcome::Failed(err);
            }
        };

        if self.store.contains(&record.fingerprint) {
            info!("Email already processed: {}", record.subject);
            return Outcome::Skipped;
        }

        let entry = self.profile.entry_for(&record, Local::now().to_rfc3339());
        if let Err(err) = self.ingest(&record, &entry) {
            error!("Failed to ingest email {}: {err}", record.subject);
            return Outcome::Failed(err);
        }
        info!("Successfully ingested email: {}", record.subject);

        if let Err(err) = self.store.put(record.fingerprint, entry) {
            error!("{err}");
            return Outcome::Failed(err);
        }
        Outcome::Processed
    }

    /// Walks `root` recursively and returns how many files were ingested.
    /// Skipped and failed files do not count.
    pub fn process_directory(&mut self, root: &Path) -> usize {
        if !root.is_dir() {
            error!("Directory does not exist: {}", root.display());
            return 0;
        }

        let mut processed = 0;
        for entry in WalkDir::new(root).into_iter() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {e}", root.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_email_path(entry.path()) {
                continue;
            }
            info!("Processing: {}", entry.path().display());
            if self.process_file(entry.path()).is_processed() {
                processed += 1;
            }
        }

        info!("Processed {processed} emails from {}", root.display());
        processed
    }

    pub fn stats(&self) -> Stats {
        let last_processed = self
            .store
            .entries()
            .map(|(_, e)| e.processed_at.as_str())
            .max()
            .unwrap_or_default()
            .to_string();
        Stats {
            total_processed: self.store.len(),
            service_available: self.transport.health_check().is_ok(),
            index_file: self.store.location(),
            last_processed,
        }
    }

    fn ingest(&self, record: &EmailRecord, entry: &IndexEntry) -> Result<(), IngestError> {
        self.probe()?;
        debug!(
            "Uploading {} ({} chars)",
            record.subject,
            record.body.chars().count()
        );
        if let Some(id) = self.transport.upload(&record.body, entry)? {
            self.transport.update_metadata(&id, entry)?;
        }
        Ok(())
    }

    fn probe(&self) -> Result<(), IngestError> {
        let attempts = self.retry.attempts.max(1);
        let mut delay = self.retry.backoff;
        let mut attempt = 1;
        loop {
            match self.transport.health_check() {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    warn!("Ingestion service not ready (attempt {attempt}/{attempts}): {err}");
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}
