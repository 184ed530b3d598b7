mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use common::{FakeTransport, email, write_email};
use mail_ingest::daemon::{DaemonConfig, watch_until};
use mail_ingest::domain::email::{IndexEntry, MetadataProfile};
use mail_ingest::error::IngestError;
use mail_ingest::ingest::{Pipeline, RetryPolicy};
use mail_ingest::remote::{DocumentId, IngestTransport};
use mail_ingest::store::{IndexStore, JsonIndex};
use tempfile::TempDir;

fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    cond()
}

/// Drops one more email into the inbox while its first upload is in flight.
struct WritesDuringUpload {
    inner: FakeTransport,
    pending: Mutex<Option<(PathBuf, String)>>,
}

impl IngestTransport for WritesDuringUpload {
    fn health_check(&self) -> Result<(), IngestError> {
        self.inner.health_check()
    }

    fn upload(&self, content: &str, metadata: &IndexEntry) -> Result<Option<DocumentId>, IngestError> {
        if let Some((path, raw)) = self.pending.lock().unwrap().take() {
            fs::write(path, raw).unwrap();
        }
        self.inner.upload(content, metadata)
    }

    fn update_metadata(&self, id: &str, metadata: &IndexEntry) -> Result<(), IngestError> {
        self.inner.update_metadata(id, metadata)
    }
}

#[test]
fn file_written_during_initial_scan_is_ingested() {
    let dir = TempDir::new().unwrap();
    let watch_dir = dir.path().join("inbox");
    write_email(&watch_dir, "existing.eml", "Existing");

    let inner = FakeTransport::default();
    let transport = WritesDuringUpload {
        inner: inner.clone(),
        pending: Mutex::new(Some((
            watch_dir.join("late.eml"),
            email("Late", "b@example.com", "Wed, 17 Jan 2024 08:00:00 +0000", "late"),
        ))),
    };
    let store = JsonIndex::load(&dir.path().join("index.json"));
    let mut pipeline =
        Pipeline::new(transport, store, MetadataProfile::Basic).with_retry(RetryPolicy::none());
    let cfg = DaemonConfig {
        watch_dir: watch_dir.clone(),
        grace: Duration::from_millis(100),
    };
    let running = AtomicBool::new(true);

    thread::scope(|s| {
        let handle = s.spawn(|| watch_until(&mut pipeline, &cfg, &running));

        let arrived = wait_for(Duration::from_secs(10), || inner.upload_count() == 2);

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
        assert!(arrived, "file written during the scan was not ingested");
    });

    assert_eq!(pipeline.store().len(), 2);
    assert_eq!(inner.upload_count(), 2);
}

#[test]
fn scans_existing_files_then_picks_up_new_ones() {
    let dir = TempDir::new().unwrap();
    let watch_dir = dir.path().join("inbox");
    write_email(&watch_dir, "existing.eml", "Existing");

    let transport = FakeTransport::default();
    let store = JsonIndex::load(&dir.path().join("index.json"));
    let mut pipeline =
        Pipeline::new(transport.clone(), store, MetadataProfile::Basic).with_retry(RetryPolicy::none());
    let cfg = DaemonConfig {
        watch_dir: watch_dir.clone(),
        grace: Duration::from_millis(200),
    };
    let running = AtomicBool::new(true);

    thread::scope(|s| {
        let handle = s.spawn(|| watch_until(&mut pipeline, &cfg, &running));

        assert!(wait_for(Duration::from_secs(5), || transport.upload_count() == 1));

        fs::write(
            watch_dir.join("new.eml"),
            email("Fresh", "a@example.com", "Tue, 16 Jan 2024 09:00:00 +0000", "hi"),
        )
        .unwrap();
        fs::write(watch_dir.join("ignored.txt"), "not mail").unwrap();

        let arrived = wait_for(Duration::from_secs(10), || transport.upload_count() == 2);

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
        assert!(arrived, "new file was not ingested");
    });

    assert_eq!(pipeline.store().len(), 2);
    assert_eq!(transport.upload_count(), 2);
}

#[test]
fn creates_missing_watch_dir() {
    let dir = TempDir::new().unwrap();
    let watch_dir = dir.path().join("not").join("yet");
    let store = JsonIndex::load(&dir.path().join("index.json"));
    let mut pipeline = Pipeline::new(FakeTransport::default(), store, MetadataProfile::Basic);
    let cfg = DaemonConfig {
        watch_dir: watch_dir.clone(),
        grace: Duration::ZERO,
    };
    let running = AtomicBool::new(false);

    watch_until(&mut pipeline, &cfg, &running).unwrap();
    assert!(watch_dir.is_dir());
}
