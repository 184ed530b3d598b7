pub mod watcher;

use anyhow::{Context, Result};
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::daemon::watcher::EmailWatcher;
use crate::domain::email::Outcome;
use crate::ingest::Pipeline;
use crate::remote::IngestTransport;
use crate::store::IndexStore;

/// How often the loop wakes to check for shutdown when no events arrive.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct DaemonConfig {
    pub watch_dir: PathBuf,
    /// Pause before reading a freshly announced file.
    pub grace: Duration,
}

/// Scans the watch directory, then processes arriving files until Ctrl+C.
pub fn run_daemon<T, S>(pipeline: &mut Pipeline<T, S>, cfg: DaemonConfig) -> Result<()>
where
    T: IngestTransport,
    S: IndexStore,
{
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    watch_until(pipeline, &cfg, &running)
}

/// Event loop behind [`run_daemon`]. Events are handled one at a time and the
/// flag is only checked between them, so a file in progress always finishes.
pub fn watch_until<T, S>(
    pipeline: &mut Pipeline<T, S>,
    cfg: &DaemonConfig,
    running: &AtomicBool,
) -> Result<()>
where
    T: IngestTransport,
    S: IndexStore,
{
    if !cfg.watch_dir.exists() {
        fs::create_dir_all(&cfg.watch_dir)
            .with_context(|| format!("create watch dir {}", cfg.watch_dir.display()))?;
        info!("Created watch directory: {}", cfg.watch_dir.display());
    }

    // Watch before scanning so nothing written during the scan is missed.
    let watcher = EmailWatcher::new(&cfg.watch_dir)?;
    info!("Started watching directory: {}", cfg.watch_dir.display());

    info!("Processing existing email files...");
    pipeline.process_directory(&cfg.watch_dir);

    info!("Press Ctrl+C to stop watching");

    while running.load(Ordering::SeqCst) {
        for path in watcher.next_paths(POLL_INTERVAL)? {
            handle_arrival(pipeline, &path, cfg.grace);
        }
    }

    info!("Received interrupt signal");
    drop(watcher);
    info!("Stopped watching directory");
    Ok(())
}

fn handle_arrival<T, S>(pipeline: &mut Pipeline<T, S>, path: &Path, grace: Duration)
where
    T: IngestTransport,
    S: IndexStore,
{
    info!("New email file detected: {}", path.display());
    // Give the writer a moment to finish.
    thread::sleep(grace);

    match pipeline.process_file(path) {
        Outcome::Processed => info!("Successfully processed new email: {}", path.display()),
        Outcome::Skipped => info!("Already ingested: {}", path.display()),
        Outcome::Failed(e) => error!("Failed to process new email {}: {e}", path.display()),
    }
}
