use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::domain::email::IndexEntry;
use crate::error::IngestError;
use crate::store::repo::IndexStore;

/// Processed index kept as one pretty-printed JSON object on disk.
pub struct JsonIndex {
    path: PathBuf,
    entries: BTreeMap<String, IndexEntry>,
}

impl JsonIndex {
    /// A missing, unreadable or corrupt file yields an empty index.
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<BTreeMap<String, IndexEntry>>(&s) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Corrupted index {}, starting fresh: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Cannot read index {}, starting fresh: {e}", path.display());
                BTreeMap::new()
            }
        };
        debug!("Loaded {} index entries from {}", entries.len(), path.display());
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn index_error(&self, reason: impl ToString) -> IngestError {
        IngestError::Index {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Serialize into a sibling temp file, fsync, then rename over the target.
    fn write_atomic(&self) -> Result<(), IngestError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.index_error(e))?;

        let data = serde_json::to_vec_pretty(&self.entries).map_err(|e| self.index_error(e))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.index_error(e))?;
        tmp.write_all(&data).map_err(|e| self.index_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.index_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.index_error(e.error))?;
        Ok(())
    }
}

impl IndexStore for JsonIndex {
    fn get(&self, fingerprint: &str) -> Option<&IndexEntry> {
        self.entries.get(fingerprint)
    }

    /// The entry stays in memory even when the write fails, so this process
    /// will not send the message again.
    fn put(&mut self, fingerprint: String, entry: IndexEntry) -> Result<(), IngestError> {
        self.entries.insert(fingerprint, entry);
        self.flush()
    }

    fn flush(&self) -> Result<(), IngestError> {
        self.write_atomic()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&String, &IndexEntry)> + '_> {
        Box::new(self.entries.iter())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
