use crate::domain::email::IndexEntry;
use crate::error::IngestError;

/// The processed index: fingerprint to last-seen metadata.
///
/// `put` is write-through. When it returns `Ok` the entry is durable.
pub trait IndexStore {
    fn get(&self, fingerprint: &str) -> Option<&IndexEntry>;

    fn contains(&self, fingerprint: &str) -> bool {
        self.get(fingerprint).is_some()
    }

    fn put(&mut self, fingerprint: String, entry: IndexEntry) -> Result<(), IngestError>;

    fn flush(&self) -> Result<(), IngestError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&String, &IndexEntry)> + '_>;

    /// Where the index lives, for stats output.
    fn location(&self) -> String;
}
