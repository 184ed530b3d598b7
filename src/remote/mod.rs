pub mod client;

pub use client::{RagClient, UploadMode};

use crate::domain::email::IndexEntry;
use crate::error::IngestError;

/// Server-side id of an uploaded document.
pub type DocumentId = String;

/// The three calls the pipeline needs from an ingestion backend.
pub trait IngestTransport {
    fn health_check(&self) -> Result<(), IngestError>;

    /// Returns an id when the backend expects metadata in a separate call.
    fn upload(&self, content: &str, metadata: &IndexEntry) -> Result<Option<DocumentId>, IngestError>;

    fn update_metadata(&self, id: &str, metadata: &IndexEntry) -> Result<(), IngestError>;
}
