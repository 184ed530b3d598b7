use sha2::{Digest, Sha256};

use crate::domain::email::Fingerprint;

const DELIMITER: &str = "|";

/// Dedup key for a message: lowercase hex SHA-256 of `subject|sender|date`.
pub fn fingerprint(subject: &str, sender: &str, date: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hasher.update(DELIMITER.as_bytes());
    hasher.update(sender.as_bytes());
    hasher.update(DELIMITER.as_bytes());
    hasher.update(date.as_bytes());
    format!("{:x}", hasher.finalize())
}
