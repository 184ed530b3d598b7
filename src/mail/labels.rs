use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::email::Priority;

static LABEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\[([^\]]+)\]",
        r"(?i)Label:\s*(\S+)",
        r"(?i)Category:\s*(\S+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("label pattern"))
    .collect()
});

const PRIORITY_TIERS: [(Priority, &[&str]); 3] = [
    (
        Priority::High,
        &["urgent", "asap", "important", "critical", "emergency"],
    ),
    (Priority::Medium, &["update", "notification", "reminder"]),
    (Priority::Low, &["newsletter", "promotion", "marketing"]),
];

/// Labels from subject tags plus sender/subject keyword rules.
///
/// Tag captures keep their original case, so `[Urgent]` and the keyword
/// label `urgent` are distinct entries.
pub fn extract_labels(subject: &str, sender: &str) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();

    for pattern in LABEL_PATTERNS.iter() {
        for caps in pattern.captures_iter(subject) {
            if let Some(m) = caps.get(1) {
                labels.insert(m.as_str().to_string());
            }
        }
    }

    let subject_lower = subject.to_lowercase();
    let sender_lower = sender.to_lowercase();

    if sender_lower.contains("noreply") {
        labels.insert("automated".to_string());
    }
    if sender_lower.contains("newsletter") || subject_lower.contains("newsletter") {
        labels.insert("newsletter".to_string());
    }
    if subject_lower.contains("urgent") || subject_lower.contains("asap") {
        labels.insert("urgent".to_string());
    }

    labels
}

/// First keyword tier (high, then medium, then low) hit by subject or sender.
pub fn determine_priority(subject: &str, sender: &str) -> Priority {
    let subject_lower = subject.to_lowercase();
    let sender_lower = sender.to_lowercase();

    PRIORITY_TIERS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|k| subject_lower.contains(k) || sender_lower.contains(k))
        })
        .map(|(priority, _)| *priority)
        .unwrap_or_default()
}
