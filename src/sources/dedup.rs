use std::collections::HashSet;

use sha2::{Digest, Sha256};

/// Gatekeeper every extraction path consults before emitting a candidate.
///
/// Rejects identifiers already stored for the feed and identifiers already
/// emitted earlier in the same cycle.
pub struct Deduplicator<'a> {
    known: &'a HashSet<String>,
    emitted: HashSet<String>,
}

impl<'a> Deduplicator<'a> {
    pub fn new(known: &'a HashSet<String>) -> Self {
        Self {
            known,
            emitted: HashSet::new(),
        }
    }

    /// True when the identifier has been neither stored nor emitted.
    pub fn is_new(&self, guid: &str) -> bool {
        !self.known.contains(guid) && !self.emitted.contains(guid)
    }

    /// Record the identifier as emitted. Returns false if it was not new.
    pub fn admit(&mut self, guid: &str) -> bool {
        if !self.is_new(guid) {
            return false;
        }
        self.emitted.insert(guid.to_string())
    }

    pub fn emitted(&self) -> usize {
        self.emitted.len()
    }
}

/// Stable identifier for an entry without an explicit id or link.
pub fn title_hash(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Identifier for a scraped item: its link, else a hash of its title.
pub fn scraped_guid(link: Option<&str>, title: &str) -> String {
    match link.map(str::trim).filter(|l| !l.is_empty()) {
        Some(link) => link.to_string(),
        None => title_hash(title),
    }
}
