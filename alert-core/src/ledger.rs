//! Dedupe ledger: fingerprints of reported posts with last-seen times.
//!
//! Entries expire after [`DEDUPE_TTL_MS`] and the ledger never holds more
//! than its capacity, evicting the least recently recorded entries first.
//! Persisted form is a flat `{fingerprint: epoch_millis}` map.

use crate::types::MatchRecord;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const DEDUPE_TTL_MS: i64 = 86_400_000;
pub const DEDUPE_CAPACITY: usize = 800;
pub const FALLBACK_PREVIEW_CHARS: usize = 200;

/// Stable dedupe key for a match.
///
/// Uses the post URL when there is one. Otherwise falls back to
/// `groupId|preview[..200]`, which means two different posts in one group
/// whose previews share their first 200 characters collide. That collision
/// is a known approximation, kept so posts without a permalink still dedupe.
pub fn fingerprint(record: &MatchRecord) -> String {
    if let Some(url) = record.post_url.as_deref().map(str::trim) {
        if !url.is_empty() {
            return url.to_string();
        }
    }
    let prefix: String = record.preview.chars().take(FALLBACK_PREVIEW_CHARS).collect();
    format!("{}|{}", record.group_id, prefix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    seen_at: i64,
    // Insertion order, breaks ties between equal timestamps.
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct DedupeLedger {
    entries: HashMap<String, Entry>,
    next_seq: u64,
    ttl_ms: i64,
    capacity: usize,
}

impl DedupeLedger {
    pub fn new() -> Self {
        Self::with_limits(DEDUPE_TTL_MS, DEDUPE_CAPACITY)
    }

    pub fn with_limits(ttl_ms: i64, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            ttl_ms,
            capacity,
        }
    }

    /// Rebuilds a ledger from its persisted map, pruning as of `now`.
    pub fn from_map(map: HashMap<String, i64>, now: i64) -> Self {
        let mut ledger = Self::new();
        let mut ordered: Vec<(String, i64)> = map.into_iter().collect();
        ordered.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        for (fp, seen_at) in ordered {
            ledger.insert(fp, seen_at);
        }
        ledger.prune(now);
        ledger
    }

    pub fn to_map(&self) -> BTreeMap<String, i64> {
        self.entries
            .iter()
            .map(|(fp, entry)| (fp.clone(), entry.seen_at))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn last_seen(&self, fingerprint: &str) -> Option<i64> {
        self.entries.get(fingerprint).map(|e| e.seen_at)
    }

    /// True iff there is no unexpired entry for `fingerprint` at `now`.
    pub fn is_new(&self, fingerprint: &str, now: i64) -> bool {
        match self.entries.get(fingerprint) {
            Some(entry) => now.saturating_sub(entry.seen_at) >= self.ttl_ms,
            None => true,
        }
    }

    /// Inserts or refreshes `fingerprint`, evicting the oldest entry if the
    /// ledger grows past capacity.
    pub fn record(&mut self, fingerprint: &str, now: i64) {
        self.insert(fingerprint.to_string(), now);
        self.enforce_capacity();
    }

    /// Drops expired entries, then trims to capacity keeping the most recent.
    pub fn prune(&mut self, now: i64) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl_ms;
        self.entries.retain(|_, entry| now.saturating_sub(entry.seen_at) < ttl);
        self.enforce_capacity();

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Pruned {} dedupe entries ({} remain)", removed, self.entries.len());
        }
        removed
    }

    /// Keeps only matches whose fingerprint is new, recording each as seen.
    ///
    /// Duplicates within `matches` collapse to the first occurrence.
    pub fn filter_fresh(&mut self, matches: Vec<MatchRecord>, now: i64) -> Vec<MatchRecord> {
        let mut fresh = Vec::new();
        for record in matches {
            let fp = fingerprint(&record);
            if !self.is_new(&fp, now) {
                continue;
            }
            self.record(&fp, now);
            fresh.push(record);
        }
        fresh
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, fingerprint: String, seen_at: i64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(fingerprint, Entry { seen_at, seq });
    }

    fn enforce_capacity(&mut self) {
        if self.entries.len() <= self.capacity {
            return;
        }
        let mut order: Vec<(Entry, String)> = self
            .entries
            .iter()
            .map(|(fp, entry)| (*entry, fp.clone()))
            .collect();
        order.sort_by(|a, b| (a.0.seen_at, a.0.seq).cmp(&(b.0.seen_at, b.0.seq)));

        let excess = self.entries.len() - self.capacity;
        for (_, fp) in order.into_iter().take(excess) {
            self.entries.remove(&fp);
        }
    }
}

impl Default for DedupeLedger {
    fn default() -> Self {
        Self::new()
    }
}
