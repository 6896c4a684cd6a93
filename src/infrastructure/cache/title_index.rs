//! Recency-ordered index of one title's cached dates.

use std::num::NonZeroUsize;

use chrono::{DateTime, NaiveDate, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::domain::entities::ImageKind;
use crate::domain::ports::TitleCacheStats;

/// Version written into `index.json`.
pub const INDEX_VERSION: u32 = 1;

/// Bookkeeping for one cached strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Sniffed kind, which also fixes the file extension.
    pub kind: ImageKind,
    /// File size in bytes.
    pub size: u64,
    /// Last time the strip was read or written.
    pub last_accessed: DateTime<Utc>,
    /// Monotonic insertion sequence, used to break recency ties.
    pub inserted: u64,
    /// Number of reads and writes.
    pub access_count: u64,
}

/// Serialized form of one index row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Strip date.
    pub date: NaiveDate,
    /// Entry data.
    #[serde(flatten)]
    pub entry: IndexEntry,
}

/// Serialized form of a title index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    /// Format version.
    pub version: u32,
    /// Next insertion sequence number.
    pub next_seq: u64,
    /// Entries, least recently used first.
    pub entries: Vec<IndexRecord>,
}

/// What an insert changed.
#[derive(Debug, Default)]
pub struct InsertOutcome {
    /// Previous entry for the same date, if the insert was a refresh.
    pub replaced: Option<IndexEntry>,
    /// Entry pushed out to stay within capacity.
    pub evicted: Option<(NaiveDate, IndexEntry)>,
}

/// Bounded LRU index keyed by date.
///
/// The `lru` ordering is the single source of truth for eviction; the
/// timestamps are kept for persistence and reporting.
pub struct TitleIndex {
    entries: LruCache<NaiveDate, IndexEntry>,
    next_seq: u64,
}

impl TitleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            next_seq: 0,
        }
    }

    /// Rebuilds an index from persisted entries.
    ///
    /// Entries are replayed from least to most recently accessed (ties by
    /// insertion order). Anything beyond capacity is returned for deletion.
    #[must_use]
    pub fn from_entries(
        capacity: NonZeroUsize,
        entries: Vec<(NaiveDate, IndexEntry)>,
        next_seq: u64,
    ) -> (Self, Vec<(NaiveDate, IndexEntry)>) {
        let mut entries = entries;
        entries.sort_by(|(_, a), (_, b)| {
            a.last_accessed
                .cmp(&b.last_accessed)
                .then(a.inserted.cmp(&b.inserted))
        });

        let max_seq = entries.iter().map(|(_, e)| e.inserted + 1).max().unwrap_or(0);
        let mut index = Self {
            entries: LruCache::new(capacity),
            next_seq: next_seq.max(max_seq),
        };

        let mut overflow = Vec::new();
        for (date, entry) in entries {
            if let Some(pushed_out) = index.entries.push(date, entry)
                && pushed_out.0 != date
            {
                overflow.push(pushed_out);
            }
        }
        (index, overflow)
    }

    /// Rebuilds an index from its serialized form.
    #[must_use]
    pub fn from_file(capacity: NonZeroUsize, file: IndexFile) -> (Self, Vec<(NaiveDate, IndexEntry)>) {
        let entries = file
            .entries
            .into_iter()
            .map(|record| (record.date, record.entry))
            .collect();
        Self::from_entries(capacity, entries, file.next_seq)
    }

    /// Serializes the index, least recently used first.
    #[must_use]
    pub fn to_file(&self) -> IndexFile {
        IndexFile {
            version: INDEX_VERSION,
            next_seq: self.next_seq,
            entries: self
                .entries
                .iter()
                .rev()
                .map(|(date, entry)| IndexRecord {
                    date: *date,
                    entry: entry.clone(),
                })
                .collect(),
        }
    }

    /// Returns the entry without changing recency.
    #[must_use]
    pub fn peek(&self, date: NaiveDate) -> Option<&IndexEntry> {
        self.entries.peek(&date)
    }

    /// Marks the entry as most recently used.
    pub fn touch(&mut self, date: NaiveDate, now: DateTime<Utc>) -> Option<&IndexEntry> {
        let entry = self.entries.get_mut(&date)?;
        entry.last_accessed = now;
        entry.access_count += 1;
        Some(entry)
    }

    /// Inserts or refreshes an entry, evicting the least recently used one on overflow.
    pub fn insert(
        &mut self,
        date: NaiveDate,
        kind: ImageKind,
        size: u64,
        now: DateTime<Utc>,
    ) -> InsertOutcome {
        if let Some(entry) = self.entries.get_mut(&date) {
            let replaced = entry.clone();
            entry.kind = kind;
            entry.size = size;
            entry.last_accessed = now;
            entry.access_count += 1;
            return InsertOutcome {
                replaced: Some(replaced),
                evicted: None,
            };
        }

        let entry = IndexEntry {
            kind,
            size,
            last_accessed: now,
            inserted: self.next_seq,
            access_count: 1,
        };
        self.next_seq += 1;

        InsertOutcome {
            replaced: None,
            evicted: self.entries.push(date, entry),
        }
    }

    /// Removes an entry.
    pub fn remove(&mut self, date: NaiveDate) -> Option<IndexEntry> {
        self.entries.pop(&date)
    }

    /// Drops every entry, returning them.
    pub fn drain(&mut self) -> Vec<(NaiveDate, IndexEntry)> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some(pair) = self.entries.pop_lru() {
            drained.push(pair);
        }
        drained
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Dates from least to most recently used.
    #[must_use]
    pub fn lru_order(&self) -> Vec<NaiveDate> {
        self.entries.iter().rev().map(|(date, _)| *date).collect()
    }

    /// Cached dates in calendar order.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = self.entries.iter().map(|(date, _)| *date).collect();
        dates.sort_unstable();
        dates
    }

    /// Aggregated statistics.
    #[must_use]
    pub fn stats(&self) -> TitleCacheStats {
        self.entries
            .iter()
            .fold(TitleCacheStats::default(), |mut stats, (_, entry)| {
                stats.entries += 1;
                stats.total_bytes += entry.size;
                stats.total_accesses += entry.access_count;
                stats
            })
    }
}
