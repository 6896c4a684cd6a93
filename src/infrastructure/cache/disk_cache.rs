//! Disk-backed, per-title strip cache with LRU eviction.
//!
//! Layout: `<root>/<title>/<YYYY-MM-DD>.<ext>` plus `<root>/<title>/index.json`.
//! Every file is written to a temp file in the same directory and renamed
//! into place, so readers never see partial content.

use std::collections::HashMap;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{ImageKind, TitleId};
use crate::domain::ports::{CacheError, CacheResult, ComicCachePort, TitleCacheStats};

use super::title_index::{IndexEntry, IndexFile, TitleIndex};

/// Default number of strips kept per title.
pub const DEFAULT_CAPACITY_PER_TITLE: usize = 200;

const INDEX_FILE_NAME: &str = "index.json";
const TEMP_PREFIX: &str = ".tmp";

/// Hits recorded in memory before the index is written back.
const TOUCH_FLUSH_INTERVAL: usize = 16;

/// Lock-protected state of one title directory.
struct TitleState {
    dir: PathBuf,
    index: Option<TitleIndex>,
    unsaved_touches: usize,
}

impl TitleState {
    async fn save_index(&mut self) {
        if let Some(index) = &self.index {
            persist_index_best_effort(&self.dir, index).await;
        }
        self.unsaved_touches = 0;
    }
}

type TitleHandle = Arc<Mutex<TitleState>>;

/// Disk-based strip cache.
///
/// Each title has its own async mutex; the title map itself is only locked
/// long enough to clone a handle, so lookups for different titles never wait
/// on each other.
pub struct DiskComicCache {
    root: PathBuf,
    capacity: NonZeroUsize,
    titles: RwLock<HashMap<TitleId, TitleHandle>>,
}

impl std::fmt::Debug for DiskComicCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskComicCache")
            .field("root", &self.root)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl DiskComicCache {
    /// Creates a cache rooted at `root` holding up to `capacity` strips per title.
    ///
    /// # Errors
    /// Returns error if the root directory cannot be created.
    pub async fn new(root: PathBuf, capacity: usize) -> CacheResult<Self> {
        fs::create_dir_all(&root)
            .await
            .map_err(|e| CacheError::io("Failed to create cache dir", e))?;

        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        debug!(root = %root.display(), capacity = capacity.get(), "Opened comic cache");

        Ok(Self {
            root,
            capacity,
            titles: RwLock::new(HashMap::new()),
        })
    }

    /// Root directory of the cache.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum number of strips kept per title.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn handle(&self, title: &TitleId) -> CacheResult<TitleHandle> {
        if !title.is_valid_slug() {
            return Err(CacheError::InvalidTitle(title.to_string()));
        }

        if let Some(handle) = self.titles.read().get(title) {
            return Ok(handle.clone());
        }

        let mut titles = self.titles.write();
        let handle = titles
            .entry(title.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(TitleState {
                    dir: self.root.join(title.as_str()),
                    index: None,
                    unsaved_touches: 0,
                }))
            })
            .clone();
        Ok(handle)
    }

    /// Locks a title and loads its index on first use.
    async fn lock_title(&self, title: &TitleId) -> CacheResult<OwnedMutexGuard<TitleState>> {
        let mut guard = self.handle(title)?.lock_owned().await;
        if guard.index.is_none() {
            let index = load_index(&guard.dir, self.capacity).await?;
            debug!(title = %title, entries = index.len(), "Loaded title index");
            guard.index = Some(index);
        }
        Ok(guard)
    }

    /// Reads a cached strip and marks it most recently used.
    ///
    /// The new recency is kept in memory and written to `index.json` every
    /// few hits, on the next `put`, or on [`Self::flush`].
    pub async fn get(&self, title: &TitleId, date: NaiveDate) -> Option<(Bytes, ImageKind)> {
        let mut guard = match self.lock_title(title).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(title = %title, error = %e, "Cache unavailable for title");
                return None;
            }
        };
        let state = &mut *guard;

        let Some(kind) = state.index.as_ref()?.peek(date).map(|entry| entry.kind) else {
            trace!(title = %title, date = %date, "Cache miss");
            return None;
        };

        let path = entry_path(&state.dir, date, kind);
        match fs::read(&path).await {
            Ok(bytes) => {
                if let Some(index) = state.index.as_mut() {
                    index.touch(date, Utc::now());
                }
                state.unsaved_touches += 1;
                if state.unsaved_touches >= TOUCH_FLUSH_INTERVAL {
                    state.save_index().await;
                }
                trace!(title = %title, date = %date, path = %path.display(), "Cache hit");
                Some((Bytes::from(bytes), kind))
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to read cached strip");
                }
                debug!(title = %title, date = %date, "Dropping index entry without readable file");
                if let Some(index) = state.index.as_mut() {
                    index.remove(date);
                }
                state.save_index().await;
                None
            }
        }
    }

    /// Stores a strip, replacing any previous version for the same date.
    ///
    /// # Errors
    /// Returns error if the file cannot be written; the previous cache state
    /// is left untouched in that case.
    pub async fn put(
        &self,
        title: &TitleId,
        date: NaiveDate,
        bytes: Bytes,
        kind: ImageKind,
    ) -> CacheResult<()> {
        let mut guard = self.lock_title(title).await?;
        let state = &mut *guard;

        fs::create_dir_all(&state.dir)
            .await
            .map_err(|e| CacheError::io("Failed to create title dir", e))?;

        let path = entry_path(&state.dir, date, kind);
        let size = bytes.len() as u64;
        write_atomic(path.clone(), bytes)
            .await
            .map_err(|e| CacheError::io("Failed to write cache file", e))?;

        let Some(index) = state.index.as_mut() else {
            return Err(CacheError::IndexError("index not loaded".to_string()));
        };
        let outcome = index.insert(date, kind, size, Utc::now());

        if let Some(old) = outcome.replaced
            && old.kind != kind
        {
            remove_file_logged(&entry_path(&state.dir, date, old.kind)).await;
        }
        if let Some((evicted_date, evicted)) = outcome.evicted {
            debug!(title = %title, date = %evicted_date, "Evicting least recently used strip");
            remove_file_logged(&entry_path(&state.dir, evicted_date, evicted.kind)).await;
        }

        let entries = index.len();
        state.save_index().await;

        debug!(
            title = %title,
            date = %date,
            kind = %kind,
            size = size,
            entries = entries,
            "Stored strip in cache"
        );
        Ok(())
    }

    /// Writes recency changes from recent hits back to each title's index.
    pub async fn flush(&self) {
        let handles: Vec<(TitleId, TitleHandle)> = self
            .titles
            .read()
            .iter()
            .map(|(title, handle)| (title.clone(), handle.clone()))
            .collect();

        for (title, handle) in handles {
            let mut state = handle.lock().await;
            if state.unsaved_touches > 0 {
                trace!(title = %title, touches = state.unsaved_touches, "Flushing cache index");
                state.save_index().await;
            }
        }
    }

    /// Returns true if the strip is cached, without changing recency.
    pub async fn contains(&self, title: &TitleId, date: NaiveDate) -> bool {
        match self.lock_title(title).await {
            Ok(guard) => guard
                .index
                .as_ref()
                .is_some_and(|index| index.peek(date).is_some()),
            Err(_) => false,
        }
    }

    /// Cached dates of a title in calendar order.
    ///
    /// # Errors
    /// Returns error if the title directory cannot be read.
    pub async fn cached_dates(&self, title: &TitleId) -> CacheResult<Vec<NaiveDate>> {
        let guard = self.lock_title(title).await?;
        Ok(guard.index.as_ref().map(TitleIndex::dates).unwrap_or_default())
    }

    /// Dates of a title from least to most recently used.
    ///
    /// # Errors
    /// Returns error if the title directory cannot be read.
    pub async fn lru_order(&self, title: &TitleId) -> CacheResult<Vec<NaiveDate>> {
        let guard = self.lock_title(title).await?;
        Ok(guard
            .index
            .as_ref()
            .map(TitleIndex::lru_order)
            .unwrap_or_default())
    }

    /// Statistics for one title.
    ///
    /// # Errors
    /// Returns error if the title directory cannot be read.
    pub async fn stats(&self, title: &TitleId) -> CacheResult<TitleCacheStats> {
        let guard = self.lock_title(title).await?;
        Ok(guard.index.as_ref().map(TitleIndex::stats).unwrap_or_default())
    }

    /// Statistics for every title directory under the root, sorted by title.
    ///
    /// # Errors
    /// Returns error if the root directory cannot be read.
    pub async fn stats_all(&self) -> CacheResult<Vec<(TitleId, TitleCacheStats)>> {
        let mut stats = Vec::new();
        for title in self.title_dirs().await? {
            stats.push((title.clone(), self.stats(&title).await?));
        }
        stats.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(stats)
    }

    /// Removes every cached strip of a title.
    ///
    /// # Errors
    /// Returns error if the title directory cannot be read.
    pub async fn clear(&self, title: &TitleId) -> CacheResult<()> {
        let mut guard = self.lock_title(title).await?;
        let state = &mut *guard;
        if let Some(index) = state.index.as_mut() {
            for (date, entry) in index.drain() {
                remove_file_logged(&entry_path(&state.dir, date, entry.kind)).await;
            }
        }
        state.unsaved_touches = 0;
        remove_file_logged(&state.dir.join(INDEX_FILE_NAME)).await;
        if fs::remove_dir(&state.dir).await.is_err() {
            trace!(dir = %state.dir.display(), "Title dir not removed");
        }
        debug!(title = %title, "Cleared title cache");
        Ok(())
    }

    /// Removes every cached strip of every title.
    ///
    /// # Errors
    /// Returns error if the root directory cannot be read.
    pub async fn clear_all(&self) -> CacheResult<()> {
        for title in self.title_dirs().await? {
            self.clear(&title).await?;
        }
        info!(root = %self.root.display(), "Cleared comic cache");
        Ok(())
    }

    async fn title_dirs(&self) -> CacheResult<Vec<TitleId>> {
        let mut titles = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| CacheError::io("Failed to read cache dir", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("Failed to read entry", e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                let title = TitleId::new(name);
                if title.is_valid_slug() {
                    titles.push(title);
                }
            }
        }
        Ok(titles)
    }
}

#[async_trait::async_trait]
impl ComicCachePort for DiskComicCache {
    async fn get(&self, title: &TitleId, date: NaiveDate) -> Option<(Bytes, ImageKind)> {
        Self::get(self, title, date).await
    }

    async fn put(
        &self,
        title: &TitleId,
        date: NaiveDate,
        bytes: Bytes,
        kind: ImageKind,
    ) -> CacheResult<()> {
        Self::put(self, title, date, bytes, kind).await
    }

    async fn contains(&self, title: &TitleId, date: NaiveDate) -> bool {
        Self::contains(self, title, date).await
    }
}

fn entry_path(dir: &Path, date: NaiveDate, kind: ImageKind) -> PathBuf {
    dir.join(format!("{}.{}", date.format("%Y-%m-%d"), kind.extension()))
}

fn parse_entry_name(name: &str) -> Option<(NaiveDate, ImageKind)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let date = NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()?;
    let kind = ImageKind::from_extension(ext)?;
    Some((date, kind))
}

/// Writes `bytes` to a sibling temp file and renames it over `path`.
async fn write_atomic(path: PathBuf, bytes: Bytes) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other("Invalid path"))?;
        let mut temp_file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)?;
        temp_file.write_all(&bytes)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::other(format!("Write task panicked: {e}")))?
}

async fn persist_index_best_effort(dir: &Path, index: &TitleIndex) {
    let json = match serde_json::to_vec_pretty(&index.to_file()) {
        Ok(json) => json,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to serialize cache index");
            return;
        }
    };
    if fs::create_dir_all(dir).await.is_err() {
        return;
    }
    if let Err(e) = write_atomic(dir.join(INDEX_FILE_NAME), Bytes::from(json)).await {
        warn!(dir = %dir.display(), error = %e, "Failed to write cache index");
    }
}

async fn remove_file_logged(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove cache file");
    }
}

/// Loads a title's index, reconciling `index.json` with the files on disk.
///
/// Files without an index row are adopted using their modification time;
/// rows without a file are dropped; leftover temp files are deleted. Files
/// with a non-canonical extension (`.jpeg`, `.PNG`) are renamed to the name
/// lookups use, or deleted when that date already has a file.
async fn load_index(dir: &Path, capacity: NonZeroUsize) -> CacheResult<TitleIndex> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(TitleIndex::new(capacity));
    }

    let persisted = read_index_file(dir).await;
    let next_seq = persisted.as_ref().map_or(0, |file| file.next_seq);
    let mut recorded: HashMap<NaiveDate, IndexEntry> = persisted
        .map(|file| {
            file.entries
                .into_iter()
                .map(|record| (record.date, record.entry))
                .collect()
        })
        .unwrap_or_default();

    let mut on_disk: HashMap<NaiveDate, (ImageKind, u64, DateTime<Utc>)> = HashMap::new();
    let mut renames: Vec<(PathBuf, NaiveDate, ImageKind, u64, DateTime<Utc>)> = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| CacheError::io("Failed to read title dir", e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CacheError::io("Failed to read entry", e))?
    {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };

        if name.starts_with(TEMP_PREFIX) {
            debug!(path = %path.display(), "Removing leftover temp file");
            remove_file_logged(&path).await;
            continue;
        }

        let Some((date, kind)) = parse_entry_name(&name) else {
            continue;
        };
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        let modified: DateTime<Utc> = meta
            .modified()
            .map_or(DateTime::<Utc>::UNIX_EPOCH, DateTime::from);

        if entry_path(dir, date, kind) != path {
            renames.push((path, date, kind, meta.len(), modified));
            continue;
        }

        match on_disk.get(&date) {
            Some((_, _, existing_modified)) if *existing_modified >= modified => {
                remove_file_logged(&path).await;
            }
            Some((existing_kind, _, _)) => {
                remove_file_logged(&entry_path(dir, date, *existing_kind)).await;
                on_disk.insert(date, (kind, meta.len(), modified));
            }
            None => {
                on_disk.insert(date, (kind, meta.len(), modified));
            }
        }
    }

    for (path, date, kind, size, modified) in renames {
        if on_disk.contains_key(&date) {
            debug!(path = %path.display(), "Removing duplicate strip with non-canonical name");
            remove_file_logged(&path).await;
            continue;
        }
        let canonical = entry_path(dir, date, kind);
        match fs::rename(&path, &canonical).await {
            Ok(()) => {
                debug!(from = %path.display(), to = %canonical.display(), "Renamed cached strip");
                on_disk.insert(date, (kind, size, modified));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to rename cached strip");
                remove_file_logged(&path).await;
            }
        }
    }

    let mut adopted = 0usize;
    let rows: Vec<(NaiveDate, IndexEntry)> = on_disk
        .into_iter()
        .map(|(date, (kind, size, modified))| match recorded.remove(&date) {
            Some(entry) if entry.kind == kind => (date, IndexEntry { size, ..entry }),
            _ => {
                adopted += 1;
                (
                    date,
                    IndexEntry {
                        kind,
                        size,
                        last_accessed: modified,
                        inserted: 0,
                        access_count: 0,
                    },
                )
            }
        })
        .collect();

    if adopted > 0 || !recorded.is_empty() {
        debug!(
            dir = %dir.display(),
            adopted = adopted,
            dropped = recorded.len(),
            "Reconciled cache index with disk"
        );
    }

    let (index, overflow) = TitleIndex::from_entries(capacity, rows, next_seq);
    for (date, entry) in &overflow {
        remove_file_logged(&entry_path(dir, *date, entry.kind)).await;
    }
    if adopted > 0 || !recorded.is_empty() || !overflow.is_empty() {
        persist_index_best_effort(dir, &index).await;
    }

    Ok(index)
}

async fn read_index_file(dir: &Path) -> Option<IndexFile> {
    let path = dir.join(INDEX_FILE_NAME);
    let content = fs::read(&path).await.ok()?;
    match serde_json::from_slice::<IndexFile>(&content) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable cache index");
            None
        }
    }
}
