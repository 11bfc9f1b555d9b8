//! Document cache directory
//!
//! One directory of cache files, keyed by content fingerprint, kept under a
//! byte budget. A small index file records the known entries in recency
//! order; it is rewritten only when it changes. Entries whose source bytes,
//! format flags, or dom version no longer match are discarded and rebuilt,
//! never patched. A new entry is written to a temporary name and renamed
//! into place after its header is finalized, so readers only ever see
//! complete files.

pub mod file;

use std::fs;
use std::path::{Path, PathBuf};

use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::serial::SerialBuf;
use file::CacheFile;

const INDEX_FILE: &str = "folio-cache.inx";
const INDEX_MAGIC: &[u8] = b"FolioInx";
const ENTRY_EXT: &str = "cf";

/// Content identity of a document: SHA-256 of its raw bytes plus the size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    hash: String,
    size: u64,
}

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Fingerprint {
        let hash = hex::encode(Sha256::digest(bytes));
        Fingerprint {
            hash,
            size: bytes.len() as u64,
        }
    }

    /// Cache entry file name for this document under the given flags
    fn file_name(&self, flags: u32) -> String {
        format!("{}-{:016x}-{:08x}.{ENTRY_EXT}", &self.hash[..16], self.size, flags)
    }
}

/// Result of looking up a cache entry
#[derive(Debug)]
pub enum CacheLookup {
    /// A valid entry was found and opened
    Opened(CacheFile),
    /// An entry existed but failed validation and was removed
    Invalid,
    /// No entry for this document
    Missing,
}

/// The cache directory manager
pub struct DocCache {
    dir: PathBuf,
    max_bytes: u64,
    /// Entry file names with sizes, most recently used first
    entries: LruCache<String, u64>,
    index_dirty: bool,
}

impl std::fmt::Debug for DocCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocCache")
            .field("dir", &self.dir)
            .field("max_bytes", &self.max_bytes)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl DocCache {
    /// Open (creating if needed) a cache directory with a size budget
    pub fn init(dir: &Path, max_bytes: u64) -> Result<DocCache> {
        fs::create_dir_all(dir)?;
        let mut cache = DocCache {
            dir: dir.to_path_buf(),
            max_bytes,
            entries: LruCache::unbounded(),
            index_dirty: false,
        };
        cache.load_index();
        cache.remove_unindexed_files();
        info!(?dir, entries = cache.entries.len(), "document cache ready");
        Ok(cache)
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Read the index file; an unreadable or corrupt index just means an
    /// empty cache
    fn load_index(&mut self) {
        let Ok(bytes) = fs::read(self.index_path()) else {
            return;
        };
        let mut buf = SerialBuf::from_bytes(bytes);
        if !buf.check_magic(INDEX_MAGIC) {
            warn!("cache index has bad magic, starting empty");
            return;
        }
        let count = buf.read_u32() as usize;
        let mut listed = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let name = buf.read_str();
            let size = buf.read_u64();
            if buf.error() {
                break;
            }
            listed.push((name, size));
        }
        if buf.error() || !buf.check_crc(buf.pos()) {
            warn!("cache index corrupt, starting empty");
            self.index_dirty = true;
            return;
        }
        // stored most-recent-first; push in reverse to rebuild recency
        for (name, size) in listed.into_iter().rev() {
            if self.dir.join(&name).exists() {
                self.entries.push(name, size);
            } else {
                debug!(name, "indexed cache entry missing on disk");
                self.index_dirty = true;
            }
        }
    }

    /// Rewrite the index, but only when something changed
    fn save_index(&mut self) {
        if !self.index_dirty {
            return;
        }
        let mut buf = SerialBuf::new(1024);
        buf.put_magic(INDEX_MAGIC);
        buf.write_u32(self.entries.len() as u32);
        // LruCache iterates most-recent-first
        for (name, size) in self.entries.iter() {
            buf.write_str(name);
            buf.write_u64(*size);
        }
        buf.put_crc(buf.pos());
        match fs::write(self.index_path(), buf.as_slice()) {
            Ok(()) => self.index_dirty = false,
            Err(e) => warn!(error = %e, "cache index write failed"),
        }
    }

    /// Delete entry files the index does not know about (crashed writes,
    /// foreign droppings)
    fn remove_unindexed_files(&mut self) {
        let Ok(read) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in read.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == INDEX_FILE {
                continue;
            }
            if self.entries.peek(&name).is_none() {
                debug!(name, "removing unindexed cache file");
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    fn total_size(&self) -> u64 {
        self.entries.iter().map(|(_, s)| *s).sum()
    }

    /// Evict oldest-access-first until under budget, never touching the
    /// entry named by `keep`
    fn reserve(&mut self, keep: Option<&str>) {
        while self.total_size() > self.max_bytes && self.entries.len() > 1 {
            let oldest = self
                .entries
                .iter()
                .rev()
                .map(|(n, _)| n.clone())
                .find(|n| Some(n.as_str()) != keep);
            let Some(name) = oldest else { break };
            if let Some(size) = self.entries.pop(&name) {
                info!(name, size, "evicting cache entry over budget");
                let _ = fs::remove_file(self.dir.join(&name));
                self.index_dirty = true;
            }
        }
    }

    /// Look up and validate the entry for a document. An invalid entry is
    /// deleted so the next open does not trip over it again.
    pub fn open_existing(
        &mut self,
        fingerprint: &Fingerprint,
        flags: u32,
        dom_version: u32,
    ) -> CacheLookup {
        let name = fingerprint.file_name(flags);
        let path = self.dir.join(&name);
        if !path.exists() {
            return CacheLookup::Missing;
        }
        match CacheFile::open(&path, dom_version, flags) {
            Some(file) => {
                // touch for recency
                let size = file.size();
                self.entries.push(name, size);
                self.index_dirty = true;
                self.save_index();
                CacheLookup::Opened(file)
            }
            None => {
                warn!(name, "discarding invalid cache entry");
                let _ = fs::remove_file(&path);
                if self.entries.pop(&name).is_some() {
                    self.index_dirty = true;
                    self.save_index();
                }
                CacheLookup::Invalid
            }
        }
    }

    /// Start writing a new entry. The file lives under a temporary name
    /// until `publish`.
    pub fn create_new(
        &mut self,
        fingerprint: &Fingerprint,
        flags: u32,
        dom_version: u32,
    ) -> Result<CacheFile> {
        let tmp = self
            .dir
            .join(format!("{}.tmp", fingerprint.file_name(flags)));
        CacheFile::create(&tmp, dom_version, flags)
    }

    /// Finalize a written entry and atomically rename it into place; the
    /// returned handle reads from the published path
    pub fn publish(&mut self, mut file: CacheFile) -> Result<CacheFile> {
        file.finalize()?;
        let tmp = file.path().to_path_buf();
        let name = tmp
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| EngineError::Cache("unnameable cache entry".to_string()))?
            .to_string();
        let target = self.dir.join(&name);
        fs::rename(&tmp, &target)?;
        file.set_path(target);
        let size = file.size();
        self.entries.push(name.clone(), size);
        self.index_dirty = true;
        self.reserve(Some(&name));
        self.save_index();
        info!(name, size, "cache entry published");
        Ok(file)
    }

    /// Remove every entry and the index
    pub fn clear(&mut self) -> Result<()> {
        let names: Vec<String> = self.entries.iter().map(|(n, _)| n.clone()).collect();
        for name in names {
            let _ = fs::remove_file(self.dir.join(&name));
        }
        self.entries.clear();
        let _ = fs::remove_file(self.index_path());
        self.index_dirty = false;
        info!("document cache cleared");
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Change the budget and evict immediately if now over it
    pub fn set_max_bytes(&mut self, max_bytes: u64) {
        self.max_bytes = max_bytes;
        self.reserve(None);
        self.save_index();
    }

    /// Keep the most recent `n` entries regardless of size
    pub fn trim_to_count(&mut self, n: usize) {
        let n = n.max(1);
        while self.entries.len() > n {
            if let Some((name, _)) = self.entries.pop_lru() {
                let _ = fs::remove_file(self.dir.join(&name));
                self.index_dirty = true;
            }
        }
        self.save_index();
    }
}

impl Drop for DocCache {
    fn drop(&mut self) {
        self.save_index();
    }
}
