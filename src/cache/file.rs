//! Cache file format
//!
//! A cache file is a fixed-size header followed by typed, length-delimited
//! blocks, each carrying its own CRC. The header is written with the dirty
//! flag set and rewritten clean only when every block has reached disk, so
//! a crash mid-write leaves a file that readers reject outright. Nothing in
//! a file is trusted before its magic and CRC check out.
//!
//! Layout:
//! ```text
//! header  = magic(8) format_version(u32) dom_version(u32) flags(u32)
//!           dirty(u8) crc(u32)
//! block   = magic(4) kind(u16) index(u32) len(u32) payload crc(u32)
//! ```

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::serial::SerialBuf;

const FILE_MAGIC: &[u8; 8] = b"FolioCch";
const BLOCK_MAGIC: &[u8; 4] = b"blk:";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 4 + 1 + 4;

/// Typed block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Interning tables plus the root node id
    NameTables,
    /// Tree shape: parents and child lists for every slot
    Structure,
    /// One element pool part's payloads
    ElemPart,
    /// One text pool part's payloads
    TextPart,
    /// Table-of-contents forest
    Toc,
    /// Page-map list
    PageMap,
}

impl BlockKind {
    fn to_u16(self) -> u16 {
        match self {
            BlockKind::NameTables => 1,
            BlockKind::Structure => 2,
            BlockKind::ElemPart => 3,
            BlockKind::TextPart => 4,
            BlockKind::Toc => 5,
            BlockKind::PageMap => 6,
        }
    }

    fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(BlockKind::NameTables),
            2 => Some(BlockKind::Structure),
            3 => Some(BlockKind::ElemPart),
            4 => Some(BlockKind::TextPart),
            5 => Some(BlockKind::Toc),
            6 => Some(BlockKind::PageMap),
            _ => None,
        }
    }
}

fn header_bytes(dom_version: u32, flags: u32, dirty: bool) -> Vec<u8> {
    let mut buf = SerialBuf::new(HEADER_LEN);
    buf.put_magic(FILE_MAGIC);
    buf.write_u32(FORMAT_VERSION);
    buf.write_u32(dom_version);
    buf.write_u32(flags);
    buf.write_bool(dirty);
    buf.put_crc(buf.pos());
    buf.into_bytes()
}

/// An open cache file: either being written (blocks appended, header dirty)
/// or opened read-only after validation
pub struct CacheFile {
    file: File,
    path: PathBuf,
    dom_version: u32,
    flags: u32,
    /// payload offset and length of the newest block per (kind, index)
    blocks: HashMap<(BlockKind, u32), (u64, u32)>,
    writable: bool,
}

impl std::fmt::Debug for CacheFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFile")
            .field("path", &self.path)
            .field("dom_version", &self.dom_version)
            .field("blocks", &self.blocks.len())
            .field("writable", &self.writable)
            .finish()
    }
}

impl CacheFile {
    /// Create a fresh cache file with a dirty header
    pub fn create(path: &Path, dom_version: u32, flags: u32) -> Result<CacheFile> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&header_bytes(dom_version, flags, true))?;
        Ok(CacheFile {
            file,
            path: path.to_path_buf(),
            dom_version,
            flags,
            blocks: HashMap::new(),
            writable: true,
        })
    }

    /// Open and validate an existing cache file. Returns `None` on any
    /// header or block-table problem: bad magic, bad CRC, a dirty flag left
    /// over from an interrupted write, or mismatched dom version/flags.
    pub fn open(path: &Path, dom_version: u32, flags: u32) -> Option<CacheFile> {
        let mut file = OpenOptions::new().read(true).open(path).ok()?;
        let mut header = vec![0u8; HEADER_LEN];
        file.read_exact(&mut header).ok()?;
        let mut buf = SerialBuf::from_bytes(header);
        if !buf.check_magic(FILE_MAGIC) {
            warn!(?path, "cache file has bad magic");
            return None;
        }
        let format_version = buf.read_u32();
        let file_dom_version = buf.read_u32();
        let file_flags = buf.read_u32();
        let dirty = buf.read_bool();
        if !buf.check_crc(buf.pos()) {
            warn!(?path, "cache header CRC mismatch");
            return None;
        }
        if format_version != FORMAT_VERSION {
            debug!(?path, format_version, "cache format version mismatch");
            return None;
        }
        if dirty {
            warn!(?path, "cache file left dirty by an interrupted write");
            return None;
        }
        if file_dom_version != dom_version || file_flags != flags {
            debug!(
                ?path,
                file_dom_version, file_flags, "cache entry built with different options"
            );
            return None;
        }

        let mut cache = CacheFile {
            file,
            path: path.to_path_buf(),
            dom_version,
            flags,
            blocks: HashMap::new(),
            writable: false,
        };
        if !cache.scan_blocks() {
            warn!(?path, "cache block table unreadable");
            return None;
        }
        Some(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dom_version(&self) -> u32 {
        self.dom_version
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Walk block frames building the offset table; a later block for the
    /// same (kind, index) supersedes an earlier one
    fn scan_blocks(&mut self) -> bool {
        let len = match self.file.seek(SeekFrom::End(0)) {
            Ok(l) => l,
            Err(_) => return false,
        };
        let mut pos = HEADER_LEN as u64;
        while pos < len {
            if self.file.seek(SeekFrom::Start(pos)).is_err() {
                return false;
            }
            let mut frame = [0u8; 4 + 2 + 4 + 4];
            if self.file.read_exact(&mut frame).is_err() {
                return false;
            }
            let mut buf = SerialBuf::from_bytes(frame.to_vec());
            if !buf.check_magic(BLOCK_MAGIC) {
                return false;
            }
            let Some(kind) = BlockKind::from_u16(buf.read_u16()) else {
                return false;
            };
            let index = buf.read_u32();
            let block_len = buf.read_u32();
            let payload_at = pos + frame.len() as u64;
            let end = payload_at + block_len as u64 + 4;
            if end > len {
                return false;
            }
            self.blocks.insert((kind, index), (payload_at, block_len));
            pos = end;
        }
        true
    }

    /// Append one block; only valid while the file is being written
    pub fn write_block(&mut self, kind: BlockKind, index: u32, payload: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(EngineError::Cache(
                "write_block on a published cache file".to_string(),
            ));
        }
        let pos = self.file.seek(SeekFrom::End(0))?;
        let mut head = SerialBuf::new(16);
        head.put_magic(BLOCK_MAGIC);
        head.write_u16(kind.to_u16());
        head.write_u32(index);
        head.write_u32(payload.len() as u32);
        let header_len = head.pos();
        self.file.write_all(head.as_slice())?;
        self.file.write_all(payload)?;
        self.file.write_all(&crc32c::crc32c(payload).to_le_bytes())?;
        self.blocks
            .insert((kind, index), (pos + header_len as u64, payload.len() as u32));
        Ok(())
    }

    /// Read one block's payload, verifying its CRC; `None` if missing or
    /// corrupt
    pub fn read_block(&mut self, kind: BlockKind, index: u32) -> Option<Vec<u8>> {
        let &(offset, len) = self.blocks.get(&(kind, index))?;
        if self.file.seek(SeekFrom::Start(offset)).is_err() {
            return None;
        }
        let mut bytes = vec![0u8; len as usize + 4];
        if self.file.read_exact(&mut bytes).is_err() {
            warn!(?kind, index, "cache block read failed");
            return None;
        }
        let payload = bytes[..len as usize].to_vec();
        let stored = u32::from_le_bytes([
            bytes[len as usize],
            bytes[len as usize + 1],
            bytes[len as usize + 2],
            bytes[len as usize + 3],
        ]);
        if stored != crc32c::crc32c(&payload) {
            warn!(?kind, index, "cache block CRC mismatch");
            return None;
        }
        Some(payload)
    }

    pub fn has_block(&self, kind: BlockKind, index: u32) -> bool {
        self.blocks.contains_key(&(kind, index))
    }

    /// Rewrite the header clean and sync everything to disk; the file
    /// becomes read-only from here on
    pub(crate) fn finalize(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(0))?;
        self.file
            .write_all(&header_bytes(self.dom_version, self.flags, false))?;
        self.file.sync_all()?;
        self.writable = false;
        Ok(())
    }

    /// Size of the file on disk
    pub fn size(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }

    /// Rebind to the path the file was renamed to after publishing
    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_write_finalize_reopen() {
        let dir = tmp();
        let path = dir.path().join("a.cf");
        let mut f = CacheFile::create(&path, 20200824, 7).unwrap();
        f.write_block(BlockKind::Toc, 0, b"toc bytes").unwrap();
        f.write_block(BlockKind::ElemPart, 3, b"part three").unwrap();
        f.finalize().unwrap();
        drop(f);

        let mut f = CacheFile::open(&path, 20200824, 7).unwrap();
        assert_eq!(f.read_block(BlockKind::Toc, 0).unwrap(), b"toc bytes");
        assert_eq!(
            f.read_block(BlockKind::ElemPart, 3).unwrap(),
            b"part three"
        );
        assert_eq!(f.read_block(BlockKind::PageMap, 0), None);
    }

    #[test]
    fn test_dirty_file_rejected() {
        let dir = tmp();
        let path = dir.path().join("a.cf");
        let mut f = CacheFile::create(&path, 20200824, 0).unwrap();
        f.write_block(BlockKind::Toc, 0, b"x").unwrap();
        // no finalize: header stays dirty
        drop(f);
        assert!(CacheFile::open(&path, 20200824, 0).is_none());
    }

    #[test]
    fn test_version_and_flags_mismatch_rejected() {
        let dir = tmp();
        let path = dir.path().join("a.cf");
        let mut f = CacheFile::create(&path, 20200824, 1).unwrap();
        f.finalize().unwrap();
        drop(f);
        assert!(CacheFile::open(&path, 1, 1).is_none());
        assert!(CacheFile::open(&path, 20200824, 2).is_none());
        assert!(CacheFile::open(&path, 20200824, 1).is_some());
    }

    #[test]
    fn test_corrupt_block_rejected() {
        let dir = tmp();
        let path = dir.path().join("a.cf");
        let mut f = CacheFile::create(&path, 20200824, 0).unwrap();
        f.write_block(BlockKind::Structure, 0, b"structural payload")
            .unwrap();
        f.finalize().unwrap();
        drop(f);

        // flip one payload byte
        let mut bytes = std::fs::read(&path).unwrap();
        let at = bytes.len() - 8;
        bytes[at] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        let mut f = CacheFile::open(&path, 20200824, 0).unwrap();
        assert_eq!(f.read_block(BlockKind::Structure, 0), None);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tmp();
        let path = dir.path().join("a.cf");
        let mut f = CacheFile::create(&path, 20200824, 0).unwrap();
        f.write_block(BlockKind::Toc, 0, b"0123456789").unwrap();
        f.finalize().unwrap();
        drop(f);

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(CacheFile::open(&path, 20200824, 0).is_none());
    }

    #[test]
    fn test_later_block_supersedes() {
        let dir = tmp();
        let path = dir.path().join("a.cf");
        let mut f = CacheFile::create(&path, 20200824, 0).unwrap();
        f.write_block(BlockKind::Toc, 0, b"old").unwrap();
        f.write_block(BlockKind::Toc, 0, b"new").unwrap();
        f.finalize().unwrap();
        drop(f);
        let mut f = CacheFile::open(&path, 20200824, 0).unwrap();
        assert_eq!(f.read_block(BlockKind::Toc, 0).unwrap(), b"new");
    }
}
