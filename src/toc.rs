//! Table-of-contents and page-map trees
//!
//! Auxiliary navigation structures carried alongside the main tree and
//! persisted in their own cache blocks. Entries point into the document
//! through ordinary addresses, so they survive a cache round trip and
//! re-resolve (or fail to, becoming inert) like any saved position.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::serial::SerialBuf;

const TOC_MAGIC: &[u8] = b"toc ";
const PAGE_MAP_MAGIC: &[u8] = b"pgmp";

/// One table-of-contents entry; children nest arbitrarily deep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    pub label: String,
    pub address: Address,
    /// Page number computed by the layout collaborator, 0 before layout
    pub page: u32,
    /// Position as percent of the document, scaled by 100 (0..=10000)
    pub percent: u32,
    pub children: Vec<TocItem>,
}

impl TocItem {
    pub fn new(label: impl Into<String>, address: Address) -> Self {
        TocItem {
            label: label.into(),
            address,
            page: 0,
            percent: 0,
            children: Vec::new(),
        }
    }

    fn serialize(&self, buf: &mut SerialBuf) {
        buf.write_wstr(&self.label);
        self.address.serialize(buf);
        buf.write_u32(self.page);
        buf.write_u32(self.percent);
        buf.write_u16(self.children.len() as u16);
        for c in &self.children {
            c.serialize(buf);
        }
    }

    fn deserialize(buf: &mut SerialBuf) -> Option<TocItem> {
        let label = buf.read_wstr();
        let address = Address::deserialize(buf)?;
        let page = buf.read_u32();
        let percent = buf.read_u32();
        let count = buf.read_u16() as usize;
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            children.push(TocItem::deserialize(buf)?);
        }
        if buf.error() {
            return None;
        }
        Some(TocItem {
            label,
            address,
            page,
            percent,
            children,
        })
    }

    /// Write a whole TOC forest with its own signature
    pub(crate) fn serialize_forest(items: &[TocItem], buf: &mut SerialBuf) {
        buf.put_magic(TOC_MAGIC);
        buf.write_u16(items.len() as u16);
        for item in items {
            item.serialize(buf);
        }
    }

    pub(crate) fn deserialize_forest(buf: &mut SerialBuf) -> Option<Vec<TocItem>> {
        if !buf.check_magic(TOC_MAGIC) {
            return None;
        }
        let count = buf.read_u16() as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(TocItem::deserialize(buf)?);
        }
        Some(items)
    }
}

/// One page-map entry: a source-defined page break label and its position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMapItem {
    pub label: String,
    pub address: Address,
    /// Rendered page the source page starts on, 0 before layout
    pub page: u32,
}

impl PageMapItem {
    pub fn new(label: impl Into<String>, address: Address) -> Self {
        PageMapItem {
            label: label.into(),
            address,
            page: 0,
        }
    }

    pub(crate) fn serialize_list(items: &[PageMapItem], buf: &mut SerialBuf) {
        buf.put_magic(PAGE_MAP_MAGIC);
        buf.write_u32(items.len() as u32);
        for item in items {
            buf.write_wstr(&item.label);
            item.address.serialize(buf);
            buf.write_u32(item.page);
        }
    }

    pub(crate) fn deserialize_list(buf: &mut SerialBuf) -> Option<Vec<PageMapItem>> {
        if !buf.check_magic(PAGE_MAP_MAGIC) {
            return None;
        }
        let count = buf.read_u32() as usize;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let label = buf.read_wstr();
            let address = Address::deserialize(buf)?;
            let page = buf.read_u32();
            if buf.error() {
                return None;
            }
            items.push(PageMapItem {
                label,
                address,
                page,
            });
        }
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_forest_roundtrip() {
        let mut chapter = TocItem::new("Chapter 1", Address::new(vec![0, 1], None));
        chapter.page = 12;
        chapter
            .children
            .push(TocItem::new("Section 1.1", Address::new(vec![0, 1, 3], None)));
        let forest = vec![chapter, TocItem::new("Chapter 2", Address::new(vec![0, 2], None))];

        let mut buf = SerialBuf::new(256);
        TocItem::serialize_forest(&forest, &mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        assert_eq!(TocItem::deserialize_forest(&mut buf), Some(forest));
    }

    #[test]
    fn test_page_map_roundtrip() {
        let items = vec![
            PageMapItem::new("ix", Address::new(vec![0, 0], Some(0))),
            PageMapItem::new("x", Address::new(vec![0, 4], None)),
        ];
        let mut buf = SerialBuf::new(256);
        PageMapItem::serialize_list(&items, &mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        assert_eq!(PageMapItem::deserialize_list(&mut buf), Some(items));
    }

    #[test]
    fn test_truncated_toc_fails() {
        let forest = vec![TocItem::new("Chapter", Address::new(vec![1], None))];
        let mut buf = SerialBuf::new(64);
        TocItem::serialize_forest(&forest, &mut buf);
        let mut bytes = buf.into_bytes();
        bytes.truncate(bytes.len() / 2);
        let mut buf = SerialBuf::from_bytes(bytes);
        assert_eq!(TocItem::deserialize_forest(&mut buf), None);
    }
}
