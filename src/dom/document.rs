//! Document: tree facade over the node arena
//!
//! Owns the arena, the element/attribute/namespace interning tables, the
//! table-of-contents and page-map trees, and (when opened through the cache)
//! the cache file used to reload swapped node payloads. One thread owns a
//! document at a time; nothing here locks.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::cache::file::{BlockKind, CacheFile};
use crate::cache::{CacheLookup, DocCache, Fingerprint};
use crate::context::{EngineConfig, EngineContext};
use crate::dom::arena::NodeArena;
use crate::dom::node::{Attribute, BoxKind, ElementData, NodeData, NodeId, NodeKind};
use crate::error::{EngineError, Result};
use crate::serial::SerialBuf;
use crate::toc::{PageMapItem, TocItem};
use crate::traits::{ImportSink, Importer};

/// Element names given to synthetic wrapper nodes, visible in legacy (V1)
/// address paths
pub fn box_element_name(kind: BoxKind) -> &'static str {
    match kind {
        BoxKind::FloatBox => "floatBox",
        BoxKind::InlineBox => "inlineBox",
        BoxKind::AutoBox => "autoBoxing",
    }
}

#[derive(Debug, Default)]
struct Interner {
    names: Vec<String>,
    index: HashMap<String, u16>,
}

impl Interner {
    fn new() -> Self {
        let mut i = Interner::default();
        // id 0 is reserved for "no name"
        i.intern("");
        i
    }

    fn intern(&mut self, name: &str) -> u16 {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.names.len() as u16;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    fn lookup(&self, name: &str) -> Option<u16> {
        self.index.get(name).copied()
    }

    fn name(&self, id: u16) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    fn serialize(&self, buf: &mut SerialBuf) {
        buf.write_u16(self.names.len() as u16);
        for n in &self.names {
            buf.write_str(n);
        }
    }

    fn deserialize(buf: &mut SerialBuf) -> Option<Self> {
        let count = buf.read_u16() as usize;
        let mut i = Interner::default();
        for _ in 0..count {
            let name = buf.read_str();
            if buf.error() {
                return None;
            }
            i.index.insert(name.clone(), i.names.len() as u16);
            i.names.push(name);
        }
        Some(i)
    }
}

/// How a document ended up open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Restored from a valid cache entry, importer parse skipped
    FromCache,
    /// No cache entry existed; parsed from source
    Parsed,
    /// A cache entry existed but failed validation; parsed from source
    ReparsedCacheInvalid,
}

/// In-memory document tree
pub struct Document {
    ctx: EngineContext,
    arena: RefCell<NodeArena>,
    root: NodeId,
    elem_names: Interner,
    attr_names: Interner,
    ns_names: Interner,
    toc: Vec<TocItem>,
    page_map: Vec<PageMapItem>,
    /// Cache file backing swapped-out parts; present after a cached open/save
    cache: RefCell<Option<CacheFile>>,
    /// Structure or payload changed since the last cache save
    modified: bool,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("nodes", &self.arena.borrow().len())
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Create an empty document with a fresh root element
    pub fn new(config: EngineConfig) -> Self {
        let ctx = EngineContext::new(config);
        let mut arena = NodeArena::new();
        let mut elem_names = Interner::new();
        let root_name = elem_names.intern("root");
        let root = arena.allocate(
            NodeData::Element(ElementData {
                name_id: root_name,
                ns_id: 0,
                box_kind: None,
                attrs: Vec::new(),
                hidden: false,
                block: true,
            }),
            &ctx,
        );
        Self {
            ctx,
            arena: RefCell::new(arena),
            root,
            elem_names,
            attr_names: Interner::new(),
            ns_names: Interner::new(),
            toc: Vec::new(),
            page_map: Vec::new(),
            cache: RefCell::new(None),
            modified: false,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn dom_version_requested(&self) -> u32 {
        self.ctx.config().dom_version_requested
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.arena.borrow().len()
    }

    pub fn toc(&self) -> &[TocItem] {
        &self.toc
    }

    pub fn toc_mut(&mut self) -> &mut Vec<TocItem> {
        self.modified = true;
        &mut self.toc
    }

    pub fn page_map(&self) -> &[PageMapItem] {
        &self.page_map
    }

    pub fn page_map_mut(&mut self) -> &mut Vec<PageMapItem> {
        self.modified = true;
        &mut self.page_map
    }

    // ── tree construction ────────────────────────────────────────────────

    /// Append a new element under `parent`
    pub fn create_element(
        &mut self,
        parent: NodeId,
        name: &str,
        ns: Option<&str>,
    ) -> Result<NodeId> {
        let index = self.child_count(parent);
        self.insert_element(parent, index, name, ns)
    }

    /// Insert a new element at `index` among `parent`'s children
    pub fn insert_element(
        &mut self,
        parent: NodeId,
        index: usize,
        name: &str,
        ns: Option<&str>,
    ) -> Result<NodeId> {
        let name_id = self.elem_names.intern(name);
        let ns_id = ns.map(|n| self.ns_names.intern(n)).unwrap_or(0);
        self.insert_node(
            parent,
            index,
            NodeData::Element(ElementData {
                name_id,
                ns_id,
                box_kind: None,
                attrs: Vec::new(),
                hidden: false,
                block: true,
            }),
        )
    }

    /// Insert a synthetic wrapper element at `index` among `parent`'s children
    pub fn insert_box(&mut self, parent: NodeId, index: usize, kind: BoxKind) -> Result<NodeId> {
        let name_id = self.elem_names.intern(box_element_name(kind));
        self.insert_node(
            parent,
            index,
            NodeData::Element(ElementData {
                name_id,
                ns_id: 0,
                box_kind: Some(kind),
                attrs: Vec::new(),
                hidden: false,
                block: false,
            }),
        )
    }

    /// Append a new text node under `parent`
    pub fn create_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        let index = self.child_count(parent);
        self.insert_node(parent, index, NodeData::Text(text.to_string()))
    }

    fn insert_node(&mut self, parent: NodeId, index: usize, data: NodeData) -> Result<NodeId> {
        if !parent.is_element() {
            return Err(EngineError::Structure(
                "text nodes cannot have children".to_string(),
            ));
        }
        let mut arena = self.arena.borrow_mut();
        if !arena.is_live(parent) {
            return Err(EngineError::Structure(format!(
                "parent node {:?} is not live",
                parent
            )));
        }
        if index > arena.children(parent).len() {
            return Err(EngineError::Structure(format!(
                "child index {index} out of bounds"
            )));
        }
        let id = arena.allocate(data, &self.ctx);
        arena.set_parent(id, Some(parent));
        // children stay contiguous: plain ordered insert, no gaps
        match arena.children_mut(parent) {
            Some(children) => children.insert(index, id),
            None => {
                arena.release(id);
                return Err(EngineError::Structure("parent lost during insert".to_string()));
            }
        }
        drop(arena);
        self.modified = true;
        Ok(id)
    }

    /// Remove the child at `index` and release its whole subtree.
    /// Remaining siblings shift down; the sequence never has gaps.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<()> {
        let mut arena = self.arena.borrow_mut();
        if index >= arena.children(parent).len() {
            return Err(EngineError::Structure(format!(
                "child index {index} out of bounds"
            )));
        }
        let removed = arena
            .children_mut(parent)
            .ok_or_else(|| EngineError::Structure("parent is not live".to_string()))?
            .remove(index);
        let mut stack = vec![removed];
        while let Some(id) = stack.pop() {
            stack.extend_from_slice(arena.children(id));
            arena.release(id);
        }
        drop(arena);
        self.modified = true;
        Ok(())
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.borrow().parent(id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.arena.borrow().children(id).to_vec()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.arena.borrow().children(id).len()
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.arena.borrow().children(id).get(index).copied()
    }

    /// Position of `id` among its parent's children
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let arena = self.arena.borrow();
        let parent = arena.parent(id)?;
        arena.children(parent).iter().position(|&c| c == id)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.arena.borrow().is_live(id)
    }

    fn with_element<T>(&self, id: NodeId, f: impl FnOnce(&ElementData) -> T) -> Option<T> {
        self.ensure_resident(id);
        let arena = self.arena.borrow();
        match arena.payload(id)? {
            NodeData::Element(e) => Some(f(e)),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_name(&self, id: NodeId) -> Option<String> {
        let name_id = self.with_element(id, |e| e.name_id)?;
        self.elem_names.name(name_id).map(str::to_string)
    }

    pub fn namespace_name(&self, id: NodeId) -> Option<String> {
        let ns_id = self.with_element(id, |e| e.ns_id)?;
        if ns_id == 0 {
            return None;
        }
        self.ns_names.name(ns_id).map(str::to_string)
    }

    pub fn box_kind(&self, id: NodeId) -> Option<BoxKind> {
        self.with_element(id, |e| e.box_kind).flatten()
    }

    /// True for synthetic wrapper nodes skipped by normalized addresses
    pub fn is_boxing(&self, id: NodeId) -> bool {
        self.box_kind(id).is_some()
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.with_element(id, |e| e.hidden).unwrap_or(false)
    }

    /// Record the layout collaborator's visibility verdict for a node
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.ensure_resident(id);
        let mut arena = self.arena.borrow_mut();
        if let Some(NodeData::Element(e)) = arena.payload_mut(id) {
            e.hidden = hidden;
            self.modified = true;
        }
    }

    pub fn is_block(&self, id: NodeId) -> bool {
        self.with_element(id, |e| e.block).unwrap_or(false)
    }

    pub fn set_block(&mut self, id: NodeId, block: bool) {
        self.ensure_resident(id);
        let mut arena = self.arena.borrow_mut();
        if let Some(NodeData::Element(e)) = arena.payload_mut(id) {
            e.block = block;
            self.modified = true;
        }
    }

    pub fn text(&self, id: NodeId) -> Option<String> {
        self.ensure_resident(id);
        let arena = self.arena.borrow();
        match arena.payload(id)? {
            NodeData::Text(t) => Some(t.clone()),
            NodeData::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.ensure_resident(id);
        let mut arena = self.arena.borrow_mut();
        match arena.payload_mut(id) {
            Some(NodeData::Text(t)) => {
                *t = text.to_string();
                self.modified = true;
                Ok(())
            }
            _ => Err(EngineError::Structure(
                "set_text on a non-text node".to_string(),
            )),
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let name_id = self.attr_names.lookup(name)?;
        self.with_element(id, |e| {
            e.attrs
                .iter()
                .find(|a| a.name_id == name_id)
                .map(|a| a.value.clone())
        })
        .flatten()
    }

    /// All attributes of an element as (name, value) pairs in document order
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.with_element(id, |e| {
            e.attrs
                .iter()
                .filter_map(|a| {
                    self.attr_names
                        .name(a.name_id)
                        .map(|n| (n.to_string(), a.value.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Set an attribute, replacing any existing value for the same name
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let name_id = self.attr_names.intern(name);
        self.ensure_resident(id);
        let mut arena = self.arena.borrow_mut();
        match arena.payload_mut(id) {
            Some(NodeData::Element(e)) => {
                if let Some(a) = e.attrs.iter_mut().find(|a| a.name_id == name_id) {
                    a.value = value.to_string();
                } else {
                    e.attrs.push(Attribute {
                        name_id,
                        ns_id: 0,
                        value: value.to_string(),
                    });
                }
                self.modified = true;
                Ok(())
            }
            _ => Err(EngineError::Structure(
                "set_attribute on a non-element node".to_string(),
            )),
        }
    }

    /// Concatenated text of a node's whole subtree
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if n.is_text() {
                if let Some(t) = self.text(n) {
                    out.push_str(&t);
                }
            } else {
                let children = self.children(n);
                for c in children.iter().rev() {
                    stack.push(*c);
                }
            }
        }
        out
    }

    // ── residency ────────────────────────────────────────────────────────

    /// Reload a swapped node's part from the cache file if needed.
    /// A failed reload is treated like structural corruption: the payload
    /// stays absent and accessors report the node as empty.
    fn ensure_resident(&self, id: NodeId) {
        if !self.arena.borrow().is_swapped(id) {
            return;
        }
        self.ensure_part_resident(id.kind(), NodeArena::part_of(id));
    }

    /// Reload one slab's payloads from the cache file if any are swapped
    fn ensure_part_resident(&self, kind: NodeKind, part: u32) {
        if !self.arena.borrow().part_has_swapped(kind, part) {
            return;
        }
        let block = match kind {
            NodeKind::Element => BlockKind::ElemPart,
            NodeKind::Text => BlockKind::TextPart,
        };
        let mut cache = self.cache.borrow_mut();
        let Some(file) = cache.as_mut() else {
            warn!(?kind, part, "swapped part has no backing cache file");
            return;
        };
        match file.read_block(block, part) {
            Some(bytes) => {
                if !self.arena.borrow_mut().restore_part(kind, part, &bytes) {
                    warn!(?kind, part, "cache part failed to restore");
                }
            }
            None => warn!(?kind, part, "cache part missing or corrupt"),
        }
    }

    /// Drop resident payloads of every fully-persisted part. No-op unless
    /// the document is clean and backed by a cache file.
    pub fn swap_out_all(&mut self) -> bool {
        if self.modified || self.cache.borrow().is_none() {
            debug!("swap_out refused: document modified or not cached");
            return false;
        }
        let mut arena = self.arena.borrow_mut();
        for kind in [NodeKind::Element, NodeKind::Text] {
            for part in 0..arena.part_count(kind) {
                arena.swap_out_part(kind, part);
            }
        }
        // the root must stay addressable without a cache round trip
        drop(arena);
        self.ensure_resident(self.root);
        true
    }

    // ── cache round trip ─────────────────────────────────────────────────

    /// Write name tables, structure, payload parts, TOC and page map into a
    /// cache file being built. The file still needs `publish` to become
    /// visible to readers.
    pub fn save_to_cache(&mut self, file: &mut CacheFile) -> Result<()> {
        let mut names = SerialBuf::new(1024);
        names.write_u32(self.root.raw());
        self.elem_names.serialize(&mut names);
        self.attr_names.serialize(&mut names);
        self.ns_names.serialize(&mut names);
        if names.error() {
            return Err(EngineError::Serialization("name tables".to_string()));
        }
        file.write_block(BlockKind::NameTables, 0, names.as_slice())?;

        let mut structure = SerialBuf::new(4096);
        self.arena.borrow().serialize_structure(&mut structure);
        if structure.error() {
            return Err(EngineError::Serialization("structure".to_string()));
        }
        file.write_block(BlockKind::Structure, 0, structure.as_slice())?;

        for (kind, block) in [
            (NodeKind::Element, BlockKind::ElemPart),
            (NodeKind::Text, BlockKind::TextPart),
        ] {
            let part_count = self.arena.borrow().part_count(kind);
            for part in 0..part_count {
                // swapped payloads live only in the previous cache file;
                // pull them back before the new file replaces it
                self.ensure_part_resident(kind, part);
                let arena = self.arena.borrow();
                if arena.part_has_swapped(kind, part) {
                    return Err(EngineError::Serialization(format!(
                        "part {part} of {kind:?} could not be reloaded"
                    )));
                }
                let bytes = arena.serialize_part(kind, part).ok_or_else(|| {
                    EngineError::Serialization(format!("part {part} of {kind:?}"))
                })?;
                file.write_block(block, part, &bytes)?;
            }
        }

        let mut toc = SerialBuf::new(1024);
        TocItem::serialize_forest(&self.toc, &mut toc);
        if toc.error() {
            return Err(EngineError::Serialization("toc".to_string()));
        }
        file.write_block(BlockKind::Toc, 0, toc.as_slice())?;

        let mut pm = SerialBuf::new(1024);
        PageMapItem::serialize_list(&self.page_map, &mut pm);
        if pm.error() {
            return Err(EngineError::Serialization("page map".to_string()));
        }
        file.write_block(BlockKind::PageMap, 0, pm.as_slice())?;

        self.modified = false;
        Ok(())
    }

    /// Restore a document from a validated cache file. Node payloads are
    /// left swapped and reload lazily on first access.
    pub fn load_from_cache(mut file: CacheFile, config: EngineConfig) -> Option<Document> {
        let names_bytes = file.read_block(BlockKind::NameTables, 0)?;
        let mut names = SerialBuf::from_bytes(names_bytes);
        let root = NodeId::from_raw(names.read_u32());
        let elem_names = Interner::deserialize(&mut names)?;
        let attr_names = Interner::deserialize(&mut names)?;
        let ns_names = Interner::deserialize(&mut names)?;

        let structure_bytes = file.read_block(BlockKind::Structure, 0)?;
        let mut structure = SerialBuf::from_bytes(structure_bytes);
        let arena = NodeArena::deserialize_structure(&mut structure)?;
        if !arena.is_live(root) {
            warn!("cached root node is not live");
            return None;
        }

        let toc_bytes = file.read_block(BlockKind::Toc, 0)?;
        let toc = TocItem::deserialize_forest(&mut SerialBuf::from_bytes(toc_bytes))?;
        let pm_bytes = file.read_block(BlockKind::PageMap, 0)?;
        let page_map = PageMapItem::deserialize_list(&mut SerialBuf::from_bytes(pm_bytes))?;

        info!(nodes = arena.len(), "document restored from cache");
        Some(Document {
            ctx: EngineContext::new(config),
            arena: RefCell::new(arena),
            root,
            elem_names,
            attr_names,
            ns_names,
            toc,
            page_map,
            cache: RefCell::new(Some(file)),
            modified: false,
        })
    }

    /// Attach the published cache file so parts can swap in later
    pub(crate) fn attach_cache(&mut self, file: CacheFile) {
        *self.cache.borrow_mut() = Some(file);
    }

    /// Open a document: restore it from the cache when a valid entry exists
    /// for (fingerprint, flags), otherwise run the importer and, when
    /// caching is enabled, persist a fresh entry.
    ///
    /// The importer reports format flags through the sink before the full
    /// parse completes; a cache hit at that point stops the parse.
    pub fn open(
        source: &[u8],
        importer: &mut dyn Importer,
        cache: Option<&mut DocCache>,
        config: EngineConfig,
    ) -> Result<(Document, OpenOutcome)> {
        let fingerprint = Fingerprint::of(source);
        let caching = config.caching_enabled && cache.is_some();

        struct Probe<'a> {
            cache: Option<&'a mut DocCache>,
            fingerprint: Fingerprint,
            dom_version: u32,
            hit: Option<CacheFile>,
            saw_invalid: bool,
            flags: u32,
        }
        impl ImportSink for Probe<'_> {
            fn format_detected(&mut self, format_flags: u32) -> bool {
                self.flags = format_flags;
                let Some(cache) = self.cache.as_mut() else {
                    return true;
                };
                match cache.open_existing(&self.fingerprint, format_flags, self.dom_version) {
                    CacheLookup::Opened(file) => {
                        self.hit = Some(file);
                        false
                    }
                    CacheLookup::Invalid => {
                        self.saw_invalid = true;
                        true
                    }
                    CacheLookup::Missing => true,
                }
            }
        }

        let mut probe = Probe {
            cache: if caching { cache } else { None },
            fingerprint,
            dom_version: config.dom_version_requested,
            hit: None,
            saw_invalid: false,
            flags: 0,
        };

        let mut doc = Document::new(config.clone());
        importer.populate(&mut doc, source, &mut probe)?;

        if let Some(file) = probe.hit.take() {
            if let Some(cached) = Document::load_from_cache(file, config.clone()) {
                return Ok((cached, OpenOutcome::FromCache));
            }
            // entry validated but body unusable: rebuild from source
            warn!("cache entry body unusable, reparsing");
            probe.saw_invalid = true;
            doc = Document::new(config.clone());
            let mut noop = NoopSink;
            importer.populate(&mut doc, source, &mut noop)?;
        }

        if let Some(cache) = probe.cache {
            match cache.create_new(&probe.fingerprint, probe.flags, config.dom_version_requested) {
                Ok(mut file) => {
                    doc.save_to_cache(&mut file)?;
                    match cache.publish(file) {
                        Ok(published) => doc.attach_cache(published),
                        Err(e) => warn!(error = %e, "cache publish failed, caching disabled"),
                    }
                }
                Err(e) => warn!(error = %e, "cache entry creation failed, caching disabled"),
            }
        }

        let outcome = if probe.saw_invalid {
            OpenOutcome::ReparsedCacheInvalid
        } else {
            OpenOutcome::Parsed
        };
        Ok((doc, outcome))
    }
}

struct NoopSink;

impl ImportSink for NoopSink {
    fn format_detected(&mut self, _format_flags: u32) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new(EngineConfig::default());
        let body = doc.create_element(doc.root(), "body", None).unwrap();
        let p = doc.create_element(body, "p", None).unwrap();
        doc.create_text(p, "hello world").unwrap();
        (doc, body, p)
    }

    #[test]
    fn test_tree_construction() {
        let (doc, body, p) = sample_doc();
        assert_eq!(doc.parent(body), Some(doc.root()));
        assert_eq!(doc.children(body), vec![p]);
        assert_eq!(doc.element_name(p).as_deref(), Some("p"));
        assert_eq!(doc.subtree_text(body), "hello world");
    }

    #[test]
    fn test_remove_child_keeps_contiguity() {
        let mut doc = Document::new(EngineConfig::default());
        let body = doc.create_element(doc.root(), "body", None).unwrap();
        let a = doc.create_element(body, "p", None).unwrap();
        let b = doc.create_element(body, "p", None).unwrap();
        let c = doc.create_element(body, "p", None).unwrap();
        doc.remove_child(body, 1).unwrap();
        assert_eq!(doc.children(body), vec![a, c]);
        assert!(!doc.is_live(b));
        assert_eq!(doc.child_index(c), Some(1));
    }

    #[test]
    fn test_attributes_unique_names() {
        let (mut doc, _, p) = sample_doc();
        doc.set_attribute(p, "class", "lead").unwrap();
        doc.set_attribute(p, "id", "p1").unwrap();
        doc.set_attribute(p, "class", "quote").unwrap();
        assert_eq!(doc.attribute(p, "class").as_deref(), Some("quote"));
        assert_eq!(doc.attributes(p).len(), 2);
    }

    #[test]
    fn test_box_elements_are_tagged() {
        let (mut doc, body, _) = sample_doc();
        let fb = doc.insert_box(body, 0, BoxKind::FloatBox).unwrap();
        assert!(doc.is_boxing(fb));
        assert_eq!(doc.element_name(fb).as_deref(), Some("floatBox"));
    }
}
