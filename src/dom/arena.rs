//! Node arena
//!
//! Pooled storage for tree nodes. Nodes are bucketed into two fixed-size
//! allocation classes (elements and texts) so per-node heap overhead stays
//! bounded; each class grows in slabs ("parts") of [`PART_LEN`] slots with a
//! free list for recycled identities. Structure (parent links, child order)
//! is always resident; payloads may be swapped out per part and transparently
//! reloaded from the document cache when a swapped node is resolved.
//!
//! Allocation failure is not a recoverable error: exhausting the identity
//! space escalates through the engine context's fatal hook.

use tracing::{debug, trace};

use crate::context::EngineContext;
use crate::dom::node::{NodeData, NodeId, NodeKind};
use crate::serial::SerialBuf;

/// log2 of slots per slab
pub const PART_SHIFT: u32 = 10;
/// Slots per slab
pub const PART_LEN: usize = 1 << PART_SHIFT;

const MAX_SLOTS: u32 = u32::MAX >> 1;

#[derive(Debug)]
enum SlotPayload {
    Resident(NodeData),
    /// Identity and position retained; payload lives in the cache file
    Swapped,
    Free,
}

#[derive(Debug)]
struct Slot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    payload: SlotPayload,
}

#[derive(Debug, Default)]
struct Pool {
    parts: Vec<Vec<Slot>>,
    free: Vec<u32>,
    live: usize,
}

impl Pool {
    fn slot(&self, index: u32) -> Option<&Slot> {
        let part = (index >> PART_SHIFT) as usize;
        let sub = (index as usize) & (PART_LEN - 1);
        self.parts.get(part)?.get(sub)
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut Slot> {
        let part = (index >> PART_SHIFT) as usize;
        let sub = (index as usize) & (PART_LEN - 1);
        self.parts.get_mut(part)?.get_mut(sub)
    }

    fn total_slots(&self) -> u32 {
        if self.parts.is_empty() {
            return 0;
        }
        ((self.parts.len() - 1) * PART_LEN + self.parts.last().map(Vec::len).unwrap_or(0)) as u32
    }

    fn allocate(&mut self, data: NodeData, ctx: &EngineContext) -> u32 {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = self
                .slot_mut(index)
                .unwrap_or_else(|| ctx.fatal(1, "arena free list points outside pool"));
            slot.parent = None;
            slot.children.clear();
            slot.payload = SlotPayload::Resident(data);
            return index;
        }
        let index = self.total_slots();
        if index >= MAX_SLOTS {
            ctx.fatal(2, "arena identity space exhausted");
        }
        if self
            .parts
            .last()
            .map(|p| p.len() >= PART_LEN)
            .unwrap_or(true)
        {
            // grow by one slab
            self.parts.push(Vec::with_capacity(PART_LEN));
        }
        match self.parts.last_mut() {
            Some(part) => part.push(Slot {
                parent: None,
                children: Vec::new(),
                payload: SlotPayload::Resident(data),
            }),
            None => ctx.fatal(2, "arena slab missing after grow"),
        }
        index
    }
}

/// Pooled, swappable node storage
#[derive(Debug, Default)]
pub struct NodeArena {
    elems: Pool,
    texts: Pool,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self, kind: NodeKind) -> &Pool {
        match kind {
            NodeKind::Element => &self.elems,
            NodeKind::Text => &self.texts,
        }
    }

    fn pool_mut(&mut self, kind: NodeKind) -> &mut Pool {
        match kind {
            NodeKind::Element => &mut self.elems,
            NodeKind::Text => &mut self.texts,
        }
    }

    /// Number of live nodes across both classes
    pub fn len(&self) -> usize {
        self.elems.live + self.texts.live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate a node in the class matching the payload
    pub fn allocate(&mut self, data: NodeData, ctx: &EngineContext) -> NodeId {
        let kind = data.kind();
        let index = self.pool_mut(kind).allocate(data, ctx);
        match kind {
            NodeKind::Element => NodeId::element(index),
            NodeKind::Text => NodeId::text(index),
        }
    }

    /// Return a node's slot to the free list. The caller is responsible for
    /// detaching it from its parent first.
    pub fn release(&mut self, id: NodeId) {
        let pool = self.pool_mut(id.kind());
        if let Some(slot) = pool.slot_mut(id.slot()) {
            if !matches!(slot.payload, SlotPayload::Free) {
                slot.payload = SlotPayload::Free;
                slot.parent = None;
                slot.children.clear();
                pool.free.push(id.slot());
                pool.live -= 1;
            }
        }
    }

    /// True if the node exists and is not on the free list
    pub fn is_live(&self, id: NodeId) -> bool {
        matches!(
            self.pool(id.kind()).slot(id.slot()).map(|s| &s.payload),
            Some(SlotPayload::Resident(_)) | Some(SlotPayload::Swapped)
        )
    }

    pub fn is_swapped(&self, id: NodeId) -> bool {
        matches!(
            self.pool(id.kind()).slot(id.slot()).map(|s| &s.payload),
            Some(SlotPayload::Swapped)
        )
    }

    /// Resident payload, `None` when swapped out or free
    pub fn payload(&self, id: NodeId) -> Option<&NodeData> {
        match self.pool(id.kind()).slot(id.slot())?.payload {
            SlotPayload::Resident(ref d) => Some(d),
            _ => None,
        }
    }

    pub fn payload_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        match self.pool_mut(id.kind()).slot_mut(id.slot())?.payload {
            SlotPayload::Resident(ref mut d) => Some(d),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.pool(id.kind()).slot(id.slot())?.parent
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some(slot) = self.pool_mut(id.kind()).slot_mut(id.slot()) {
            slot.parent = parent;
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.pool(id.kind())
            .slot(id.slot())
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        self.pool_mut(id.kind())
            .slot_mut(id.slot())
            .map(|s| &mut s.children)
    }

    /// Slab index a node's payload lives in
    pub fn part_of(id: NodeId) -> u32 {
        id.slot() >> PART_SHIFT
    }

    pub fn part_count(&self, kind: NodeKind) -> u32 {
        self.pool(kind).parts.len() as u32
    }

    /// True when any slot of the slab has its payload swapped out
    pub fn part_has_swapped(&self, kind: NodeKind, part: u32) -> bool {
        self.pool(kind)
            .parts
            .get(part as usize)
            .is_some_and(|slots| slots.iter().any(|s| matches!(s.payload, SlotPayload::Swapped)))
    }

    /// Serialize the payloads of one slab so they can be dropped from memory
    pub fn serialize_part(&self, kind: NodeKind, part: u32) -> Option<Vec<u8>> {
        let slots = self.pool(kind).parts.get(part as usize)?;
        let mut buf = SerialBuf::new(slots.len() * 16);
        buf.write_u32(slots.len() as u32);
        for slot in slots {
            match &slot.payload {
                SlotPayload::Resident(data) => {
                    buf.write_u8(1);
                    data.serialize(&mut buf);
                }
                // swapped slots are already persisted; free slots have nothing
                _ => buf.write_u8(0),
            }
        }
        if buf.error() {
            return None;
        }
        Some(buf.into_bytes())
    }

    /// Drop resident payloads of one slab, keeping identity and position
    pub fn swap_out_part(&mut self, kind: NodeKind, part: u32) {
        let Some(slots) = self.pool_mut(kind).parts.get_mut(part as usize) else {
            return;
        };
        let mut dropped = 0usize;
        for slot in slots.iter_mut() {
            if matches!(slot.payload, SlotPayload::Resident(_)) {
                slot.payload = SlotPayload::Swapped;
                dropped += 1;
            }
        }
        trace!(?kind, part, dropped, "swapped out arena part");
    }

    /// Re-materialize payloads of one slab from a serialized part
    pub fn restore_part(&mut self, kind: NodeKind, part: u32, bytes: &[u8]) -> bool {
        let Some(slots) = self.pool_mut(kind).parts.get_mut(part as usize) else {
            return false;
        };
        let mut buf = SerialBuf::from_bytes(bytes.to_vec());
        let count = buf.read_u32() as usize;
        if count != slots.len() {
            debug!(?kind, part, count, expected = slots.len(), "part size mismatch");
            return false;
        }
        for slot in slots.iter_mut() {
            let present = buf.read_u8() == 1;
            if !present {
                continue;
            }
            let Some(data) = NodeData::deserialize(&mut buf) else {
                return false;
            };
            if matches!(slot.payload, SlotPayload::Swapped) {
                slot.payload = SlotPayload::Resident(data);
            }
        }
        !buf.error()
    }

    /// Serialize occupancy and tree structure of both pools
    pub(crate) fn serialize_structure(&self, buf: &mut SerialBuf) {
        for pool in [&self.elems, &self.texts] {
            buf.write_u32(pool.total_slots());
            for part in &pool.parts {
                for slot in part {
                    match slot.payload {
                        SlotPayload::Free => buf.write_u8(0),
                        _ => {
                            buf.write_u8(1);
                            buf.write_u32(slot.parent.map(|p| p.raw() + 1).unwrap_or(0));
                            buf.write_u32(slot.children.len() as u32);
                            for c in &slot.children {
                                buf.write_u32(c.raw());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Rebuild both pools' structure with every occupied slot marked swapped
    pub(crate) fn deserialize_structure(buf: &mut SerialBuf) -> Option<NodeArena> {
        let mut arena = NodeArena::new();
        for kind in [NodeKind::Element, NodeKind::Text] {
            let total = buf.read_u32();
            let pool = arena.pool_mut(kind);
            for index in 0..total {
                if buf.error() {
                    return None;
                }
                if (index as usize) & (PART_LEN - 1) == 0 {
                    pool.parts.push(Vec::with_capacity(PART_LEN));
                }
                let occupied = buf.read_u8() == 1;
                let slot = if occupied {
                    let parent_raw = buf.read_u32();
                    let parent = if parent_raw == 0 {
                        None
                    } else {
                        Some(NodeId::from_raw(parent_raw - 1))
                    };
                    let child_count = buf.read_u32() as usize;
                    if child_count > MAX_SLOTS as usize {
                        return None;
                    }
                    let mut children = Vec::with_capacity(child_count.min(PART_LEN));
                    for _ in 0..child_count {
                        children.push(NodeId::from_raw(buf.read_u32()));
                    }
                    pool.live += 1;
                    Slot {
                        parent,
                        children,
                        payload: SlotPayload::Swapped,
                    }
                } else {
                    pool.free.push(index);
                    Slot {
                        parent: None,
                        children: Vec::new(),
                        payload: SlotPayload::Free,
                    }
                };
                pool.parts.last_mut()?.push(slot);
            }
        }
        if buf.error() {
            None
        } else {
            Some(arena)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::ElementData;

    fn elem(name_id: u16) -> NodeData {
        NodeData::Element(ElementData {
            name_id,
            ns_id: 0,
            box_kind: None,
            attrs: Vec::new(),
            hidden: false,
            block: true,
        })
    }

    #[test]
    fn test_allocate_and_release_recycles_slot() {
        let ctx = EngineContext::default();
        let mut arena = NodeArena::new();
        let a = arena.allocate(elem(1), &ctx);
        let b = arena.allocate(NodeData::Text("x".into()), &ctx);
        assert!(a.is_element());
        assert!(b.is_text());
        assert_eq!(arena.len(), 2);

        arena.release(a);
        assert!(!arena.is_live(a));
        let c = arena.allocate(elem(2), &ctx);
        // recycled identity within the element class
        assert_eq!(c.slot(), a.slot());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_swap_out_and_restore_part() {
        let ctx = EngineContext::default();
        let mut arena = NodeArena::new();
        let ids: Vec<NodeId> = (0..5)
            .map(|i| arena.allocate(NodeData::Text(format!("t{i}")), &ctx))
            .collect();

        let bytes = arena.serialize_part(NodeKind::Text, 0).unwrap();
        assert!(!arena.part_has_swapped(NodeKind::Text, 0));
        arena.swap_out_part(NodeKind::Text, 0);
        assert!(arena.part_has_swapped(NodeKind::Text, 0));
        for id in &ids {
            assert!(arena.is_swapped(*id));
            assert!(arena.payload(*id).is_none());
        }

        assert!(arena.restore_part(NodeKind::Text, 0, &bytes));
        assert!(!arena.part_has_swapped(NodeKind::Text, 0));
        assert_eq!(
            arena.payload(ids[3]),
            Some(&NodeData::Text("t3".to_string()))
        );
    }

    #[test]
    fn test_structure_roundtrip_preserves_identity() {
        let ctx = EngineContext::default();
        let mut arena = NodeArena::new();
        let root = arena.allocate(elem(1), &ctx);
        let child = arena.allocate(elem(2), &ctx);
        let text = arena.allocate(NodeData::Text("hi".into()), &ctx);
        arena.set_parent(child, Some(root));
        arena.set_parent(text, Some(child));
        arena.children_mut(root).unwrap().push(child);
        arena.children_mut(child).unwrap().push(text);
        // leave a hole in the element pool
        let gap = arena.allocate(elem(3), &ctx);
        arena.release(gap);

        let mut buf = SerialBuf::new(256);
        arena.serialize_structure(&mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        let rebuilt = NodeArena::deserialize_structure(&mut buf).unwrap();

        assert_eq!(rebuilt.children(root), &[child]);
        assert_eq!(rebuilt.children(child), &[text]);
        assert_eq!(rebuilt.parent(text), Some(child));
        assert!(rebuilt.is_swapped(child));
        assert!(!rebuilt.is_live(gap));
    }
}
