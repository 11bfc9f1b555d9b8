//! Node model
//!
//! A node is either an element (interned type and namespace identifiers,
//! ordered unique-name attributes, ordered children) or a text payload.
//! Synthetic wrapper elements inserted by the tree builder during
//! normalization are tagged with a closed [`BoxKind`] set so that the
//! normalized address format can skip them with a pure, total function over
//! the tag rather than a dispatch hierarchy.

use serde::{Deserialize, Serialize};

use crate::serial::SerialBuf;

/// Stable integer identity of a node within its document.
///
/// Bit 0 carries the node class (0 = element, 1 = text); the remaining bits
/// index the slot within that class's pool. Identity is reassigned only on
/// reload, never on in-place mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn element(slot: u32) -> Self {
        NodeId(slot << 1)
    }

    pub(crate) fn text(slot: u32) -> Self {
        NodeId((slot << 1) | 1)
    }

    pub(crate) fn slot(self) -> u32 {
        self.0 >> 1
    }

    pub fn kind(self) -> NodeKind {
        if self.0 & 1 == 0 {
            NodeKind::Element
        } else {
            NodeKind::Text
        }
    }

    pub fn is_element(self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_text(self) -> bool {
        self.kind() == NodeKind::Text
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }
}

/// Node class; also the arena allocation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Element,
    Text,
}

/// Tree-shape variant of a synthetic wrapper element.
///
/// The tree builder may wrap content in these during normalization; the
/// normalized (V2) address format ignores them so that addresses survive
/// changes to the builder's wrapping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxKind {
    /// Wrapper around floated content
    FloatBox,
    /// Wrapper around inline-block content
    InlineBox,
    /// Wrapper inserted by auto-boxing of mixed inline/block children
    AutoBox,
}

impl BoxKind {
    fn to_u8(self) -> u8 {
        match self {
            BoxKind::FloatBox => 1,
            BoxKind::InlineBox => 2,
            BoxKind::AutoBox => 3,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(BoxKind::FloatBox),
            2 => Some(BoxKind::InlineBox),
            3 => Some(BoxKind::AutoBox),
            _ => None,
        }
    }
}

/// One element attribute; names are unique within an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Interned attribute name id
    pub name_id: u16,
    /// Interned namespace id (0 = none)
    pub ns_id: u16,
    pub value: String,
}

/// Element payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Interned element type id
    pub name_id: u16,
    /// Interned namespace id (0 = none)
    pub ns_id: u16,
    /// Synthetic wrapper tag, `None` for authored elements
    pub box_kind: Option<BoxKind>,
    /// Ordered attributes, unique by (ns_id, name_id)
    pub attrs: Vec<Attribute>,
    /// Layout collaborator marked this node as not rendered
    pub hidden: bool,
    /// Element renders as a block (owns a block boundary for navigation)
    pub block: bool,
}

/// Resident payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        }
    }

    pub(crate) fn serialize(&self, buf: &mut SerialBuf) {
        match self {
            NodeData::Element(e) => {
                buf.write_u8(0);
                buf.write_u16(e.name_id);
                buf.write_u16(e.ns_id);
                buf.write_u8(e.box_kind.map(BoxKind::to_u8).unwrap_or(0));
                buf.write_bool(e.hidden);
                buf.write_bool(e.block);
                buf.write_u16(e.attrs.len() as u16);
                for a in &e.attrs {
                    buf.write_u16(a.name_id);
                    buf.write_u16(a.ns_id);
                    buf.write_wstr(&a.value);
                }
            }
            NodeData::Text(t) => {
                buf.write_u8(1);
                buf.write_wstr(t);
            }
        }
    }

    pub(crate) fn deserialize(buf: &mut SerialBuf) -> Option<NodeData> {
        match buf.read_u8() {
            0 => {
                let name_id = buf.read_u16();
                let ns_id = buf.read_u16();
                let box_kind = BoxKind::from_u8(buf.read_u8());
                let hidden = buf.read_bool();
                let block = buf.read_bool();
                let count = buf.read_u16() as usize;
                let mut attrs = Vec::with_capacity(count);
                for _ in 0..count {
                    let name_id = buf.read_u16();
                    let ns_id = buf.read_u16();
                    let value = buf.read_wstr();
                    if buf.error() {
                        return None;
                    }
                    attrs.push(Attribute {
                        name_id,
                        ns_id,
                        value,
                    });
                }
                if buf.error() {
                    return None;
                }
                Some(NodeData::Element(ElementData {
                    name_id,
                    ns_id,
                    box_kind,
                    attrs,
                    hidden,
                    block,
                }))
            }
            1 => {
                let text = buf.read_wstr();
                if buf.error() {
                    None
                } else {
                    Some(NodeData::Text(text))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_class_bit() {
        let e = NodeId::element(7);
        let t = NodeId::text(7);
        assert!(e.is_element());
        assert!(t.is_text());
        assert_eq!(e.slot(), 7);
        assert_eq!(t.slot(), 7);
        assert_ne!(e, t);
    }

    #[test]
    fn test_node_data_roundtrip() {
        let data = NodeData::Element(ElementData {
            name_id: 12,
            ns_id: 1,
            box_kind: Some(BoxKind::AutoBox),
            attrs: vec![Attribute {
                name_id: 3,
                ns_id: 0,
                value: "chapter-1".to_string(),
            }],
            hidden: false,
            block: true,
        });
        let mut buf = SerialBuf::new(64);
        data.serialize(&mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        assert_eq!(NodeData::deserialize(&mut buf), Some(data));

        let text = NodeData::Text("Call me Ishmael.".to_string());
        let mut buf = SerialBuf::new(64);
        text.serialize(&mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        assert_eq!(NodeData::deserialize(&mut buf), Some(text));
    }
}
